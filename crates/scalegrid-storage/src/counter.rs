//! Bounded enumeration of bucket contents.

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use scalegrid_core::{ScalerError, ScalerResult};

const MISSING_BUCKET_MARKERS: [&str; 3] =
    ["bucket doesn't exist", "bucket does not exist", "NoSuchBucket"];

/// Count items from `listing`, pulling no further once `max` is reached.
///
/// A missing bucket counts as empty. Any other listing error is returned
/// together with the number of items seen before it.
pub async fn count_objects<S, T>(listing: S, max: i64) -> ScalerResult<i64>
where
    S: Stream<Item = Result<T, object_store::Error>>,
{
    let mut listing = std::pin::pin!(listing);
    let mut count = 0i64;

    while count < max {
        match listing.next().await {
            None => break,
            Some(Ok(_)) => count += 1,
            Some(Err(err)) if is_missing_bucket(&err) => {
                info!(error = %err, "bucket doesn't exist, counting as empty");
                return Ok(0);
            }
            Some(Err(err)) => {
                return Err(ScalerError::Enumeration {
                    counted: count,
                    source: Box::new(err),
                });
            }
        }
    }

    debug!(count, max, "counted bucket items");
    Ok(count)
}

fn is_missing_bucket(err: &object_store::Error) -> bool {
    if matches!(err, object_store::Error::NotFound { .. }) {
        return true;
    }
    let msg = err.to_string();
    MISSING_BUCKET_MARKERS.iter().any(|m| msg.contains(m))
}
