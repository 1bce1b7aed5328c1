//! Trigger metadata for the object-count scaler.

use scalegrid_core::{ScalerConfig, ScalerError, ScalerResult, metric_name_with_index, normalize_string};

use crate::auth::GcpAuthorization;

pub const DEFAULT_TARGET_OBJECT_COUNT: i64 = 100;
pub const DEFAULT_MAX_BUCKET_ITEMS_TO_SCAN: i64 = 1000;

#[derive(Debug, Clone)]
pub struct ObjectCountMetadata {
    pub bucket_name: String,
    /// Objects per replica.
    pub target_object_count: i64,
    /// Scan budget for one `get_metrics` call.
    pub max_bucket_items_to_scan: i64,
    pub authorization: GcpAuthorization,
    pub metric_name: String,
}

impl ObjectCountMetadata {
    pub fn parse(config: &ScalerConfig) -> ScalerResult<Self> {
        let bucket_name = config
            .metadata("bucketName")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ScalerError::missing("bucket name"))?
            .to_string();

        let target_object_count =
            optional_int(config, "targetObjectCount", DEFAULT_TARGET_OBJECT_COUNT)?;
        let max_bucket_items_to_scan = optional_int(
            config,
            "maxBucketItemsToScan",
            DEFAULT_MAX_BUCKET_ITEMS_TO_SCAN,
        )?;

        let authorization = GcpAuthorization::resolve(config)?;

        let metric_name = metric_name_with_index(
            config.scaler_index,
            &normalize_string(&format!("gcp-storage-{bucket_name}")),
        );

        Ok(Self {
            bucket_name,
            target_object_count,
            max_bucket_items_to_scan,
            authorization,
            metric_name,
        })
    }
}

fn optional_int(config: &ScalerConfig, key: &str, default: i64) -> ScalerResult<i64> {
    match config.metadata(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|e| ScalerError::config(format!("error parsing {key}: {e}"))),
    }
}
