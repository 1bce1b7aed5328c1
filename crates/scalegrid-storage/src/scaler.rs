//! Scaler driven by the number of objects in a GCS bucket.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;
use tracing::{debug, info};

use scalegrid_core::{
    Activity, Context, Lifecycle, MetricSpec, MetricTargetType, MetricValue, Scaler,
    ScalerConfig, ScalerError, ScalerResult, metric_target,
};

use crate::auth::GcpAuthorization;
use crate::counter::count_objects;
use crate::metadata::ObjectCountMetadata;

/// Registry key of this scaler.
pub const KIND: &str = "gcp-storage";

pub struct ObjectCountScaler {
    metadata: ObjectCountMetadata,
    target_type: MetricTargetType,
    lifecycle: Lifecycle,
    store: Option<Arc<dyn ObjectStore>>,
}

impl ObjectCountScaler {
    /// Validate the trigger and open the bucket.
    ///
    /// A single-item listing is issued so bad credentials fail here rather
    /// than on the first poll.
    pub async fn new(ctx: &Context, config: &ScalerConfig) -> ScalerResult<Self> {
        let target_type = config.metric_target_type().map_err(|e| {
            ScalerError::config(format!("error getting scaler metric type: {e}"))
        })?;
        let metadata = ObjectCountMetadata::parse(config).map_err(|e| {
            ScalerError::config(format!("error parsing GCP storage metadata: {e}"))
        })?;

        let mut lifecycle = Lifecycle::new(KIND);
        lifecycle.connect()?;

        let store = build_store(&metadata)?;
        ctx.run(count_objects(store.list(None), 1))
            .await
            .map_err(|e| match e {
                ScalerError::Timeout | ScalerError::Cancelled => e,
                other => ScalerError::Connection(format!(
                    "opening bucket {}: {other}",
                    metadata.bucket_name
                )),
            })?;

        lifecycle.ready()?;
        info!(bucket = %metadata.bucket_name, metric = %metadata.metric_name, "object count scaler ready");

        Ok(Self {
            metadata,
            target_type,
            lifecycle,
            store: Some(store),
        })
    }

    /// Wrap an already-open store.
    pub fn from_store(
        metadata: ObjectCountMetadata,
        target_type: MetricTargetType,
        store: Arc<dyn ObjectStore>,
    ) -> ScalerResult<Self> {
        let mut lifecycle = Lifecycle::new(KIND);
        lifecycle.connect()?;
        lifecycle.ready()?;
        Ok(Self {
            metadata,
            target_type,
            lifecycle,
            store: Some(store),
        })
    }

    pub fn metadata(&self) -> &ObjectCountMetadata {
        &self.metadata
    }

    async fn item_count(&self, ctx: &Context, max: i64) -> ScalerResult<i64> {
        self.lifecycle.ensure_ready()?;
        let store = self.store.as_ref().ok_or(ScalerError::Closed)?;
        let count = ctx.run(count_objects(store.list(None), max)).await?;
        debug!(bucket = %self.metadata.bucket_name, count, max, "counted items");
        Ok(count)
    }
}

fn build_store(metadata: &ObjectCountMetadata) -> ScalerResult<Arc<dyn ObjectStore>> {
    let builder = GoogleCloudStorageBuilder::new().with_bucket_name(&metadata.bucket_name);
    let builder = match &metadata.authorization {
        GcpAuthorization::PodIdentity => builder,
        GcpAuthorization::CredentialsJson(json) => {
            builder.with_service_account_key(json.expose())
        }
        GcpAuthorization::CredentialsFile(path) => {
            builder.with_service_account_path(path.to_string_lossy())
        }
    };
    let store = builder
        .build()
        .map_err(|e| ScalerError::Connection(format!("storage client: {e}")))?;
    Ok(Arc::new(store))
}

#[async_trait]
impl Scaler for ObjectCountScaler {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn is_active(&self, ctx: &Context) -> ScalerResult<Activity> {
        let count = self.item_count(ctx, 1).await?;
        Ok(Activity::healthy(count > 0))
    }

    fn get_metric_spec_for_scaling(&self) -> Vec<MetricSpec> {
        vec![MetricSpec {
            metric_name: self.metadata.metric_name.clone(),
            target: metric_target(self.target_type, self.metadata.target_object_count),
        }]
    }

    async fn get_metrics(&self, ctx: &Context, metric_name: &str) -> ScalerResult<Vec<MetricValue>> {
        let count = self
            .item_count(ctx, self.metadata.max_bucket_items_to_scan)
            .await?;
        Ok(vec![MetricValue::now(metric_name, count)])
    }

    async fn close(&mut self) -> ScalerResult<()> {
        self.lifecycle.close()?;
        self.store = None;
        Ok(())
    }
}
