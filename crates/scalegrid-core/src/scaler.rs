//! The contract every backend scaler implements.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{ScalerError, ScalerResult};
use crate::metric::{MetricSpec, MetricValue};

/// Outcome of an activity check.
#[derive(Debug)]
pub struct Activity {
    /// Whether the workload has non-zero demand right now.
    pub active: bool,
    /// A non-fatal problem noticed while checking, e.g. a failed health
    /// probe. `active` is still meaningful when this is set.
    pub degraded: Option<ScalerError>,
}

impl Activity {
    pub fn healthy(active: bool) -> Self {
        Self {
            active,
            degraded: None,
        }
    }

    pub fn degraded(active: bool, err: ScalerError) -> Self {
        Self {
            active,
            degraded: Some(err),
        }
    }
}

/// A backend-specific source of one scaling metric per trigger.
///
/// Each instance is driven sequentially by its owner and owns its backend
/// connection exclusively. `close` is called at most once; any call after
/// it fails with [`ScalerError::Closed`].
#[async_trait]
pub trait Scaler: Send + Sync {
    /// Registry key of this backend, e.g. `"gcp-storage"`.
    fn kind(&self) -> &'static str;

    /// Whether the current signal implies non-zero demand.
    async fn is_active(&self, ctx: &Context) -> ScalerResult<Activity>;

    /// The single metric this trigger exposes and its target.
    fn get_metric_spec_for_scaling(&self) -> Vec<MetricSpec>;

    /// Query the backend and return exactly one value named `metric_name`.
    async fn get_metrics(&self, ctx: &Context, metric_name: &str) -> ScalerResult<Vec<MetricValue>>;

    /// Release the backend connection.
    async fn close(&mut self) -> ScalerResult<()>;
}
