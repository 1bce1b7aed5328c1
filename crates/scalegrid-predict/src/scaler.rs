//! Forecast-driven scaler.
//!
//! Each poll pulls `[now - historyTimeWindow, now]` from Prometheus, sends
//! it to the forecasting engine and reports the larger of the forecast and
//! the latest observed value.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::{debug, info, warn};

use scalegrid_core::{
    Activity, Context, EngineConfig, Lifecycle, MetricSpec, MetricTargetType, MetricValue,
    Observation, Scaler, ScalerConfig, ScalerError, ScalerResult, metric_target,
};

use crate::engine::{EngineClient, Forecaster};
use crate::metadata::PredictiveMetadata;
use crate::normalize::normalize;
use crate::prometheus::{PrometheusClient, QueryRange, RangeQuerier};

/// Registry key of this scaler.
pub const KIND: &str = "predictkube";

struct Backends {
    prometheus: Arc<dyn RangeQuerier>,
    engine: Arc<dyn Forecaster>,
}

pub struct PredictiveScaler {
    metadata: PredictiveMetadata,
    target_type: MetricTargetType,
    lifecycle: Lifecycle,
    backends: Option<Backends>,
}

impl PredictiveScaler {
    /// Validate the trigger, ping Prometheus and dial the engine.
    pub async fn new(
        ctx: &Context,
        config: &ScalerConfig,
        engine: &EngineConfig,
    ) -> ScalerResult<Self> {
        let target_type = config.metric_target_type().map_err(|e| {
            ScalerError::config(format!("error getting scaler metric type: {e}"))
        })?;
        let metadata = PredictiveMetadata::parse(config).map_err(|e| {
            ScalerError::config(format!("error parsing PredictKube metadata: {e}"))
        })?;

        let mut lifecycle = Lifecycle::new(KIND);
        lifecycle.connect()?;

        let prometheus = PrometheusClient::from_metadata(&metadata)?;
        ctx.run(prometheus.runtime_info())
            .await
            .map_err(|e| construction_error("error create Prometheus client and API objects", e))?;

        let client = ctx
            .run(EngineClient::connect(engine, &metadata.api_key))
            .await
            .map_err(|e| construction_error("error init GRPC client", e))?;

        lifecycle.ready()?;
        info!(
            scaler_index = metadata.scaler_index,
            prometheus = %metadata.prometheus_address,
            engine = %engine.uri(),
            "predictive scaler ready"
        );

        Ok(Self {
            metadata,
            target_type,
            lifecycle,
            backends: Some(Backends {
                prometheus: Arc::new(prometheus),
                engine: Arc::new(client),
            }),
        })
    }

    /// Assemble a ready scaler from already-connected backends.
    pub fn from_parts(
        metadata: PredictiveMetadata,
        target_type: MetricTargetType,
        prometheus: Arc<dyn RangeQuerier>,
        engine: Arc<dyn Forecaster>,
    ) -> ScalerResult<Self> {
        let mut lifecycle = Lifecycle::new(KIND);
        lifecycle.connect()?;
        lifecycle.ready()?;
        Ok(Self {
            metadata,
            target_type,
            lifecycle,
            backends: Some(Backends { prometheus, engine }),
        })
    }

    pub fn metadata(&self) -> &PredictiveMetadata {
        &self.metadata
    }

    fn backends(&self) -> ScalerResult<&Backends> {
        self.lifecycle.ensure_ready()?;
        self.backends.as_ref().ok_or(ScalerError::Closed)
    }

    async fn history(&self, ctx: &Context) -> ScalerResult<Vec<Observation>> {
        let backends = self.backends()?;
        let end = Utc::now();
        let window = TimeDelta::from_std(self.metadata.history_time_window)
            .map_err(|e| ScalerError::config(format!("historyTimeWindow out of range: {e}")))?;
        let range = QueryRange {
            start: end - window,
            end,
            step: self.metadata.step(),
        };

        let result = ctx
            .run(backends.prometheus.query_range(&self.metadata.query, &range))
            .await?;
        let observations = normalize(&result, &self.metadata.metric_name())?;
        debug!(count = observations.len(), "fetched history");
        Ok(observations)
    }

    async fn forecast(&self, ctx: &Context) -> ScalerResult<i64> {
        let observations = self.history(ctx).await?;
        let backends = self.backends()?;
        let predicted = ctx
            .run(
                backends
                    .engine
                    .predict(self.metadata.forecast_horizon(), &observations),
            )
            .await?;
        let value = scaling_value(predicted, last_observed(&observations));
        debug!(predicted, value, "forecast computed");
        Ok(value)
    }
}

/// The value to scale on: never below what was last observed.
pub fn scaling_value(predicted: i64, last_observed: i64) -> i64 {
    predicted.max(last_observed)
}

/// Last observation truncated to an integer, 0 for an empty window.
fn last_observed(observations: &[Observation]) -> i64 {
    observations.last().map_or(0, |o| o.value as i64)
}

fn construction_error(context: &str, err: ScalerError) -> ScalerError {
    match err {
        ScalerError::Timeout | ScalerError::Cancelled => err,
        ScalerError::Config(msg) => ScalerError::Config(format!("{context}: {msg}")),
        other => ScalerError::Connection(format!("{context}: {other}")),
    }
}

#[async_trait]
impl Scaler for PredictiveScaler {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn is_active(&self, ctx: &Context) -> ScalerResult<Activity> {
        let observations = self.history(ctx).await?;
        let active = last_observed(&observations) > 0;

        let engine = &self.backends()?.engine;
        match ctx.run(engine.health()).await {
            Ok(()) => Ok(Activity::healthy(active)),
            Err(err @ (ScalerError::Timeout | ScalerError::Cancelled)) => Err(err),
            Err(err) => {
                warn!(error = %err, "forecasting engine health check failed");
                let err = match err {
                    ScalerError::DegradedHealth(_) => err,
                    other => ScalerError::DegradedHealth(other.to_string()),
                };
                Ok(Activity::degraded(active, err))
            }
        }
    }

    fn get_metric_spec_for_scaling(&self) -> Vec<MetricSpec> {
        vec![MetricSpec {
            metric_name: self.metadata.metric_name(),
            target: metric_target(self.target_type, self.metadata.threshold),
        }]
    }

    async fn get_metrics(&self, ctx: &Context, metric_name: &str) -> ScalerResult<Vec<MetricValue>> {
        let value = self.forecast(ctx).await.inspect_err(|e| {
            warn!(error = %e, "error fetching predict metrics");
        })?;
        if value == 0 {
            return Err(ScalerError::ZeroResult);
        }
        Ok(vec![MetricValue::now(metric_name, value)])
    }

    async fn close(&mut self) -> ScalerResult<()> {
        self.lifecycle.close()?;
        self.backends = None;
        Ok(())
    }
}
