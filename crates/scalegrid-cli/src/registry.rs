//! Maps trigger kinds to scaler constructors.

use scalegrid_core::{Context, EngineConfig, Scaler, ScalerConfig, ScalerError, ScalerResult};
use scalegrid_predict::{PredictiveMetadata, PredictiveScaler};
use scalegrid_storage::{ObjectCountMetadata, ObjectCountScaler};

/// Trigger kinds this build can construct.
pub const KINDS: [&str; 2] = [scalegrid_predict::KIND, scalegrid_storage::KIND];

/// Construct and connect the scaler registered under `kind`.
pub async fn build_scaler(
    ctx: &Context,
    kind: &str,
    config: &ScalerConfig,
    engine: &EngineConfig,
) -> ScalerResult<Box<dyn Scaler>> {
    match kind {
        scalegrid_predict::KIND => Ok(Box::new(PredictiveScaler::new(ctx, config, engine).await?)),
        scalegrid_storage::KIND => Ok(Box::new(ObjectCountScaler::new(ctx, config).await?)),
        other => Err(unknown_kind(other)),
    }
}

/// Validate trigger metadata for `kind` without contacting any backend.
/// Returns the metric name the trigger would expose.
pub fn validate(kind: &str, config: &ScalerConfig) -> ScalerResult<String> {
    config.metric_target_type()?;
    match kind {
        scalegrid_predict::KIND => Ok(PredictiveMetadata::parse(config)?.metric_name()),
        scalegrid_storage::KIND => Ok(ObjectCountMetadata::parse(config)?.metric_name),
        other => Err(unknown_kind(other)),
    }
}

fn unknown_kind(kind: &str) -> ScalerError {
    ScalerError::config(format!(
        "unknown trigger kind {kind:?}, expected one of: {}",
        KINDS.join(", ")
    ))
}
