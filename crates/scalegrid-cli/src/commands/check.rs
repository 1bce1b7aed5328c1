use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use scalegrid_core::{Context, MetricSpec, MetricValue, Scaler};

use crate::registry;
use crate::trigger::TriggerFile;

/// Everything one poll of a trigger produced.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub kind: String,
    pub metric_specs: Vec<MetricSpec>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    pub metrics: Vec<MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_error: Option<String>,
}

/// Build the trigger's scaler, poll it once, print the result and close it.
pub async fn check(path: &Path, timeout: Duration, format: &str) -> anyhow::Result<()> {
    let trigger = TriggerFile::from_file(path)?;
    let config = trigger.scaler_config();

    let ctx = Context::background().with_timeout(timeout);
    let mut scaler =
        registry::build_scaler(&ctx, &trigger.kind, &config, &trigger.engine_config()).await?;
    info!(kind = scaler.kind(), "scaler connected");

    let report = poll(scaler.as_ref(), &Context::background().with_timeout(timeout)).await;
    scaler.close().await?;
    let report = report?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }
    Ok(())
}

/// One activity check and one metric read. A failed metric read is reported
/// rather than aborting, so the activity result is still shown.
pub async fn poll(scaler: &dyn Scaler, ctx: &Context) -> anyhow::Result<CheckReport> {
    let metric_specs = scaler.get_metric_spec_for_scaling();
    let activity = scaler.is_active(ctx).await?;
    if let Some(err) = &activity.degraded {
        warn!(error = %err, "scaler is degraded");
    }

    let metric_name = metric_specs
        .first()
        .map(|s| s.metric_name.clone())
        .unwrap_or_default();
    let (metrics, metrics_error) = match scaler.get_metrics(ctx, &metric_name).await {
        Ok(values) => (values, None),
        Err(err) => {
            warn!(error = %err, metric = %metric_name, "metric read failed");
            (Vec::new(), Some(err.to_string()))
        }
    };

    Ok(CheckReport {
        kind: scaler.kind().to_string(),
        metric_specs,
        active: activity.active,
        degraded: activity.degraded.map(|e| e.to_string()),
        metrics,
        metrics_error,
    })
}

fn print_text(report: &CheckReport) {
    println!("kind:    {}", report.kind);
    println!("active:  {}", report.active);
    if let Some(degraded) = &report.degraded {
        println!("health:  {degraded}");
    }
    for spec in &report.metric_specs {
        let target = spec.target.value.or(spec.target.average_value).unwrap_or_default();
        println!(
            "metric:  {} (target {:?} {target})",
            spec.metric_name, spec.target.target_type
        );
    }
    for value in &report.metrics {
        println!("value:   {} = {} at {}", value.metric_name, value.value, value.timestamp);
    }
    if let Some(err) = &report.metrics_error {
        println!("error:   {err}");
    }
}
