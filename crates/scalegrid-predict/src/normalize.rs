//! Flattening of Prometheus query results into observations.

use chrono::{DateTime, Utc};

use scalegrid_core::{Observation, ScalerError, ScalerResult};

use crate::prometheus::{QueryResult, SamplePair};

/// Convert any supported result shape into an ordered observation list.
///
/// Matrix results are flattened series by series, keeping sample order
/// inside each series.
pub fn normalize(result: &QueryResult, metric_name: &str) -> ScalerResult<Vec<Observation>> {
    match result {
        QueryResult::Vector(samples) => samples
            .iter()
            .map(|s| observation(&s.value, metric_name))
            .collect(),
        QueryResult::Matrix(series) => series
            .iter()
            .flat_map(|s| s.values.iter())
            .map(|pair| observation(pair, metric_name))
            .collect(),
        QueryResult::Scalar(pair) | QueryResult::String(pair) => {
            Ok(vec![observation(pair, metric_name)?])
        }
        QueryResult::Unknown(kind) => {
            tracing::debug!(result_type = %kind, "unsupported prometheus result type");
            Err(ScalerError::Normalization("metric type is invalid".to_string()))
        }
    }
}

fn observation(pair: &SamplePair, metric_name: &str) -> ScalerResult<Observation> {
    let SamplePair(ts, raw) = pair;
    let value = raw.trim().parse::<f64>().map_err(|e| {
        ScalerError::Normalization(format!("invalid sample value {raw:?}: {e}"))
    })?;
    Ok(Observation {
        timestamp: timestamp(*ts)?,
        value,
        metric_name: metric_name.to_string(),
    })
}

fn timestamp(seconds: f64) -> ScalerResult<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(ScalerError::Normalization(format!(
            "invalid sample timestamp {seconds}"
        )));
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64).ok_or_else(|| {
        ScalerError::Normalization(format!("sample timestamp {seconds} out of range"))
    })
}
