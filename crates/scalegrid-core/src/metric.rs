//! Metric identity, targets and values exchanged with the autoscaler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the autoscaler compares the metric against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricTargetType {
    /// Compare the raw metric value against the target.
    Value,
    /// Divide the metric by the replica count before comparing.
    AverageValue,
}

/// Target half of a metric spec. Exactly one of `value` and
/// `average_value` is set, matching `target_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTarget {
    pub target_type: MetricTargetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_value: Option<i64>,
}

/// Build the target for a threshold. Shared by all scalers.
pub fn metric_target(target_type: MetricTargetType, threshold: i64) -> MetricTarget {
    match target_type {
        MetricTargetType::Value => MetricTarget {
            target_type,
            value: Some(threshold),
            average_value: None,
        },
        MetricTargetType::AverageValue => MetricTarget {
            target_type,
            value: None,
            average_value: Some(threshold),
        },
    }
}

/// Static description of what a scaler measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric_name: String,
    pub target: MetricTarget,
}

/// A live measurement returned on each poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub metric_name: String,
    /// Integer quantity in the autoscaler's metric encoding.
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl MetricValue {
    /// A value stamped with the current time.
    pub fn now(metric_name: &str, value: i64) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// One timestamped sample of a backend's historical signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub metric_name: String,
}

/// Replace characters the metrics API rejects in metric names.
pub fn normalize_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '.' | ':' | '%' | '(' | ')' | '"' | ' ' | '<' | '>' | '$' | '=' => '-',
            other => other,
        })
        .collect()
}

/// Qualify a metric name with its trigger index so two triggers of the
/// same kind on one scaled object never collide.
pub fn metric_name_with_index(scaler_index: usize, metric_name: &str) -> String {
    format!("s{scaler_index}-{metric_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_target_sets_only_value() {
        let target = metric_target(MetricTargetType::Value, 42);
        assert_eq!(target.value, Some(42));
        assert_eq!(target.average_value, None);
    }

    #[test]
    fn average_value_target_sets_only_average() {
        let target = metric_target(MetricTargetType::AverageValue, 100);
        assert_eq!(target.value, None);
        assert_eq!(target.average_value, Some(100));
    }

    #[test]
    fn normalize_replaces_reserved_characters() {
        assert_eq!(normalize_string("gcp-storage-my.bucket/a"), "gcp-storage-my-bucket-a");
        assert_eq!(normalize_string("rate(x[5m]) > 0"), "rate-x[5m]----0");
        assert_eq!(normalize_string("plain_name"), "plain_name");
    }

    #[test]
    fn index_qualified_names_are_distinct() {
        let a = metric_name_with_index(0, "gcp-storage-uploads");
        let b = metric_name_with_index(1, "gcp-storage-uploads");
        assert_eq!(a, "s0-gcp-storage-uploads");
        assert_ne!(a, b);
    }

    #[test]
    fn target_serializes_without_empty_side() {
        let json = serde_json::to_value(metric_target(MetricTargetType::Value, 5)).unwrap();
        assert_eq!(json["value"], 5);
        assert!(json.get("average_value").is_none());
    }
}
