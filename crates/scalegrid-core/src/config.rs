//! Trigger configuration handed to a scaler at construction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ScalerError, ScalerResult};
use crate::metric::MetricTargetType;

/// A credential that must never show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Raw, unvalidated configuration for one trigger.
///
/// Produced by whatever loads scaled-object definitions. A scaler parses
/// it once into its own typed metadata and never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Flat key-value trigger metadata.
    #[serde(default)]
    pub trigger_metadata: HashMap<String, String>,
    /// Secrets resolved from trigger authentication.
    #[serde(default)]
    pub auth_params: HashMap<String, String>,
    /// Environment of the scale target, used for `*FromEnv` lookups.
    #[serde(default)]
    pub resolved_env: HashMap<String, String>,
    /// Pod identity provider, e.g. `gcp`.
    #[serde(default)]
    pub pod_identity: Option<String>,
    /// Position of this trigger on its scaled object.
    #[serde(default)]
    pub scaler_index: usize,
    /// Requested metric target type: "", "Value" or "AverageValue".
    #[serde(default)]
    pub metric_type: String,
}

impl ScalerConfig {
    pub fn new(scaler_index: usize) -> Self {
        Self {
            scaler_index,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.trigger_metadata
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_auth(mut self, key: &str, value: &str) -> Self {
        self.auth_params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.resolved_env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_metric_type(mut self, metric_type: &str) -> Self {
        self.metric_type = metric_type.to_string();
        self
    }

    /// Look up a trigger metadata key.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.trigger_metadata.get(key).map(String::as_str)
    }

    /// Look up an auth parameter.
    pub fn auth(&self, key: &str) -> Option<&str> {
        self.auth_params.get(key).map(String::as_str)
    }

    /// Resolve the requested metric target type.
    pub fn metric_target_type(&self) -> ScalerResult<MetricTargetType> {
        match self.metric_type.as_str() {
            "" | "AverageValue" => Ok(MetricTargetType::AverageValue),
            "Value" => Ok(MetricTargetType::Value),
            "Utilization" => Err(ScalerError::config(
                "'Utilization' metric type is unsupported for external metrics, \
                 allowed values are 'Value' or 'AverageValue'",
            )),
            other => Err(ScalerError::config(format!(
                "unknown metric type: {other}, allowed values are 'Value' or 'AverageValue'"
            ))),
        }
    }

    /// Parse an optional boolean trigger key, falling back to `default`.
    pub fn metadata_bool(&self, key: &str, default: bool) -> ScalerResult<bool> {
        match self.metadata(key) {
            None | Some("") => Ok(default),
            Some(raw) => raw
                .parse::<bool>()
                .map_err(|e| ScalerError::config(format!("error parsing {key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metric_type_is_average_value() {
        let config = ScalerConfig::new(0);
        assert_eq!(
            config.metric_target_type().unwrap(),
            MetricTargetType::AverageValue
        );
    }

    #[test]
    fn explicit_value_metric_type() {
        let config = ScalerConfig::new(0).with_metric_type("Value");
        assert_eq!(config.metric_target_type().unwrap(), MetricTargetType::Value);
    }

    #[test]
    fn utilization_is_rejected() {
        let config = ScalerConfig::new(0).with_metric_type("Utilization");
        let err = config.metric_target_type().unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn unknown_metric_type_is_rejected() {
        let config = ScalerConfig::new(0).with_metric_type("Percent");
        assert!(config.metric_target_type().is_err());
    }

    #[test]
    fn metadata_bool_parsing() {
        let config = ScalerConfig::new(0)
            .with_metadata("unsafeSsl", "true")
            .with_metadata("broken", "yes");
        assert!(config.metadata_bool("unsafeSsl", false).unwrap());
        assert!(!config.metadata_bool("absent", false).unwrap());
        assert!(config.metadata_bool("broken", false).is_err());
    }

    #[test]
    fn secrets_are_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ScalerConfig = toml::from_str(
            r#"
scaler_index = 2

[trigger_metadata]
bucketName = "uploads"
"#,
        )
        .unwrap();
        assert_eq!(config.scaler_index, 2);
        assert_eq!(config.metadata("bucketName"), Some("uploads"));
        assert!(config.auth_params.is_empty());
        assert!(config.pod_identity.is_none());
    }
}
