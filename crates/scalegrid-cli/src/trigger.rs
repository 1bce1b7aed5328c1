//! Trigger definition files consumed by the CLI.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use scalegrid_core::{EngineConfig, ScalerConfig};

/// One trigger as written in a TOML file.
///
/// ```toml
/// kind = "gcp-storage"
/// index = 0
///
/// [metadata]
/// bucketName = "uploads"
///
/// [auth]
/// GoogleApplicationCredentials = "..."
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerFile {
    pub kind: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub metric_type: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub auth: HashMap<String, String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub pod_identity: Option<String>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

impl TriggerFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading trigger file {}", path.display()))?;
        let trigger: TriggerFile = toml::from_str(&content)
            .with_context(|| format!("parsing trigger file {}", path.display()))?;
        Ok(trigger)
    }

    pub fn scaler_config(&self) -> ScalerConfig {
        ScalerConfig {
            trigger_metadata: self.metadata.clone(),
            auth_params: self.auth.clone(),
            resolved_env: self.env.clone(),
            pod_identity: self.pod_identity.clone(),
            scaler_index: self.index,
            metric_type: self.metric_type.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }
}
