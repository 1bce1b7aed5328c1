//! Connection tuning for the remote forecasting engine.
//!
//! Built once (defaults or a TOML table) and passed to every predictive
//! scaler constructor. Nothing here is mutated after startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_ENGINE_HOST: &str = "api.predictkube.com";
pub const DEFAULT_ENGINE_PORT: u16 = 443;
const DEFAULT_MAX_MESSAGE_SIZE: usize = 50 << 20;

/// How to reach the forecasting engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    /// Plaintext HTTP/2 instead of TLS. Only for local engines.
    pub insecure: bool,
    /// Extra PEM CA bundle trusted in addition to the web PKI roots.
    pub ca_file: Option<PathBuf>,
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub connect_timeout: Duration,
    /// Deadline for each call once the channel is up.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub request_timeout: Duration,
    /// Interval between HTTP/2 keep-alive pings.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub keepalive_interval: Duration,
    /// How long to wait for a ping ack before declaring the peer dead.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub keepalive_timeout: Duration,
    /// Send pings even with no active streams.
    pub keepalive_while_idle: bool,
    pub max_message_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ENGINE_HOST.to_string(),
            port: DEFAULT_ENGINE_PORT,
            insecure: false,
            ca_file: None,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(5 * 60),
            keepalive_timeout: Duration::from_secs(5 * 60),
            keepalive_while_idle: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// The engine URI with the scheme matching the TLS setting.
    pub fn uri(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_hosted_engine_over_tls() {
        let config = EngineConfig::default();
        assert_eq!(config.uri(), "https://api.predictkube.com:443");
        assert!(!config.keepalive_while_idle);
        assert_eq!(config.max_message_size, 50 * 1024 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
host = "127.0.0.1"
port = 50051
insecure = true
keepalive_interval = "30s"
request_timeout = "2.5s"
"#,
        )
        .unwrap();
        assert_eq!(config.uri(), "http://127.0.0.1:50051");
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(300));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }
}
