//! GCP credential resolution for bucket access.

use std::path::PathBuf;

use scalegrid_core::{ScalerConfig, ScalerError, ScalerResult, Secret};

/// Pod identity provider that enables ambient workload identity.
pub const GCP_POD_IDENTITY: &str = "gcp";

/// Where the storage client takes its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcpAuthorization {
    /// Workload identity from the metadata server.
    PodIdentity,
    /// Service account key JSON, passed inline.
    CredentialsJson(Secret),
    /// Path to a service account key file.
    CredentialsFile(PathBuf),
}

impl GcpAuthorization {
    /// Resolve credentials, first match wins:
    /// pod identity, `GoogleApplicationCredentials` auth param,
    /// `credentialsFromEnv`, then `credentialsFromEnvFile`.
    pub fn resolve(config: &ScalerConfig) -> ScalerResult<Self> {
        if config.pod_identity.as_deref() == Some(GCP_POD_IDENTITY) {
            return Ok(Self::PodIdentity);
        }

        if let Some(json) = config
            .auth("GoogleApplicationCredentials")
            .filter(|v| !v.is_empty())
        {
            return Ok(Self::CredentialsJson(Secret::new(json)));
        }

        if let Some(json) = from_env(config, "credentialsFromEnv") {
            return Ok(Self::CredentialsJson(Secret::new(json)));
        }

        if let Some(path) = from_env(config, "credentialsFromEnvFile") {
            return Ok(Self::CredentialsFile(PathBuf::from(path)));
        }

        Err(ScalerError::config("GoogleApplicationCredentials not found"))
    }
}

/// Value of the resolved env var named by trigger key `key`.
fn from_env<'a>(config: &'a ScalerConfig, key: &str) -> Option<&'a str> {
    let var = config.metadata(key).filter(|v| !v.is_empty())?;
    config
        .resolved_env
        .get(var)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}
