//! Error types shared by every scaler.

use thiserror::Error;

/// Result type alias for scaler operations.
pub type ScalerResult<T> = Result<T, ScalerError>;

/// Boxed source error carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building or polling a scaler.
#[derive(Debug, Error)]
pub enum ScalerError {
    /// A trigger field is missing or malformed. Fatal to construction.
    #[error("{0}")]
    Config(String),

    /// The backend could not be reached, or rejected our credentials,
    /// while the scaler was being built.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single backend call failed. The scaler stays usable.
    #[error("query error: {0}")]
    Query(String),

    /// The backend answered with a shape or value we cannot interpret.
    #[error("{0}")]
    Normalization(String),

    /// The backend health probe failed or returned nothing.
    #[error("can't connect grpc server: {0}")]
    DegradedHealth(String),

    /// The computation produced exactly zero.
    #[error("empty response after predict request")]
    ZeroResult,

    /// Enumerating a storage container failed part way through.
    #[error("failed to enumerate items after {counted} objects: {source}")]
    Enumeration {
        counted: i64,
        #[source]
        source: BoxError,
    },

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    /// The scaler's connection was already released.
    #[error("scaler is closed")]
    Closed,
}

impl ScalerError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Configuration error for a required field that was not supplied.
    pub fn missing(what: &str) -> Self {
        Self::Config(format!("no {what} given"))
    }

    /// Configuration error for a field that failed to parse.
    pub fn invalid(field: &str, err: impl std::fmt::Display) -> Self {
        Self::Config(format!("{field} parsing error {err}"))
    }

    /// Whether the error aborts scaler construction rather than a single call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = ScalerError::missing("query");
        assert_eq!(err.to_string(), "no query given");
        assert!(err.is_fatal());
    }

    #[test]
    fn enumeration_error_keeps_partial_count() {
        let err = ScalerError::Enumeration {
            counted: 7,
            source: "boom".into(),
        };
        assert!(err.to_string().contains("after 7 objects"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn query_errors_are_not_fatal() {
        assert!(!ScalerError::Query("refused".into()).is_fatal());
        assert!(!ScalerError::ZeroResult.is_fatal());
        assert!(!ScalerError::Timeout.is_fatal());
    }
}
