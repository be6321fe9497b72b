use std::io;
use thiserror::Error;

/// Custom error type for the host monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: expected a record, got {0}")]
    InvalidType(String),

    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Host facts collection failed: {0}")]
    CollectionFailed(String),

    #[error("Provider '{source_name}' unavailable: {reason}")]
    ProviderUnavailable { source_name: String, reason: String },

    #[error("Monitor has been destroyed")]
    AlreadyDestroyed,

    #[error("Listener for '{kind}' failed: {message}")]
    ListenerError { kind: String, message: String },

    #[error("Cycle took {elapsed_ms}ms, longer than the {interval_ms}ms interval")]
    CycleOverrun { elapsed_ms: u64, interval_ms: u64 },

    #[error("Monitor runtime is no longer running")]
    RuntimeClosed,
}

/// Result type alias for the host monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create an invalid field error
    pub fn invalid_field<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        MonitorError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        MonitorError::InvalidArgument(msg.into())
    }

    /// Create a collection failure
    pub fn collection_failed<S: Into<String>>(msg: S) -> Self {
        MonitorError::CollectionFailed(msg.into())
    }

    pub fn provider_unavailable<S: Into<String>, R: Into<String>>(source: S, reason: R) -> Self {
        MonitorError::ProviderUnavailable {
            source_name: source.into(),
            reason: reason.into(),
        }
    }

    pub fn listener<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        MonitorError::ListenerError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by operator-supplied options
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MonitorError::InvalidType(_)
                | MonitorError::InvalidConfiguration { .. }
                | MonitorError::InvalidArgument(_)
        )
    }

    /// True for errors caused by host data being unavailable
    pub fn is_collection_error(&self) -> bool {
        matches!(
            self,
            MonitorError::CollectionFailed(_) | MonitorError::ProviderUnavailable { .. }
        )
    }
}
