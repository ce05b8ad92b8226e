//! Custom error types for key-runner.
//!
//! Configuration problems are reported as [`ConfigError`] and surface from
//! [`KeyRunner::start`](crate::KeyRunner::start) wrapped in [`StartError`].
//! Failures inside an active run are [`RuntimeError`]s; they end the run and
//! are reported through the status stream.

use thiserror::Error;

/// Errors produced while parsing or validating run parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key sequence contained no symbols.
    #[error("key sequence is empty")]
    EmptySequence,

    /// A symbol has no entry in the key table.
    #[error("unsupported key '{0}'")]
    UnknownKey(String),

    /// The inter-key delay is missing, malformed or not positive.
    #[error("invalid inter-key delay '{value}': {reason}")]
    InvalidDelay { value: String, reason: String },

    /// The pre-start wait is malformed or negative.
    #[error("invalid wait time '{value}': {reason}")]
    InvalidWait { value: String, reason: String },

    /// The repeat count is malformed or not positive.
    #[error("invalid repeat count '{value}': {reason}")]
    InvalidCount { value: String, reason: String },

    /// Error reading or parsing a configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    Load { path: String, reason: String },

    /// Error writing a configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    Save { path: String, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid_delay(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDelay {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_wait(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWait {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_count(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCount {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Save {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Reasons [`KeyRunner::start`](crate::KeyRunner::start) can refuse a run.
///
/// A rejected start never leaves a partially started loop behind.
#[derive(Error, Debug)]
pub enum StartError {
    /// A run is already active.
    #[error("a key loop is already running")]
    AlreadyRunning,

    /// The supplied configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Failures that terminate an active run.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A symbol could not be resolved to a key code.
    #[error("cannot simulate key '{0}': unsupported key")]
    UnresolvedSymbol(String),

    /// The platform backend rejected a key event.
    #[error("cannot simulate key '{symbol}': {source}")]
    Injection {
        symbol: String,
        #[source]
        source: InjectError,
    },
}

/// Error raised by a [`KeyInjector`](crate::KeyInjector) backend.
#[derive(Error, Debug)]
pub enum InjectError {
    /// The backend could not be initialised.
    #[error("failed to initialise input backend: {0}")]
    Init(String),

    /// The backend has no mapping for the key code.
    #[error("key code {0:#04x} is not supported on this platform")]
    UnsupportedCode(u16),

    /// The OS call failed.
    #[error("key event failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid_delay("0", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid inter-key delay '0': must be greater than 0"
        );

        let err = ConfigError::UnknownKey("xyz".to_string());
        assert_eq!(err.to_string(), "unsupported key 'xyz'");

        let err = StartError::from(ConfigError::EmptySequence);
        assert_eq!(err.to_string(), "invalid configuration: key sequence is empty");

        let err = RuntimeError::UnresolvedSymbol("foo".to_string());
        assert_eq!(err.to_string(), "cannot simulate key 'foo': unsupported key");
    }

    #[test]
    fn test_injection_error_keeps_source() {
        use std::error::Error as _;

        let err = RuntimeError::Injection {
            symbol: "a".to_string(),
            source: InjectError::UnsupportedCode(0x41),
        };
        assert!(err.to_string().contains("0x41"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
