//! Error types for the DNP3 plugin.
//!
//! Errors are grouped by the collaborator that raises them: the ability
//! catalog (data service) and configuration loading. All leaf errors are
//! serializable so they can be logged as structured fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using Dnp3Error as the error type.
pub type Result<T> = std::result::Result<T, Dnp3Error>;

/// Top-level error type for plugin operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum Dnp3Error {
    /// Ability catalog errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the shared data service.
///
/// A failure here is fatal to the request that triggered the fetch; the
/// plugin never retries.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum DataError {
    /// The catalog root could not be read
    #[error("Failed to load ability catalog from {path}: {reason}")]
    CatalogLoadFailed { path: String, reason: String },

    /// An ability document could not be parsed
    #[error("Invalid ability document {path}: {reason}")]
    InvalidAbility { path: String, reason: String },

    /// The backing store is not reachable
    #[error("Data service unavailable: {reason}")]
    Unavailable { reason: String },
}

impl DataError {
    /// Creates a catalog load failure.
    pub fn load_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CatalogLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-ability error.
    pub fn invalid_ability(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAbility {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file could not be loaded
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Configuration could not be deserialized
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// A required field is missing
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// A field has an invalid value
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: Dnp3Error = DataError::unavailable("store offline").into();
        assert_eq!(
            err.to_string(),
            "Data error: Data service unavailable: store offline"
        );

        let err: Dnp3Error = ConfigError::missing_field("auth.jwt_secret").into();
        assert!(err.to_string().contains("auth.jwt_secret"));
    }

    #[test]
    fn test_error_serialization() {
        let err = Dnp3Error::Data(DataError::load_failed("/tmp/abilities", "not found"));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Data\""));
        assert!(json.contains("CatalogLoadFailed"));

        let back: Dnp3Error = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            Dnp3Error::Data(DataError::CatalogLoadFailed { .. })
        ));
    }
}
