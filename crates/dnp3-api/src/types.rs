//! Request and response bodies

use chrono::{DateTime, Utc};
use dnp3_core::Access;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username
    #[validate(length(min = 1, max = 100))]
    pub username: String,

    /// Password
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,

    /// Team the user belongs to
    pub group: Access,
}

// ============================================================================
// Plugin API
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MirrorResponse {
    /// Plugin that handled the request
    pub plugin: String,

    /// Document submitted by the caller, unchanged
    pub received: serde_json::Value,

    pub received_at: DateTime<Utc>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            username: "red".to_string(),
            password: "redpassword".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = LoginRequest {
            username: "red".to_string(),
            password: "short".to_string(),
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_error_response_shape() {
        let err = ErrorResponse::new("invalid_api_key", "Invalid API key");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "invalid_api_key");
        assert_eq!(json["message"], "Invalid API key");
        assert!(json.get("timestamp").is_some());
    }
}
