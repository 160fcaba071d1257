//! Authentication and authorization with session tokens and API keys
//!
//! Callers authenticate with either a JWT bearer token obtained from the
//! login endpoint or a team API key sent in the `KEY` header. The
//! [`check_authorization`] middleware is applied to plugin routes when they
//! are registered, so a rejected caller never reaches a controller.

use crate::error::ApiError;
use crate::types::{ErrorResponse, LoginRequest, LoginResponse};
use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{DateTime, Duration, TimeDelta, Utc};
use dashmap::DashMap;
use dnp3_core::config::AuthSection;
use dnp3_core::Access;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Header carrying a team API key.
pub const API_KEY_HEADER: &str = "KEY";

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key
    pub jwt_secret: String,

    /// JWT token expiration duration
    pub jwt_expiration: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration: Duration::hours(8),
        }
    }
}

impl AuthConfig {
    /// Converts the configured lifetime, rejecting values chrono cannot represent.
    pub fn from_section(section: &AuthSection) -> Result<Self> {
        let jwt_expiration = i64::try_from(section.jwt_expiration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                anyhow!(
                    "auth.jwt_expiration_secs out of range: {}",
                    section.jwt_expiration_secs
                )
            })?;

        Ok(Self {
            jwt_secret: section.jwt_secret.clone(),
            jwt_expiration,
        })
    }
}

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Team the user belongs to
    pub group: Access,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn new(username: String, group: Access, expiration: Duration) -> Result<Self> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(expiration)
            .ok_or_else(|| anyhow!("Token expiration overflows"))?;

        Ok(Self {
            sub: username,
            group,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::new_v4().to_string(),
        })
    }
}

// ============================================================================
// Credential Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub group: Access,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: Uuid,
    pub key_digest: [u8; 32],
    pub group: Access,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Caller identity attached to authorized requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub access: BTreeSet<Access>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, group: Access) -> Self {
        Self {
            subject: subject.into(),
            access: Access::granted_to(group),
        }
    }

    pub fn has_access(&self, required: Access) -> bool {
        self.access.contains(&required)
    }
}

// ============================================================================
// Authentication Service
// ============================================================================

pub struct AuthService {
    config: AuthConfig,
    users: DashMap<String, User>,
    api_keys: DashMap<Uuid, ApiKey>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            users: DashMap::new(),
            api_keys: DashMap::new(),
            encoding_key,
            decoding_key,
        }
    }

    /// Builds the service from configuration, registering every configured
    /// user and API key.
    pub fn from_section(section: &AuthSection) -> Result<Self> {
        let service = Self::new(AuthConfig::from_section(section)?);

        for user in &section.users {
            service
                .create_user(user.username.clone(), &user.password, user.group)
                .with_context(|| format!("Failed to create user {}", user.username))?;
        }
        if let Some(key) = &section.api_key_red {
            service.register_api_key(key, Access::Red)?;
        }
        if let Some(key) = &section.api_key_blue {
            service.register_api_key(key, Access::Blue)?;
        }

        info!(
            users = service.users.len(),
            api_keys = service.api_keys.len(),
            "Authorization service configured"
        );
        Ok(service)
    }

    /// Hash a secret using Argon2
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a secret against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| anyhow!("Failed to parse password hash: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Create a new user
    pub fn create_user(&self, username: String, password: &str, group: Access) -> Result<Uuid> {
        if self.users.contains_key(&username) {
            return Err(anyhow!("User already exists"));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.clone(),
            password_hash: self.hash_password(password)?,
            group,
            created_at: Utc::now(),
        };

        let user_id = user.id;
        self.users.insert(username, user);
        Ok(user_id)
    }

    /// Register a team API key
    pub fn register_api_key(&self, key: &str, group: Access) -> Result<Uuid> {
        let record = ApiKey {
            id: Uuid::new_v4(),
            key_digest: api_key_digest(key),
            group,
            created_at: Utc::now(),
            last_used: None,
        };

        let key_id = record.id;
        self.api_keys.insert(key_id, record);
        Ok(key_id)
    }

    /// Authenticate user and generate JWT token
    pub fn login(&self, username: &str, password: &str) -> Result<(String, DateTime<Utc>, Access)> {
        let user = self
            .users
            .get(username)
            .ok_or_else(|| anyhow!("Invalid credentials"))?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(anyhow!("Invalid credentials"));
        }

        let claims = Claims::new(user.username.clone(), user.group, self.config.jwt_expiration)?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| anyhow!("Invalid expiration timestamp"))?;

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")?;

        Ok((token, expires_at, user.group))
    }

    /// Verify and decode JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .context("Invalid JWT token")?;

        Ok(token_data.claims)
    }

    /// Verify API key and return its team
    pub fn verify_api_key(&self, api_key: &str) -> Result<Access> {
        let digest = api_key_digest(api_key);
        let matched = self
            .api_keys
            .iter()
            .filter(|entry| digests_match(&entry.key_digest, &digest))
            .map(|entry| (entry.id, entry.group))
            .next();

        let (key_id, group) = matched.ok_or_else(|| anyhow!("Invalid API key"))?;
        if let Some(mut entry) = self.api_keys.get_mut(&key_id) {
            entry.last_used = Some(Utc::now());
        }
        Ok(group)
    }

    /// Resolve the caller from request headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> std::result::Result<Principal, AuthError> {
        if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
            let claims = self
                .verify_token(bearer.token())
                .map_err(|_| AuthError::InvalidToken)?;
            return Ok(Principal::new(claims.sub, claims.group));
        }

        if let Some(api_key) = headers.get(API_KEY_HEADER) {
            let api_key = api_key.to_str().map_err(|_| AuthError::InvalidApiKey)?;
            let group = self
                .verify_api_key(api_key)
                .map_err(|_| AuthError::InvalidApiKey)?;
            return Ok(Principal::new(format!("api_key:{}", group), group));
        }

        Err(AuthError::MissingCredentials)
    }
}

fn api_key_digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Compares every byte regardless of where the first mismatch is.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ============================================================================
// Authorization Middleware
// ============================================================================

/// State for [`check_authorization`]: who verifies, and what is required.
#[derive(Clone)]
pub struct AccessGuard {
    pub auth: Arc<AuthService>,
    pub required: Access,
}

impl AccessGuard {
    pub fn new(auth: Arc<AuthService>, required: Access) -> Self {
        Self { auth, required }
    }
}

/// Rejects the request unless the caller holds the guard's access level.
///
/// On success the [`Principal`] is stored in the request extensions.
pub async fn check_authorization(
    State(guard): State<AccessGuard>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, AuthError> {
    let principal = guard.auth.authenticate(request.headers()).map_err(|e| {
        debug!(uri = %request.uri(), error = %e, "Rejected unauthenticated request");
        e
    })?;

    if !principal.has_access(guard.required) {
        warn!(
            subject = %principal.subject,
            required = %guard.required,
            uri = %request.uri(),
            "Insufficient access"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// ============================================================================
// Login Endpoint
// ============================================================================

pub fn create_auth_router(auth: Arc<AuthService>) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .with_state(auth)
}

/// POST /api/v1/auth/login - Exchange credentials for a session token
async fn login(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> std::result::Result<Json<LoginResponse>, ApiError> {
    request.validate()?;

    let (access_token, expires_at, group) = auth
        .login(&request.username, &request.password)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    info!(username = request.username, group = %group, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        expires_at,
        group,
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid JWT token")]
    InvalidToken,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "missing_credentials",
                "Authentication required",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or expired JWT token",
            ),
            AuthError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                "Invalid API key",
            ),
            AuthError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "insufficient_permissions",
                "Insufficient permissions for this operation",
            ),
        };

        let body = Json(ErrorResponse::new(error_code, message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use dnp3_core::config::UserEntry;

    fn test_service() -> AuthService {
        let auth = AuthService::new(AuthConfig::default());
        auth.create_user("red".to_string(), "redpassword", Access::Red)
            .unwrap();
        auth.register_api_key("blue-key", Access::Blue).unwrap();
        auth
    }

    #[test]
    fn test_password_hashing() {
        let auth = AuthService::new(AuthConfig::default());
        let hash = auth.hash_password("test_password_123").unwrap();
        assert!(auth.verify_password("test_password_123", &hash).unwrap());
        assert!(!auth.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let auth = test_service();
        assert!(auth
            .create_user("red".to_string(), "otherpassword", Access::Red)
            .is_err());
    }

    #[test]
    fn test_jwt_flow() {
        let auth = test_service();
        let (token, expires_at, group) = auth.login("red", "redpassword").unwrap();
        assert_eq!(group, Access::Red);
        assert!(expires_at > Utc::now());

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "red");
        assert_eq!(claims.group, Access::Red);

        assert!(auth.login("red", "wrongpassword").is_err());
        assert!(auth.login("nobody", "redpassword").is_err());
    }

    #[test]
    fn test_api_key_verification() {
        let auth = test_service();
        assert_eq!(auth.verify_api_key("blue-key").unwrap(), Access::Blue);
        assert!(auth.verify_api_key("red-key").is_err());
    }

    #[test]
    fn test_authenticate_headers() {
        let auth = test_service();

        let (token, _, _) = auth.login("red", "redpassword").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let principal = auth.authenticate(&headers).unwrap();
        assert_eq!(principal.subject, "red");
        assert!(principal.has_access(Access::Red));
        assert!(principal.has_access(Access::App));
        assert!(!principal.has_access(Access::Blue));

        let mut headers = HeaderMap::new();
        headers.insert("key", HeaderValue::from_static("blue-key"));
        let principal = auth.authenticate(&headers).unwrap();
        assert!(principal.has_access(Access::Blue));
        assert!(!principal.has_access(Access::Red));

        assert!(matches!(
            auth.authenticate(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer garbage"));
        assert!(matches!(
            auth.authenticate(&headers),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_from_section() {
        let section = AuthSection {
            api_key_red: Some("red-key".to_string()),
            users: vec![UserEntry {
                username: "blue".to_string(),
                password: "bluepassword".to_string(),
                group: Access::Blue,
            }],
            ..Default::default()
        };

        let auth = AuthService::from_section(&section).unwrap();
        assert_eq!(auth.verify_api_key("red-key").unwrap(), Access::Red);
        let (_, _, group) = auth.login("blue", "bluepassword").unwrap();
        assert_eq!(group, Access::Blue);
    }

    #[test]
    fn test_from_section_rejects_unrepresentable_expiration() {
        let section = AuthSection {
            jwt_expiration_secs: 10_000_000_000_000_000,
            ..Default::default()
        };
        assert!(AuthConfig::from_section(&section).is_err());
        assert!(AuthService::from_section(&section).is_err());

        let section = AuthSection {
            jwt_expiration_secs: u64::MAX,
            ..Default::default()
        };
        assert!(AuthConfig::from_section(&section).is_err());
    }

    #[test]
    fn test_login_with_overflowing_expiration_fails() {
        let section = AuthSection {
            jwt_expiration_secs: 10_000_000_000_000,
            ..Default::default()
        };
        let auth = AuthService::new(AuthConfig::from_section(&section).unwrap());
        auth.create_user("red".to_string(), "redpassword", Access::Red)
            .unwrap();

        assert!(auth.login("red", "redpassword").is_err());
        assert!(Claims::new("red".to_string(), Access::Red, TimeDelta::MAX).is_err());
    }

    #[test]
    fn test_api_key_lookup_records_last_use() {
        let auth = AuthService::new(AuthConfig::default());
        let red_id = auth.register_api_key("red-key", Access::Red).unwrap();
        let blue_id = auth.register_api_key("blue-key", Access::Blue).unwrap();

        assert!(auth.verify_api_key("nope").is_err());
        assert!(auth.api_keys.get(&red_id).unwrap().last_used.is_none());

        assert_eq!(auth.verify_api_key("red-key").unwrap(), Access::Red);
        assert!(auth.api_keys.get(&red_id).unwrap().last_used.is_some());
        assert!(auth.api_keys.get(&blue_id).unwrap().last_used.is_none());
    }

    #[test]
    fn test_digest_comparison() {
        let a = api_key_digest("red-key");
        assert!(digests_match(&a, &api_key_digest("red-key")));
        assert!(!digests_match(&a, &api_key_digest("red-kez")));
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
