//! JWT authentication module.
//!
//! Sessions belong to the external auth provider. The API only checks the
//! bearer token it issued: HS256 over the shared `JWT_SECRET`, not expired,
//! carrying the cashier in `sub` and their display name and email.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (cashier id)
    pub sub: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token verifier.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token the way the auth provider does. Used by tests and
    /// local tooling.
    pub fn issue(
        &self,
        cashier_id: &str,
        name: &str,
        email: &str,
        lifetime: Duration,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: cashier_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate and decode a token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Unauthorized".to_string())
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Extractor
// =============================================================================

/// The cashier behind a verified bearer token.
///
/// Taking this as a handler argument makes the route require
/// authentication; a missing or bad token answers 401 before the handler
/// runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedCashier {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedCashier {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        let claims = state.jwt.verify(token)?;

        Ok(AuthenticatedCashier {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        })
    }
}
