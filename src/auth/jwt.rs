use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;

/// Claims carried by access tokens. The user id is read from `id`; tokens
/// minted by the refresh flow name it `userId`.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(alias = "userId")]
    id: String,
    exp: i64,
}

/// Verifies HS256 bearer tokens signed with the shared secret
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.trim_matches('"').as_bytes()),
            validation,
        }
    }

    /// Validate a token and return the caller's user id
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ApiError::Unauthorized(format!("Invalid JWT token: {}", e))
        })?;

        Uuid::parse_str(&token_data.claims.id)
            .map_err(|_| ApiError::Unauthorized("Invalid user id in JWT".to_string()))
    }

    /// Authenticate a request from its `Authorization: Bearer` header
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, ApiError> {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = extract_jwt_from_header(auth_header)?;
        self.verify(token)
    }
}

/// Extract JWT token from Authorization header
/// Expected format: "Bearer <token>"
pub fn extract_jwt_from_header(auth_header: Option<&str>) -> Result<&str, ApiError> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::Unauthorized("Missing Authorization header".to_string())
    })?;

    let token = auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized(
            "Invalid Authorization header format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    if token.trim().is_empty() {
        return Err(ApiError::Unauthorized("Missing bearer token".to_string()));
    }
    Ok(token)
}
