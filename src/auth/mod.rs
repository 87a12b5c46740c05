//! Identity-provider boundary. Tokens are minted by the surrounding staff
//! portal; this module only decodes a bearer JWT into the acting principal
//! `(staff_id, role)` and trusts it as already authenticated.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::workflow::StaffRole;
use crate::AppState;

/// Claims carried by staff access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Staff id
    pub sub: String,
    /// Display name
    pub name: String,
    /// Staff role, kebab-case
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The acting principal of every core operation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub staff_id: Uuid,
    pub role: StaffRole,
    pub name: String,
}

/// Issues an access token for a staff member. Used by the seed binary and
/// tests; production tokens come from the staff portal with the same shape.
pub fn issue_token(
    secret: &str,
    staff_id: Uuid,
    role: StaffRole,
    name: &str,
    ttl: Duration,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = Claims {
        sub: staff_id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::AuthError(e.to_string()))
}

/// Decodes and verifies a bearer token into the acting principal.
pub fn decode_token(secret: &str, token: &str) -> Result<AuthUser, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| ServiceError::AuthError(format!("Invalid token: {}", e)))?;

    let staff_id = data
        .claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| ServiceError::AuthError("Invalid token subject".to_string()))?;
    let role = data
        .claims
        .role
        .parse::<StaffRole>()
        .map_err(|_| ServiceError::AuthError("Unknown staff role".to_string()))?;

    Ok(AuthUser {
        staff_id,
        role,
        name: data.claims.name,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::AuthError("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::AuthError("Expected bearer token".to_string()))?;

        decode_token(&state.config.jwt_secret, token)
    }
}
