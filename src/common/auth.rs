use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::config::Config;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles drive which dashboard a client opens. The server only checks
/// `LabAdmin` for user management and removal of finalized samples.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Factory,
    Tester,
    LabAdmin,
    Unknown(String),
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Factory => f.write_str("factory"),
            Role::Tester => f.write_str("tester"),
            Role::LabAdmin => f.write_str("labadmin"),
            Role::Unknown(unknown) => f.write_str(unknown),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "factory" => Role::Factory,
            "tester" => Role::Tester,
            "labadmin" => Role::LabAdmin,
            _ => Role::Unknown(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(
    config: &Config,
    user_id: Uuid,
    email: &str,
    name: &str,
    role: &Role,
) -> Result<String, BusinessError> {
    let now = Utc::now();
    let expires = now + Duration::hours(config.token_ttl_hours);
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        role: role.clone(),
        iat: usize::try_from(now.timestamp()).unwrap_or_default(),
        exp: usize::try_from(expires.timestamp()).unwrap_or_default(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| BusinessError::internal(format!("Failed to sign token: {e}")))
}

pub fn verify_token(config: &Config, token: &str) -> Result<Claims, BusinessError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {e}");
        BusinessError::unauthorized("Invalid or expired token")
    })
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, BusinessError> {
    bcrypt::hash(password, cost)
        .map_err(|e| BusinessError::internal(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// The authenticated caller, extracted from the `Authorization: Bearer`
/// header. Handlers that take an `AuthSession` argument are protected.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthSession {
    pub fn require_role(&self, role: &Role, action: &str, resource: &str) -> Result<(), BusinessError> {
        if &self.role == role {
            Ok(())
        } else {
            Err(BusinessError::Forbidden {
                action: action.to_string(),
                resource: resource.to_string(),
            })
        }
    }
}

impl From<Claims> for AuthSession {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = BusinessError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| BusinessError::unauthorized("Missing Authorization header"))?
            .to_str()
            .map_err(|_| BusinessError::unauthorized("Malformed Authorization header"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BusinessError::unauthorized("Expected a Bearer token"))?;

        verify_token(&state.config, token).map(AuthSession::from)
    }
}
