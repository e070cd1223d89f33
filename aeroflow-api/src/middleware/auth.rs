use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Passenger,
    Staff,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Passenger => "passenger",
            Role::Staff => "staff",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

pub const ADMIN: &[Role] = &[Role::Admin];
pub const OPERATIONS: &[Role] = &[Role::Admin, Role::Agent];
pub const DESK: &[Role] = &[Role::Admin, Role::Agent, Role::Staff];

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: Role, ttl_seconds: u64) -> Self {
        Self {
            sub: sub.into(),
            role,
            exp: (Utc::now() + Duration::seconds(ttl_seconds as i64)).timestamp() as usize,
        }
    }

    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::AuthorizationError(format!(
                "User role {} is not authorized to access this route",
                self.role.as_str()
            )))
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Decodes the bearer token and injects [`Claims`] into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Not authorized to access this route".into()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Not authorized to access this route".into()))?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
