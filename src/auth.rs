use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{ApiError, Denial},
    role::Role,
};

/// Claims
///
/// The credential payload: who the caller is and what role they held when the token was issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub user_email: String,
    pub user_role: Role,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds). Always validated.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to encode token: {0}")]
    Encode(String),

    #[error("token has expired")]
    Expired,

    /// Bad signature, malformed token, wrong algorithm, missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// TokenCodec
///
/// Issues and verifies HS256 credentials. Keys, algorithm and TTL are fixed when the
/// codec is built from `AppConfig` at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// issue
    ///
    /// Signs a credential for `identity` that expires `ttl` from now.
    pub fn issue(&self, identity: Uuid, email: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| TokenError::Encode(format!("lifetime of {:?} is out of range", self.ttl)))?;
        let claims = Claims {
            user_id: identity,
            user_email: email.to_string(),
            user_role: role,
            iat: now,
            exp,
        };
        self.encode_claims(&claims)
    }

    /// Signs arbitrary claims with the process secret. `issue` is the normal entry point.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// verify
    ///
    /// Checks signature, algorithm and expiry, then returns the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

/// AuthUser
///
/// The caller identity attached to the request by `auth_gate`. Handlers and the ownership
/// gate take it as an extractor; it is never rebuilt from the token twice.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.user_id,
            email: claims.user_email,
            role: claims.user_role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when `auth_gate` ran first; a route wired without it fails closed.
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// AuthGate
///
/// State for one `auth_gate` layer: the codec plus the roles admitted by that route group.
/// An empty role set admits any authenticated caller.
#[derive(Clone)]
pub struct AuthGate {
    pub tokens: Arc<TokenCodec>,
    pub allowed: &'static [Role],
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenCodec>, allowed: &'static [Role]) -> Self {
        Self { tokens, allowed }
    }

    /// authenticate
    ///
    /// Resolves the bearer credential from `headers` and checks role membership.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;

        let claims = self.tokens.verify(token).map_err(|e| {
            tracing::debug!("rejecting credential: {}", e);
            ApiError::from(e)
        })?;

        if !self.allowed.is_empty() && !self.allowed.contains(&claims.user_role) {
            tracing::debug!(role = %claims.user_role, "role not admitted on this route");
            return Err(ApiError::Forbidden(Denial::Role));
        }

        Ok(claims.into())
    }
}

/// Extracts `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// auth_gate
///
/// Route-layer middleware. Rejects the request with 401 unless it carries a valid credential
/// whose role is admitted, then stores the resolved `AuthUser` in the request extensions.
pub async fn auth_gate(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = gate.authenticate(request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
