//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs issued by the identity provider with the shared
//! `JWT_SECRET`, carrying `{userId, role, exp}`. The role in the token is not
//! trusted: the extractor reads the current role from the user directory, so
//! a role change applies to the very next request.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::policy::Identity;
use crate::domain::value_objects::Role;
use crate::EcommerceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub role: Role,
    pub exp: u64,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self { encoding: EncodingKey::from_secret(secret), decoding: DecodingKey::from_secret(secret) }
    }

    /// Signs a token valid for `ttl`. Used by tooling and tests; end users get
    /// their tokens from the identity provider.
    pub fn issue(&self, user_id: Uuid, role: Role, ttl: chrono::Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as u64;
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &Claims { user_id, role, exp }, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(EcommerceError::Unauthorized)?;
        let claims = state.keys.verify(token).map_err(|e| {
            tracing::debug!("rejected bearer token: {}", e);
            EcommerceError::Unauthorized
        })?;
        let role = state.users.role_of(claims.user_id).await?.ok_or_else(|| {
            tracing::debug!(user_id = %claims.user_id, "token for unknown user");
            EcommerceError::Unauthorized
        })?;
        Ok(Identity::new(claims.user_id, role))
    }
}
