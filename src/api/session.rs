//! Bearer-token session extractor

use super::state::AppState;
use crate::error::PortalError;
use crate::services::Claims;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Verified claims from an `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| PortalError::Unauthorized("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PortalError::Unauthorized("malformed authorization header".to_string()))?;

        let claims = state.auth.verify_token(token)?;
        Ok(Session { claims })
    }
}
