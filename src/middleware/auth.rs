use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, routes::AppState};

/// Id of the caller, as forwarded by the identity provider in a trusted header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl AuthUser {
    /// Rejects access to another user's resources
    pub fn ensure_owns(&self, user_id: &str) -> Result<(), AppError> {
        if self.0 == user_id {
            Ok(())
        } else {
            tracing::warn!(caller = %self.0, target_user = %user_id, "Cross-user access denied");
            Err(AppError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&state.auth_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| AuthUser(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
