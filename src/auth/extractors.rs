use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::repo_types::User;
use super::services::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;

/// Validates the bearer token and loads the active user behind it.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;

        match User::find_by_id(&state.db, claims.id).await? {
            Some(user) if user.is_active => Ok(AuthUser(user)),
            _ => {
                warn!(user_id = %claims.id, "token for missing or inactive user");
                Err(AppError::Forbidden("User not found or inactive".into()))
            }
        }
    }
}
