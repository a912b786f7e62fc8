//! Request extractors resolving the session cookie to a user.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::session::{read_cookie, SESSION_COOKIE};
use crate::db::models::AppUser;
use crate::error::AppError;
use crate::state::AppState;

/// Current user if the request carries a valid session. Never rejects; a
/// store failure is logged and treated as anonymous.
pub struct SessionUser(pub Option<AppUser>);

/// A signed-in user with the `admin` role.
pub struct AdminUser(pub AppUser);

pub async fn resolve_session(parts: &Parts, state: &AppState) -> Option<AppUser> {
    let token = read_cookie(&parts.headers, SESSION_COOKIE)?;
    let claims = state.sessions.verify(&token)?;
    match state.store.find_user_by_github_id(&claims.sub).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "session user lookup failed");
            None
        }
    }
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(SessionUser(resolve_session(parts, state).await))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = resolve_session(parts, state)
            .await
            .ok_or(AppError::Unauthorized)?;
        if !user.is_admin() {
            tracing::warn!(github_id = %user.github_id, path = %parts.uri.path(), "non-admin denied");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
