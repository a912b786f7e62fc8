use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use super::{ok, Rpc, SUCCESS};
use crate::auth::SessionUser;
use crate::db::models::{AppUser, PortfolioSnapshot};
use crate::error::AppError;
use crate::state::AppState;

/// portfolio.getAll
pub async fn get_all(State(state): State<AppState>) -> Result<Rpc<PortfolioSnapshot>, AppError> {
    Ok(ok(state.store.snapshot().await?))
}

/// auth.me - `null` when signed out.
pub async fn me(SessionUser(user): SessionUser) -> Rpc<Option<AppUser>> {
    ok(user)
}

/// auth.logout - always succeeds and clears the cookie.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        ok(SUCCESS),
    )
}
