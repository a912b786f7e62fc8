use axum::extract::State;
use chrono::Utc;

use super::{ok, Rpc, RpcInput};
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::theme::{PageLayout, ThemeSettings, ThemeUpdate};

/// theme.get
pub async fn get(State(state): State<AppState>) -> Result<Rpc<ThemeSettings>, AppError> {
    Ok(ok(state.store.get_theme().await?))
}

/// theme.layout - section order, visibility and titles resolved for rendering.
pub async fn layout(State(state): State<AppState>) -> Result<Rpc<PageLayout>, AppError> {
    let settings = state.store.get_theme().await?;
    Ok(ok(PageLayout::from(&settings)))
}

/// theme.update
pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RpcInput(input): RpcInput<ThemeUpdate>,
) -> Result<Rpc<ThemeSettings>, AppError> {
    let current = state.store.get_theme().await?;
    let mut next = current.apply(input)?;
    next.updated_at = Some(Utc::now());
    let saved = state.store.save_theme(&next).await?;

    tracing::info!(
        target: "audit",
        admin = %admin.login,
        action = "theme.update",
        accent = %saved.accent_color,
        layout_mode = saved.layout_mode.as_str(),
        "admin mutation"
    );
    Ok(ok(saved))
}

/// theme.reset - back to the built-in defaults.
pub async fn reset(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Rpc<ThemeSettings>, AppError> {
    let defaults = ThemeSettings {
        updated_at: Some(Utc::now()),
        ..ThemeSettings::default()
    };
    let saved = state.store.save_theme(&defaults).await?;
    tracing::info!(target: "audit", admin = %admin.login, action = "theme.reset", "admin mutation");
    Ok(ok(saved))
}
