use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::theme::css::ThemeVariables;

/// GET /api/theme.css - the saved theme as CSS custom properties.
pub async fn stylesheet(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = state.store.get_theme().await?;
    let css = ThemeVariables::build(&settings).to_stylesheet();

    Ok((
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        css,
    ))
}
