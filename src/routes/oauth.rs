/**
 * OAuth Routes
 * GitHub login: redirect to the provider, then handle its callback
 */
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::auth::{
    bootstrap,
    redirect::{OAuthState, STATE_COOKIE, STATE_COOKIE_PATH, STATE_TTL_SECS},
    session::{build_cookie, read_cookie},
    OAuthError,
};
use crate::error::AppError;
use crate::state::AppState;

pub const CALLBACK_PATH: &str = "/api/auth/github/callback";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub return_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `PUBLIC_URL` when configured, else rebuilt from the (possibly proxied)
/// request host.
fn callback_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = public_url {
        return format!("{}{CALLBACK_PATH}", base.trim_end_matches('/'));
    }
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let proto = header_str("x-forwarded-proto").unwrap_or("http");
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or("localhost");
    format!("{proto}://{host}{CALLBACK_PATH}")
}

fn redirect(location: &str, cookies: &[String]) -> Response {
    let mut response = (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response();
    for cookie in cookies {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

fn oauth_failure(e: OAuthError) -> AppError {
    AppError::OAuth(e.to_string())
}

/// GET /api/auth/github
pub async fn github_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let oauth_state = OAuthState::new(query.return_path.as_deref());
    let redirect_uri = callback_url(state.config.public_url.as_deref(), &headers);
    let authorize_url = state
        .oauth
        .authorize_url(&oauth_state.encode(), &redirect_uri)
        .map_err(oauth_failure)?;

    let state_cookie = build_cookie(
        STATE_COOKIE,
        &oauth_state.nonce_digest(),
        STATE_COOKIE_PATH,
        STATE_TTL_SECS,
        state.sessions.secure_cookie(),
    );

    tracing::debug!(return_path = %oauth_state.return_path, "redirecting to GitHub");
    Ok(redirect(&authorize_url, &[state_cookie]))
}

/// GET /api/auth/github/callback
pub async fn github_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        if let Some(error) = query.error {
            tracing::warn!(error = %error, "GitHub returned an authorization error");
        }
        return Err(AppError::validation("Authorization code is required"));
    };

    let oauth_state = query
        .state
        .as_deref()
        .and_then(OAuthState::decode)
        .ok_or_else(|| AppError::validation("Invalid OAuth state"))?;
    if !oauth_state.matches_cookie(read_cookie(&headers, STATE_COOKIE).as_deref()) {
        tracing::warn!("OAuth state does not match the browser's state cookie");
        return Err(AppError::validation("Invalid OAuth state"));
    }

    let redirect_uri = callback_url(state.config.public_url.as_deref(), &headers);
    let access_token = state
        .oauth
        .exchange_code(&code, &redirect_uri)
        .await
        .map_err(oauth_failure)?;
    let identity = state
        .oauth
        .fetch_identity(&access_token)
        .await
        .map_err(oauth_failure)?;

    let user = state.store.upsert_github_user(&identity).await?;
    let user = bootstrap::ensure_owner_admin(
        state.store.as_ref(),
        user,
        state.config.github_owner_username.as_deref(),
    )
    .await?;

    let display_name = user.name.clone().unwrap_or_else(|| user.login.clone());
    let token = state
        .sessions
        .issue(&user.github_id, &display_name)
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(
        github_id = %user.github_id,
        login = %user.login,
        role = user.role.as_str(),
        "user signed in"
    );

    let clear_state = build_cookie(
        STATE_COOKIE,
        "",
        STATE_COOKIE_PATH,
        0,
        state.sessions.secure_cookie(),
    );
    Ok(redirect(
        &oauth_state.return_path,
        &[state.sessions.set_cookie(&token), clear_state],
    ))
}

/// GET /api/oauth/callback - retired callback path, kept so old links land home.
pub async fn legacy_callback() -> Response {
    redirect("/", &[])
}
