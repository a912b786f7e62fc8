//! GitHub OAuth web flow.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::db::models::GithubProfile;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";
pub const SCOPE: &str = "read:user user:email";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("GitHub OAuth is not configured")]
    NotConfigured,

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub rejected the request: {0}")]
    Provider(String),
}

/// The identity provider behind the login endpoints.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError>;

    /// Trade the callback `code` for an access token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError>;

    async fn fetch_identity(&self, access_token: &str) -> Result<GithubProfile, OAuthError>;
}

pub struct GithubOAuth {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl GithubOAuth {
    pub fn new(
        http: reqwest::Client,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            client_id,
            client_secret,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), OAuthError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(OAuthError::NotConfigured),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Primary verified address, else any verified one, else the public profile email.
pub fn pick_email(emails: &[GithubEmail], profile_email: Option<String>) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .map(|e| e.email.clone())
        .or(profile_email)
}

#[async_trait]
impl OAuthProvider for GithubOAuth {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let client_id = self.client_id.as_deref().ok_or(OAuthError::NotConfigured)?;
        let mut url = Url::parse(AUTHORIZE_URL).map_err(|e| OAuthError::Provider(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", SCOPE)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let (client_id, client_secret) = self.credentials()?;

        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(OAuthError::Provider(format!(
                "{}: {}",
                response.error.unwrap_or_else(|| "no_token".to_string()),
                response.error_description.unwrap_or_default()
            ))),
        }
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<GithubProfile, OAuthError> {
        let user: GithubUser = self
            .http
            .get(USER_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Missing the email scope is not fatal; fall back to the profile email.
        let emails = match self
            .http
            .get(EMAILS_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response.json::<Vec<GithubEmail>>().await.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not list GitHub emails");
                Vec::new()
            }
        };

        Ok(GithubProfile {
            github_id: user.id.to_string(),
            email: pick_email(&emails, user.email),
            login: user.login,
            name: user.name,
            avatar_url: user.avatar_url,
        })
    }
}
