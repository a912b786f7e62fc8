//! Signed session tokens carried in the `app_session_id` cookie.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{Config, MAX_SESSION_TTL_DAYS};

pub const SESSION_COOKIE: &str = "app_session_id";

/// JWT claims. `sub` is the GitHub account id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            secure_cookie,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let days = config.session_ttl_days.clamp(1, MAX_SESSION_TTL_DAYS);
        let ttl = Duration::try_days(days).unwrap_or_else(|| Duration::days(1));
        Self::new(&config.jwt_secret, ttl, config.is_production())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, github_id: &str, name: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: github_id.to_string(),
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Signature and expiry are both checked; any failure is `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| tracing::debug!(error = %e, "rejected session token"))
            .ok()
    }

    pub fn set_cookie(&self, token: &str) -> String {
        build_cookie(
            SESSION_COOKIE,
            token,
            "/",
            self.ttl.num_seconds(),
            self.secure_cookie,
        )
    }

    pub fn clear_cookie(&self) -> String {
        build_cookie(SESSION_COOKIE, "", "/", 0, self.secure_cookie)
    }

    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie
    }
}

pub fn build_cookie(name: &str, value: &str, path: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path={path}; Max-Age={max_age}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of the named cookie across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", Duration::days(365), false)
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue("42", "octocat").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.name, "octocat");
        assert_eq!(claims.exp - claims.iat, 365 * 24 * 60 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().issue("42", "octocat").unwrap();
        let other = SessionKeys::new("other-secret", Duration::days(1), false);
        assert!(other.verify(&token).is_none());
        assert!(keys().verify("not-a-jwt").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = SessionKeys::new("test-secret", Duration::days(-2), false);
        let token = keys.issue("42", "octocat").unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let config = Config {
            session_ttl_days: i64::MAX,
            ..Config::default()
        };
        let keys = SessionKeys::from_config(&config);
        assert_eq!(keys.ttl(), Duration::days(MAX_SESSION_TTL_DAYS));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = keys().set_cookie("abc");
        assert!(cookie.starts_with("app_session_id=abc; Path=/;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        let secure = SessionKeys::new("s", Duration::days(1), true).clear_cookie();
        assert!(secure.contains("Max-Age=0"));
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "theme=dark; app_session_id=tok".parse().unwrap());
        headers.append(header::COOKIE, "oauth_state=abc".parse().unwrap());
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("tok"));
        assert_eq!(read_cookie(&headers, "oauth_state").as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
