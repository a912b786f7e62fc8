//! Return-path sanitizing and the opaque OAuth `state` parameter.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use percent_encoding::percent_decode_str;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const STATE_COOKIE: &str = "oauth_state";
pub const STATE_COOKIE_PATH: &str = "/api/auth";
pub const STATE_TTL_SECS: i64 = 600;
const NONCE_LEN: usize = 32;

/// Only same-site, root-relative paths survive; everything else becomes `/`.
pub fn sanitize_return_path(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return "/".to_string();
    };

    let decoded = percent_decode_str(raw).decode_utf8_lossy().to_lowercase();
    let unsafe_path = !raw.starts_with('/')
        || raw.starts_with("//")
        || raw.contains('\\')
        || decoded.starts_with("//")
        || decoded.contains('\\')
        || decoded.contains("javascript:")
        || decoded.contains("data:")
        || raw.chars().any(char::is_control);

    if unsafe_path {
        tracing::warn!(return_path = raw, "rejected unsafe return path");
        "/".to_string()
    } else {
        raw.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub return_path: String,
    pub nonce: String,
}

impl OAuthState {
    pub fn new(return_path: Option<&str>) -> Self {
        Self {
            return_path: sanitize_return_path(return_path),
            nonce: Alphanumeric.sample_string(&mut rand::rng(), NONCE_LEN),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing two strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// `None` for anything that is not a state this server produced. The
    /// return path is sanitized again on the way back in.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw.trim()).ok()?;
        let state: OAuthState = serde_json::from_slice(&bytes).ok()?;
        if state.nonce.is_empty() {
            return None;
        }
        Some(Self {
            return_path: sanitize_return_path(Some(&state.return_path)),
            nonce: state.nonce,
        })
    }

    /// Cookie value binding the browser to this state.
    pub fn nonce_digest(&self) -> String {
        format!("{:x}", Sha256::digest(self.nonce.as_bytes()))
    }

    pub fn matches_cookie(&self, cookie: Option<&str>) -> bool {
        cookie.is_some_and(|value| value == self.nonce_digest())
    }
}
