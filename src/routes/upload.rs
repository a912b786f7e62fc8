use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

use crate::auth::SessionUser;
use crate::db::models::AppUser;
use crate::error::AppError;
use crate::state::AppState;

/// Ceiling on the base64 text, not the decoded bytes (about 7.5 MiB of image).
pub const MAX_BASE64_LEN: usize = 10 * 1024 * 1024;
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];
const KEY_PREFIX: &str = "portfolio/images";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_data: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

/// Sniffed type of raster images; `None` when no signature matches.
fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// Extension from the client's file name when it agrees with the content
/// type, otherwise the content type's canonical extension.
fn file_extension(file_name: &str, content_type: &str) -> String {
    let canonical = extension_for_mime(content_type);
    let requested = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let agrees = requested == canonical || (canonical == "jpg" && requested == "jpeg");
    if agrees {
        requested
    } else {
        canonical.to_string()
    }
}

fn object_key(extension: &str) -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 8)
        .to_ascii_lowercase();
    format!(
        "{KEY_PREFIX}/{}-{suffix}.{extension}",
        Utc::now().timestamp_millis()
    )
}

/// Accepts a bare base64 string or a `data:<mime>;base64,` URL.
fn decode_payload(data: &str) -> Result<Vec<u8>, AppError> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| AppError::validation("fileData is not valid base64"))
}

/// Owner means admin and, when `OWNER_GITHUB_ID` is configured, that exact account.
fn is_owner(user: &AppUser, owner_github_id: Option<&str>) -> bool {
    user.is_admin() && owner_github_id.is_none_or(|id| id == user.github_id)
}

/// POST /api/upload
pub async fn upload_image(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let user = user.ok_or(AppError::Unauthorized)?;
    if !is_owner(&user, state.config.owner_github_id.as_deref()) {
        tracing::warn!(github_id = %user.github_id, "upload denied for non-owner");
        return Err(AppError::Forbidden);
    }

    let Json(request) = body?;
    let (Some(file_data), Some(file_name), Some(content_type)) = (
        request.file_data.filter(|v| !v.is_empty()),
        request.file_name.filter(|v| !v.trim().is_empty()),
        request.content_type.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Missing fileData, fileName, or contentType",
        ));
    };

    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::validation(
            "Invalid file type. Allowed: JPEG, PNG, GIF, WebP, SVG",
        ));
    }
    if file_data.len() > MAX_BASE64_LEN {
        return Err(AppError::validation("File too large. Maximum 7.5MB."));
    }

    let bytes = decode_payload(&file_data)?;
    if bytes.is_empty() {
        return Err(AppError::validation("File is empty"));
    }
    if content_type != "image/svg+xml" && detect_image_type(&bytes) != Some(content_type.as_str())
    {
        return Err(AppError::validation(
            "File content does not match the declared type",
        ));
    }

    let key = object_key(&file_extension(&file_name, &content_type));
    let size = bytes.len();
    let stored = state.storage.put(&key, bytes, &content_type).await?;

    tracing::info!(key = %stored.key, size, content_type = %content_type, "image uploaded");

    Ok(Json(UploadResponse {
        url: stored.url,
        key: stored.key,
    }))
}
