//! HTTP request handlers.

use super::error::ApiError;
use super::AppState;
use crate::format::format_file_size;
use crate::history::ConversionStats;
use crate::pipeline::upload::{resolve_file_info, validate_upload, FileInfo, UploadHandle};
use axum::extract::{Multipart, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

const INDEX_HTML: &str = include_str!("index.html");

/// Response headers carrying the batch statistics next to the download.
pub const HEADER_FILES: &str = "x-drop2md-files";
pub const HEADER_CHARS: &str = "x-drop2md-chars";
pub const HEADER_WORDS: &str = "x-drop2md-words";
pub const HEADER_ELAPSED_MS: &str = "x-drop2md-elapsed-ms";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Limits the page needs before the user drops anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub supported_extensions: Vec<String>,
    pub max_file_size_bytes: u64,
    pub max_file_size_display: String,
    pub max_request_bytes: u64,
}

/// Display metadata for one dropped file, plus why it would be rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfoEntry {
    #[serde(flatten)]
    pub info: FileInfo,
    pub rejection: Option<String>,
}

/// Single-page drag-and-drop UI.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = state.orchestrator.config();
    Json(ConfigResponse {
        supported_extensions: config.supported_extensions.clone(),
        max_file_size_bytes: config.max_file_size_bytes,
        max_file_size_display: format_file_size(config.max_file_size_bytes),
        max_request_bytes: config.max_request_bytes,
    })
}

/// Describe dropped files without converting them.
pub async fn file_info(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Vec<FileInfoEntry>>, ApiError> {
    let uploads = read_uploads(multipart).await?;
    let config = state.orchestrator.config();
    let entries = uploads
        .iter()
        .map(|upload| FileInfoEntry {
            info: resolve_file_info(upload),
            rejection: validate_upload(upload, config).err().map(|e| e.to_string()),
        })
        .collect();
    Ok(Json(entries))
}

/// Convert every uploaded file and answer with the download.
///
/// One file → `<stem>.md` as `text/markdown`; several → one zip.
pub async fn convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploads = read_uploads(multipart).await?;
    info!("Conversion requested for {} file(s)", uploads.len());

    let output = {
        let _lane = state.lane.lock().await;
        state.orchestrator.run(&uploads).await?
    };

    let files = output.results.len();
    let chars = output.total_chars();
    let words = output.total_words();
    let elapsed_ms = output.total_elapsed.as_millis() as u64;
    let download = output.into_download()?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.content_type()),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(download.filename()))
            .map_err(|e| ApiError::internal(e.to_string()))?,
    );
    headers.insert(HeaderName::from_static(HEADER_FILES), HeaderValue::from(files));
    headers.insert(HeaderName::from_static(HEADER_CHARS), HeaderValue::from(chars));
    headers.insert(HeaderName::from_static(HEADER_WORDS), HeaderValue::from(words));
    headers.insert(
        HeaderName::from_static(HEADER_ELAPSED_MS),
        HeaderValue::from(elapsed_ms),
    );

    Ok((headers, download.into_bytes()).into_response())
}

pub async fn history_stats(State(state): State<AppState>) -> Json<ConversionStats> {
    let stats = match state.orchestrator.history() {
        Some(history) => history.stats().await,
        None => ConversionStats::from_records(&[]),
    };
    Json(stats)
}

/// Collect every file field of a multipart body. Non-file fields are ignored.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<UploadHandle>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        uploads.push(UploadHandle::new(name, bytes.to_vec()));
    }
    Ok(uploads)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_for_ascii_name() {
        assert_eq!(
            content_disposition("report.md"),
            "attachment; filename=\"report.md\"; filename*=UTF-8''report.md"
        );
    }

    #[test]
    fn disposition_for_unicode_name_is_header_safe() {
        let value = content_disposition("résumé \"v2\".md");
        assert!(value.contains("filename=\"r_sum_ _v2_.md\""), "got: {value}");
        assert!(value.contains("filename*=UTF-8''r%C3%A9sum%C3%A9%20%22v2%22.md"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
