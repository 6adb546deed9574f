//! `POST /download`: turn one article URL into a zip archive response.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use qiitadl_core::{download_article, validate_article_url};
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, Result};
use crate::workspace::Workspace;

pub async fn download(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let request_id = Uuid::new_v4();
    let url = parse_request(&body, &state.config.allowed_domain).inspect_err(|e| {
        tracing::warn!(%request_id, error = %e, "rejected download request");
    })?;

    let limit = Duration::from_secs(state.config.request_timeout);
    let span = tracing::info_span!("download", %request_id, %url);

    match tokio::time::timeout(limit, run_download(state, url)).instrument(span).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(%request_id, timeout_secs = limit.as_secs(), "download timed out");
            Err(ApiError::DownloadFailed(format!("timed out after {}s", limit.as_secs())))
        }
    }
}

/// Pulls the article URL out of a request body and validates it.
///
/// Every malformed body maps to an [`ApiError`] with a `{"error": ...}` body.
pub fn parse_request(body: &[u8], domain: &str) -> Result<Url> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    let raw = value.get("url").ok_or(ApiError::MissingUrl)?;
    let raw = raw.as_str().map(str::trim).filter(|s| !s.is_empty()).ok_or(ApiError::InvalidUrl)?;

    validate_article_url(raw, domain).map_err(ApiError::from)
}

async fn run_download(state: Arc<AppState>, url: Url) -> Result<Response> {
    tracing::info!("download request accepted");

    let workspace = Workspace::create(state.config.work_dir.as_deref()).map_err(|e| {
        tracing::error!(error = %e, "failed to create workspace");
        ApiError::Workspace
    })?;

    let package = download_article(&state.fetcher, &url, workspace.path(), &state.pipeline)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "article download failed");
            ApiError::from(e)
        })?;

    let file = tokio::fs::File::open(&package.archive_path).await.map_err(|e| {
        tracing::error!(error = %e, "failed to open archive");
        ApiError::SendFailed(e.to_string())
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();
    let disposition = content_disposition(&package.archive_name())?;

    tracing::info!(archive = %package.archive_name(), bytes = ?length, "streaming archive");

    // The workspace lives as long as the body stream.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _ = &workspace;
        chunk
    });

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/zip")), (header::CONTENT_DISPOSITION, disposition)],
        Body::from_stream(stream),
    )
        .into_response();
    if let Some(length) = length {
        response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(response)
}

/// `attachment` disposition with a quoted name plus an RFC 5987 UTF-8 name.
pub fn content_disposition(file_name: &str) -> Result<HeaderValue> {
    let quoted: String = file_name.chars().filter(|c| *c != '"' && *c != '\\' && !c.is_control()).collect();
    let value = format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", quoted, encode_rfc5987(file_name));

    HeaderValue::from_bytes(value.as_bytes()).map_err(|e| ApiError::SendFailed(e.to_string()))
}

fn encode_rfc5987(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
