//! Page and image fetching.
//!
//! This module provides the [`Fetcher`] used for both the article page and
//! its images, the [`AssetSource`] seam the extractor talks to, and
//! [`fetch_file`] for pages that were saved to disk.

use std::fs;
use std::future::Future;
use std::path::PathBuf;

use url::Url;

use crate::{QiitadlError, Result};

/// HTTP client configuration for fetching pages and images.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds, applied to every request separately.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Largest accepted image body in bytes.
    pub max_asset_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; qiitadl/0.1)".to_string(),
            max_asset_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Raw article page as fetched, before any parsing.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Final URL of the page after redirects.
    pub url: Url,
    /// Response body bytes.
    pub bytes: Vec<u8>,
    /// Charset declared in the `Content-Type` header, if any.
    pub charset: Option<String>,
}

impl SourceDocument {
    /// Decodes the body as HTML text.
    ///
    /// Qiita serves UTF-8; invalid sequences are replaced rather than
    /// rejected so a stray byte never fails the download.
    pub fn html(&self) -> String {
        if let Some(charset) = &self.charset
            && !charset.eq_ignore_ascii_case("utf-8")
            && !charset.eq_ignore_ascii_case("utf8")
        {
            tracing::debug!(%charset, url = %self.url, "non UTF-8 charset declared, decoding lossily");
        }
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// An image body and its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Something that can retrieve image bytes for a URL.
///
/// The extractor only depends on this trait, so image handling can run
/// against an in-memory source.
pub trait AssetSource {
    fn fetch_asset(&self, url: &Url) -> impl Future<Output = Result<FetchedAsset>> + Send;
}

#[cfg(feature = "fetch")]
pub use self::http::Fetcher;

#[cfg(feature = "fetch")]
mod http {
    use super::*;
    use futures_util::StreamExt;
    use reqwest::{Client, Response};
    use std::time::Duration;

    /// HTTP fetcher shared by the page request and every image request.
    ///
    /// Cloning is cheap; the underlying connection pool is shared.
    #[derive(Debug, Clone)]
    pub struct Fetcher {
        client: Client,
        config: FetchConfig,
    }

    impl Fetcher {
        /// Builds a fetcher with its own client.
        pub fn new(config: FetchConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout))
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(QiitadlError::HttpError)?;

            Ok(Self { client, config })
        }

        pub fn config(&self) -> &FetchConfig {
            &self.config
        }

        /// Fetches the article page.
        ///
        /// Any network error or non-success status is returned as an error;
        /// there is no partial page to salvage.
        pub async fn fetch_page(&self, url: &Url) -> Result<SourceDocument> {
            tracing::info!(%url, "fetching article");

            let response = self.get(url, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8").await?;
            let final_url = response.url().clone();
            let charset = content_type(&response).and_then(|ct| charset_of(&ct));
            let bytes = response.bytes().await.map_err(|e| self.map_err(e))?.to_vec();

            tracing::info!(url = %final_url, bytes = bytes.len(), "fetched article");
            Ok(SourceDocument { url: final_url, bytes, charset })
        }

        async fn get(&self, url: &Url, accept: &str) -> Result<Response> {
            let response = self
                .client
                .get(url.clone())
                .header("Accept", accept)
                .header("Accept-Language", "ja,en-US;q=0.9,en;q=0.8")
                .send()
                .await
                .map_err(|e| self.map_err(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(QiitadlError::HttpStatus { status: status.as_u16(), url: url.to_string() });
            }

            Ok(response)
        }

        fn map_err(&self, e: reqwest::Error) -> QiitadlError {
            if e.is_timeout() { QiitadlError::Timeout { timeout: self.config.timeout } } else { QiitadlError::HttpError(e) }
        }
    }

    impl AssetSource for Fetcher {
        /// Streams one image body, enforcing the size limit as chunks arrive.
        async fn fetch_asset(&self, url: &Url) -> Result<FetchedAsset> {
            let response = self.get(url, "image/*,*/*;q=0.8").await?;
            let content_type = content_type(&response);
            let limit = self.config.max_asset_bytes;

            let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0).min(limit as u64) as usize);
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| self.map_err(e))?;
                if bytes.len() + chunk.len() > limit {
                    return Err(QiitadlError::AssetTooLarge { url: url.to_string(), limit });
                }
                bytes.extend_from_slice(&chunk);
            }

            Ok(FetchedAsset { bytes, content_type })
        }
    }

    fn content_type(response: &Response) -> Option<String> {
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Extracts the `charset` parameter from a `Content-Type` value.
fn charset_of(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Reads a saved article page from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str, url: Url) -> Result<SourceDocument> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(QiitadlError::FileNotFound(path_buf))
    } else {
        let bytes = fs::read(&path_buf)?;
        Ok(SourceDocument { url, bytes, charset: None })
    }
}
