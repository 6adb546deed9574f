//! End-to-end driver: fetch, extract, convert, package.
//!
//! Both front-ends go through here so a URL is turned into the same archive
//! whether it arrives over HTTP or on the command line.

#[cfg(feature = "fetch")]
use std::path::Path;

use url::Url;

use crate::extract::{DownloadedAsset, ExtractConfig, ExtractedArticle, extract_from_html};
use crate::fetch::AssetSource;
use crate::formatters::{MarkdownConfig, convert_to_markdown};
use crate::sanitize::sanitize_filename;
use crate::{QiitadlError, Result};

#[cfg(feature = "fetch")]
use crate::extract::extract_article;
#[cfg(feature = "fetch")]
use crate::fetch::Fetcher;
#[cfg(feature = "fetch")]
use crate::package::{ArticlePackage, build_package};

/// Host articles are accepted from unless configured otherwise.
pub const QIITA_DOMAIN: &str = "qiita.com";

/// Extraction and conversion settings for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub markdown: MarkdownConfig,
}

/// A converted article that has not touched the filesystem yet.
#[derive(Debug, Clone)]
pub struct PreparedArticle {
    /// Sanitized title, usable as a directory name.
    pub title: String,
    pub markdown: String,
    pub assets: Vec<DownloadedAsset>,
    /// Image URLs that could not be fetched and stay remote.
    pub unresolved: Vec<String>,
}

/// Parses `raw` and checks it points at `domain` or one of its subdomains.
///
/// # Errors
///
/// [`QiitadlError::InvalidUrl`] for empty, unparsable, host-less or non-HTTP
/// input; [`QiitadlError::UnsupportedDomain`] for any other host.
pub fn validate_article_url(raw: &str, domain: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QiitadlError::InvalidUrl("URL is empty".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| QiitadlError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(QiitadlError::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
    }

    let host = url
        .host_str()
        .ok_or_else(|| QiitadlError::InvalidUrl(format!("missing host: {}", trimmed)))?
        .to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();

    if host == domain || host.strip_suffix(&domain).is_some_and(|rest| rest.ends_with('.')) {
        Ok(url)
    } else {
        Err(QiitadlError::UnsupportedDomain { url: trimmed.to_string(), domain })
    }
}

/// Extracts and converts an already fetched page.
///
/// `base_url` resolves relative image sources; `source` fetches the images.
pub async fn prepare_article_from_html<S>(
    html: &str, base_url: &Url, source: &S, config: &PipelineConfig,
) -> Result<PreparedArticle>
where
    S: AssetSource + Sync,
{
    let article = extract_from_html(html, base_url, source, &config.extract).await?;
    convert_article(article, config)
}

/// Fetches an article and converts it, downloading its images.
#[cfg(feature = "fetch")]
pub async fn prepare_article(fetcher: &Fetcher, url: &Url, config: &PipelineConfig) -> Result<PreparedArticle> {
    let article = extract_article(fetcher, url, &config.extract).await?;
    convert_article(article, config)
}

fn convert_article(article: ExtractedArticle, config: &PipelineConfig) -> Result<PreparedArticle> {
    let markdown = convert_to_markdown(&article.content.to_html(), &config.markdown)?;

    tracing::info!(title = %article.title, chars = markdown.len(), "converted article to Markdown");
    Ok(PreparedArticle {
        title: sanitize_filename(&article.title),
        markdown,
        assets: article.assets,
        unresolved: article.unresolved,
    })
}

/// Downloads an article into `work_root` and packages it as a zip archive.
///
/// File writes and compression run on the blocking thread pool.
#[cfg(feature = "fetch")]
pub async fn download_article(
    fetcher: &Fetcher, url: &Url, work_root: &Path, config: &PipelineConfig,
) -> Result<ArticlePackage> {
    let prepared = prepare_article(fetcher, url, config).await?;
    package_prepared(work_root, prepared).await
}

/// Packages a prepared article on the blocking thread pool.
#[cfg(feature = "fetch")]
pub async fn package_prepared(work_root: &Path, prepared: PreparedArticle) -> Result<ArticlePackage> {
    let work_root = work_root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        build_package(&work_root, &prepared.title, &prepared.markdown, &prepared.assets)
    })
    .await
    .map_err(|e| QiitadlError::TaskFailed(e.to_string()))?
}
