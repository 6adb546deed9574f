//! Article extraction and image localization.
//!
//! Extraction runs in two steps. [`parse_article`] finds the title and the
//! body container in the page; [`localize_images`] then downloads every
//! image in the body and points it at a local file. A failed image never
//! fails the article: it keeps its remote URL and the rest carry on.

use futures_util::StreamExt;
use futures_util::stream;
use url::Url;

use crate::dom_tree::{DomTree, NodeId};
use crate::fetch::AssetSource;
use crate::image::resolve_extension;
use crate::package::IMAGES_DIR;
use crate::parse::Document;
use crate::sanitize::FALLBACK_TITLE;
use crate::Result;

#[cfg(feature = "fetch")]
use crate::fetch::Fetcher;

/// Where the article lives in a Qiita page, and how images are fetched.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Selector for the platform's canonical title element.
    pub title_selector: String,
    /// Selector used when the canonical title is missing.
    pub fallback_title_selector: String,
    /// Selector for the article body container.
    pub content_selector: String,
    /// Title used when the page has no usable heading.
    pub fallback_title: String,
    /// Images fetched at once. Results are applied in document order.
    pub asset_concurrency: usize,
    /// Drop the empty permalink anchors Qiita puts in every heading.
    pub strip_heading_anchors: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title_selector: r#"h1[data-logly-title="true"]"#.to_string(),
            fallback_title_selector: "h1".to_string(),
            content_selector: "section.it-MdContent".to_string(),
            fallback_title: FALLBACK_TITLE.to_string(),
            asset_concurrency: 4,
            strip_heading_anchors: true,
        }
    }
}

/// An image reference that now points at a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub original_url: String,
    /// Path relative to the Markdown file, e.g. `images/image_001.png`.
    pub local_path: String,
}

/// A successfully fetched image, ready to be written to disk.
#[derive(Debug, Clone)]
pub struct DownloadedAsset {
    pub source_url: String,
    /// File name inside the images directory, e.g. `image_001.png`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Title and body of an article, with images rewritten to local paths.
#[derive(Debug, Clone)]
pub struct ExtractedArticle {
    /// Title as found in the page, not yet sanitized.
    pub title: String,
    /// The body container.
    pub content: DomTree,
    /// Rewritten references, in document order.
    pub image_refs: Vec<ImageRef>,
    /// Fetched images, in document order.
    pub assets: Vec<DownloadedAsset>,
    /// Absolute URLs of images that could not be fetched.
    pub unresolved: Vec<String>,
}

/// Finds the title and body of an article page.
///
/// # Errors
///
/// Returns [`crate::QiitadlError::ContentNotFound`] when the body container
/// is missing. A missing title is never an error.
pub fn parse_article(html: &str, config: &ExtractConfig) -> Result<ExtractedArticle> {
    let doc = Document::parse(html);

    let title = match doc.article_title(config)? {
        Some(title) => {
            tracing::info!(%title, "found article title");
            title
        }
        None => {
            tracing::warn!("could not find article title, using a default name");
            config.fallback_title.clone()
        }
    };

    let mut content = doc.content_region(config)?;
    if config.strip_heading_anchors {
        strip_heading_anchors(&mut content);
    }

    Ok(ExtractedArticle { title, content, image_refs: Vec::new(), assets: Vec::new(), unresolved: Vec::new() })
}

/// Removes text-less `<a href="#...">` links sitting directly in headings.
fn strip_heading_anchors(tree: &mut DomTree) {
    let headings = ["h1", "h2", "h3", "h4", "h5", "h6"];
    let anchors: Vec<NodeId> = tree
        .elements_by_tag("a")
        .into_iter()
        .filter(|&a| tree.parent(a).and_then(|p| tree.tag_name(p)).is_some_and(|t| headings.contains(&t)))
        .filter(|&a| tree.attr(a, "href").is_some_and(|href| href.starts_with('#')))
        .filter(|&a| tree.text(a).trim().is_empty() && tree.elements_by_tag_within(a, "img").is_empty())
        .collect();

    for a in anchors {
        tree.remove_node(a);
    }
}

/// Local file name for the `number`-th image.
pub fn image_file_name(number: usize, extension: &str) -> String {
    format!("image_{:03}{}", number, extension)
}

/// Downloads every image in the article body and rewrites it to a local path.
///
/// Images are numbered by their position among `<img>` elements with a
/// fetchable `src`, so a failed image still uses up its number and the
/// names of the others never depend on which fetches failed. Fetches run up
/// to `concurrency` at a time but are applied in document order.
pub async fn localize_images<S>(article: &mut ExtractedArticle, base_url: &Url, source: &S, concurrency: usize)
where
    S: AssetSource + Sync,
{
    let tree = &mut article.content;
    let mut jobs = Vec::new();

    for id in tree.elements_by_tag("img") {
        let Some(src) = tree.attr(id, "src").map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };

        let url = match base_url.join(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                tracing::debug!(%url, "skipping image with unsupported scheme");
                continue;
            }
            Err(e) => {
                tracing::debug!(src, error = %e, "skipping image with unresolvable source");
                continue;
            }
        };

        jobs.push((id, jobs.len() + 1, url));
    }

    tracing::info!(count = jobs.len(), "downloading images");

    let results: Vec<_> = stream::iter(jobs.into_iter().map(|(id, number, url)| async move {
        let result = source.fetch_asset(&url).await;
        (id, number, url, result)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    for (id, number, url, result) in results {
        match result {
            Ok(asset) => {
                let file_name = image_file_name(number, resolve_extension(&url, asset.content_type.as_deref()));
                let local_path = format!("{}/{}", IMAGES_DIR, file_name);

                tree.set_attr(id, "src", &local_path);
                if let Some(parent) = tree.parent(id)
                    && tree.tag_name(parent) == Some("a")
                {
                    tree.unwrap_node(parent);
                }

                tracing::debug!(%url, %file_name, bytes = asset.bytes.len(), "downloaded image");
                article.image_refs.push(ImageRef { original_url: url.to_string(), local_path });
                article.assets.push(DownloadedAsset { source_url: url.to_string(), file_name, bytes: asset.bytes });
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "failed to download image, keeping remote URL");
                article.unresolved.push(url.to_string());
            }
        }
    }

    tracing::info!(
        downloaded = article.assets.len(),
        failed = article.unresolved.len(),
        "finished downloading images"
    );
}

/// Parses an already fetched page and localizes its images.
pub async fn extract_from_html<S>(html: &str, base_url: &Url, source: &S, config: &ExtractConfig) -> Result<ExtractedArticle>
where
    S: AssetSource + Sync,
{
    let mut article = parse_article(html, config)?;
    localize_images(&mut article, base_url, source, config.asset_concurrency).await;
    Ok(article)
}

/// Fetches an article page and extracts it, downloading its images.
///
/// # Errors
///
/// Fails when the page cannot be fetched or has no body container. Image
/// failures are recorded in [`ExtractedArticle::unresolved`] instead.
#[cfg(feature = "fetch")]
pub async fn extract_article(fetcher: &Fetcher, url: &Url, config: &ExtractConfig) -> Result<ExtractedArticle> {
    let source = fetcher.fetch_page(url).await?;
    let html = source.html();
    extract_from_html(&html, &source.url, fetcher, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QiitadlError;
    use crate::fetch::FetchedAsset;
    use std::collections::HashMap;

    /// Serves fixed bodies; any other URL fails like an unreachable host.
    struct StubSource {
        assets: HashMap<String, FetchedAsset>,
    }

    impl StubSource {
        fn new(entries: &[(&str, Option<&str>, &[u8])]) -> Self {
            let assets = entries
                .iter()
                .map(|(url, ct, bytes)| {
                    (url.to_string(), FetchedAsset { bytes: bytes.to_vec(), content_type: ct.map(str::to_string) })
                })
                .collect();
            Self { assets }
        }
    }

    impl AssetSource for StubSource {
        fn fetch_asset(&self, url: &Url) -> impl Future<Output = Result<FetchedAsset>> + Send {
            let result = self
                .assets
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| QiitadlError::HttpStatus { status: 404, url: url.to_string() });
            async move { result }
        }
    }

    fn base() -> Url {
        Url::parse("https://qiita.com/alice/items/abc123").unwrap()
    }

    fn page(body: &str) -> String {
        format!(
            r#"<html><body><h1 data-logly-title="true">Title</h1><section class="it-MdContent">{}</section></body></html>"#,
            body
        )
    }

    fn img_srcs(article: &ExtractedArticle) -> Vec<String> {
        let tree = &article.content;
        tree.elements_by_tag("img")
            .into_iter()
            .filter_map(|id| tree.attr(id, "src").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_parse_article_missing_content() {
        let result = parse_article("<html><body><h1>T</h1></body></html>", &ExtractConfig::default());
        assert!(matches!(result, Err(QiitadlError::ContentNotFound)));
    }

    #[test]
    fn test_parse_article_fallback_title() {
        let article = parse_article(
            r#"<section class="it-MdContent"><p>x</p></section>"#,
            &ExtractConfig::default(),
        )
        .unwrap();
        assert_eq!(article.title, FALLBACK_TITLE);
    }

    #[test]
    fn test_strip_heading_anchors() {
        let html = page(
            r##"<h2><span id="intro" class="fragment"></span><a href="#intro"><i class="fa fa-link"></i></a>Intro</h2><p><a href="#intro"></a>kept</p><h3><a href="#x">Linked heading</a></h3>"##,
        );
        let article = parse_article(&html, &ExtractConfig::default()).unwrap();
        let out = article.content.to_html();

        assert!(!out.contains("fa-link"));
        assert!(out.contains("Intro</h2>"));
        assert!(out.contains(r##"<p><a href="#intro"></a>kept</p>"##));
        assert!(out.contains(r##"<a href="#x">Linked heading</a>"##));
    }

    #[tokio::test]
    async fn test_all_images_localized() {
        let html = page(
            r#"<p><img src="/img/a.png" alt="a"></p><p><img src="https://cdn.example.com/b" alt="b"></p>"#,
        );
        let source = StubSource::new(&[
            ("https://qiita.com/img/a.png", None, b"A"),
            ("https://cdn.example.com/b", Some("image/gif"), b"B"),
        ]);

        let article = extract_from_html(&html, &base(), &source, &ExtractConfig::default()).await.unwrap();

        assert_eq!(img_srcs(&article), vec!["images/image_001.png", "images/image_002.gif"]);
        assert_eq!(article.assets.len(), 2);
        assert_eq!(article.assets[0].file_name, "image_001.png");
        assert_eq!(article.assets[0].bytes, b"A");
        assert_eq!(article.assets[1].source_url, "https://cdn.example.com/b");
        assert!(article.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_failed_image_keeps_url_and_number() {
        let html = page(
            r#"<img src="https://x.test/1.png"><img src="https://x.test/2.png"><img src="https://x.test/3.png"><img src="https://x.test/4.png">"#,
        );
        let source = StubSource::new(&[
            ("https://x.test/1.png", None, b"1"),
            ("https://x.test/3.png", None, b"3"),
            ("https://x.test/4.png", None, b"4"),
        ]);

        let mut article = parse_article(&html, &ExtractConfig::default()).unwrap();
        localize_images(&mut article, &base(), &source, 2).await;

        assert_eq!(
            img_srcs(&article),
            vec![
                "images/image_001.png",
                "https://x.test/2.png",
                "images/image_003.png",
                "images/image_004.png"
            ]
        );
        assert_eq!(article.image_refs.len(), 3);
        assert_eq!(article.unresolved, vec!["https://x.test/2.png"]);
    }

    #[tokio::test]
    async fn test_images_without_src_are_skipped() {
        let html = page(r#"<img alt="no src"><img src=""><img src="data:image/png;base64,AAAA"><img src="/ok.png">"#);
        let source = StubSource::new(&[("https://qiita.com/ok.png", None, b"ok")]);

        let article = extract_from_html(&html, &base(), &source, &ExtractConfig::default()).await.unwrap();

        assert_eq!(article.assets.len(), 1);
        assert_eq!(article.assets[0].file_name, "image_001.png");
        assert!(article.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_linked_image_unwrapped() {
        let html = page(r#"<p><a href="https://x.test/full.png"><img src="https://x.test/full.png"></a></p>"#);
        let source = StubSource::new(&[("https://x.test/full.png", None, b"img")]);

        let article = extract_from_html(&html, &base(), &source, &ExtractConfig::default()).await.unwrap();
        let out = article.content.to_html();

        assert!(out.contains(r#"<p><img src="images/image_001.png"></p>"#));
        assert!(!out.contains("<a "));
    }

    #[tokio::test]
    async fn test_failed_linked_image_stays_linked() {
        let html = page(r#"<p><a href="https://x.test/gone.png"><img src="https://x.test/gone.png"></a></p>"#);
        let source = StubSource::new(&[]);

        let article = extract_from_html(&html, &base(), &source, &ExtractConfig::default()).await.unwrap();

        assert!(article.content.to_html().contains(r#"<a href="https://x.test/gone.png">"#));
    }

    /// Answers after a per-URL delay and records the order fetches finish in.
    struct SlowSource {
        inner: StubSource,
        delays: HashMap<String, u64>,
        finished: std::sync::Mutex<Vec<String>>,
    }

    impl AssetSource for SlowSource {
        fn fetch_asset(&self, url: &Url) -> impl Future<Output = Result<FetchedAsset>> + Send {
            let delay = self.delays.get(url.as_str()).copied().unwrap_or(0);
            let result = self.inner.fetch_asset(url);
            let url = url.to_string();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                let result = result.await;
                self.finished.lock().unwrap().push(url);
                result
            }
        }
    }

    #[tokio::test]
    async fn test_names_follow_document_order_not_completion_order() {
        let html = page(r#"<img src="https://x.test/slow.png"><img src="https://x.test/fast.gif">"#);
        let source = SlowSource {
            inner: StubSource::new(&[
                ("https://x.test/slow.png", None, b"slow"),
                ("https://x.test/fast.gif", None, b"fast"),
            ]),
            delays: HashMap::from([("https://x.test/slow.png".to_string(), 200)]),
            finished: std::sync::Mutex::new(Vec::new()),
        };

        let mut article = parse_article(&html, &ExtractConfig::default()).unwrap();
        localize_images(&mut article, &base(), &source, 4).await;

        assert_eq!(
            *source.finished.lock().unwrap(),
            vec!["https://x.test/fast.gif", "https://x.test/slow.png"]
        );
        assert_eq!(img_srcs(&article), vec!["images/image_001.png", "images/image_002.gif"]);
        assert_eq!(article.assets[0].bytes, b"slow");
        assert_eq!(article.assets[1].file_name, "image_002.gif");
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_timed_out_image_fails_alone() {
        use crate::fetch::FetchConfig;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        for fast in ["/a.png", "/b.png"] {
            Mock::given(method("GET"))
                .and(path(fast))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
                .mount(&server)
                .await;
        }

        let html = page(
            r#"<img src="/slow.png"><img src="/a.png"><p><a href="/b.png"><img src="/b.png"></a></p>"#,
        );
        let base = Url::parse(&format!("{}/alice/items/abc123", server.uri())).unwrap();
        let fetcher = Fetcher::new(FetchConfig { timeout: 1, ..Default::default() }).unwrap();

        let mut article = parse_article(&html, &ExtractConfig::default()).unwrap();
        localize_images(&mut article, &base, &fetcher, 4).await;

        assert_eq!(img_srcs(&article), vec!["/slow.png", "images/image_002.png", "images/image_003.png"]);
        assert_eq!(article.unresolved, vec![format!("{}/slow.png", server.uri())]);
        assert_eq!(article.assets.len(), 2);
        assert_eq!(article.assets[1].bytes, b"ok");
    }

    #[test]
    fn test_image_file_name_padding() {
        assert_eq!(image_file_name(1, ".png"), "image_001.png");
        assert_eq!(image_file_name(42, ".jpg"), "image_042.jpg");
        assert_eq!(image_file_name(1234, ".gif"), "image_1234.gif");
    }
}
