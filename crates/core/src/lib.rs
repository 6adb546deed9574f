pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formatters;
pub mod image;
pub mod package;
pub mod parse;
pub mod pipeline;
pub mod sanitize;

#[doc(hidden)]
pub use dom_tree::{DomNode, DomTree, NodeId};
pub use error::{ErrorKind, QiitadlError, Result};
pub use extract::{DownloadedAsset, ExtractConfig, ExtractedArticle, ImageRef};
pub use extract::{extract_from_html, image_file_name, localize_images, parse_article};
#[cfg(feature = "fetch")]
pub use extract::extract_article;
#[cfg(feature = "fetch")]
pub use fetch::Fetcher;
pub use fetch::{AssetSource, FetchConfig, FetchedAsset, SourceDocument, fetch_file};
pub use formatters::{MarkdownConfig, MarkdownFormatter, convert_to_markdown, normalize_markdown};
pub use image::resolve_extension;
pub use package::{ArticlePackage, ArticleTree, IMAGES_DIR, MARKDOWN_FILE};
pub use package::{build_package, compress_article_tree, write_article_tree};
pub use parse::Document;
#[cfg(feature = "fetch")]
pub use pipeline::{download_article, package_prepared, prepare_article};
pub use pipeline::{PipelineConfig, PreparedArticle, QIITA_DOMAIN, prepare_article_from_html, validate_article_url};
pub use sanitize::{FALLBACK_TITLE, sanitize_filename};
