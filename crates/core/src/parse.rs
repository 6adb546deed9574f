//! HTML parsing and article lookup.
//!
//! This module provides the [`Document`] type, which wraps a parsed page and
//! knows where Qiita keeps an article's title and body.
//!
//! # Example
//!
//! ```rust
//! use qiitadl_core::{Document, ExtractConfig};
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1 data-logly-title="true">Title</h1>
//!             <section class="it-MdContent"><p>Body</p></section>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let config = ExtractConfig::default();
//! assert_eq!(doc.article_title(&config).unwrap(), Some("Title".to_string()));
//! assert!(doc.content_region(&config).is_ok());
//! ```

use scraper::{Html, Selector};

use crate::dom_tree::DomTree;
use crate::extract::ExtractConfig;
use crate::{QiitadlError, Result};

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// Parsing is lenient: malformed markup is repaired the way browsers do,
    /// so this never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Gets the raw HTML representation.
    ///
    /// Returns a reference to the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Text of the first element matching `selector`, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`QiitadlError::HtmlParseError`] if the selector is invalid.
    pub fn first_text(&self, selector: &str) -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(self
            .html
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }

    /// Resolves the article title.
    ///
    /// Tries the platform's canonical title element first, then the first
    /// `h1` anywhere in the page. Returns `Ok(None)` when neither exists so
    /// the caller can fall back to a placeholder.
    pub fn article_title(&self, config: &ExtractConfig) -> Result<Option<String>> {
        if let Some(title) = self.first_text(&config.title_selector)? {
            return Ok(Some(title));
        }
        self.first_text(&config.fallback_title_selector)
    }

    /// Copies the article body container into a mutable [`DomTree`].
    ///
    /// # Errors
    ///
    /// Returns [`QiitadlError::ContentNotFound`] when the page has no body
    /// container; there is nothing to download in that case.
    pub fn content_region(&self, config: &ExtractConfig) -> Result<DomTree> {
        let sel = parse_selector(&config.content_selector)?;
        self.html
            .select(&sel)
            .next()
            .map(DomTree::from_element)
            .ok_or(QiitadlError::ContentNotFound)
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| QiitadlError::HtmlParseError(format!("Invalid selector: {}", e)))
}
