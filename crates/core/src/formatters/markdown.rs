use std::sync::LazyLock;

use regex::Regex;

use crate::Result;
#[cfg(feature = "markdown")]
use crate::QiitadlError;

/// `#`-run glued to the heading text.
static HEADING_NO_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})([^\s#])").expect("valid heading regex"));

/// `#`-run followed by more than one space or by tabs.
static HEADING_WIDE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+").expect("valid heading regex"));

/// Configuration for Markdown conversion
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Apply the heading and emphasis clean-up rules after conversion
    pub normalize: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// Convert the article body HTML to Markdown with ATX headings.
pub fn convert_to_markdown(html: &str, config: &MarkdownConfig) -> Result<String> {
    let markdown = html_to_markdown(html)?;

    if config.normalize { Ok(normalize_markdown(&markdown)) } else { Ok(markdown) }
}

/// Convert HTML to Markdown using htmd crate
#[cfg(feature = "markdown")]
fn html_to_markdown(html: &str) -> Result<String> {
    use htmd::HtmlToMarkdown;
    use htmd::options::{CodeBlockStyle, HeadingStyle, Options};

    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build();

    converter
        .convert(html)
        .map_err(|e| QiitadlError::MarkdownError(e.to_string()))
}

/// Fallback HTML to text conversion when markdown feature is disabled
#[cfg(not(feature = "markdown"))]
fn html_to_markdown(html: &str) -> Result<String> {
    let doc = scraper::Html::parse_document(html);
    Ok(doc.root_element().text().collect::<String>())
}

/// Fixes the output of a naive HTML to Markdown conversion.
///
/// Rules, applied in this order to every line outside fenced code blocks:
///
/// 1. one space between a leading `#`-run (1 to 6) and the heading text;
/// 2. whitespace after a leading `#`-run collapsed to one space;
/// 3. `\*\*` turned back into `**`;
/// 4. a lone `\*` (no asterisk on either side) turned back into `*`;
/// 5. any remaining `\*` turned back into `*`, leaving escaped
///    backslashes (`\\`) alone;
/// 6. one space after a closing `**` that is glued to the next character;
/// 7. the same for a closing single `*`.
///
/// Applying the rules twice gives the same text as applying them once.
pub fn normalize_markdown(markdown: &str) -> String {
    let mut fence: Option<&str> = None;
    let mut lines = Vec::new();

    for line in markdown.split('\n') {
        let trimmed = line.trim_start();
        let marker = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m));

        match (fence, marker) {
            (None, Some(m)) => {
                fence = Some(m);
                lines.push(line.to_string());
            }
            (Some(open), Some(m)) if open == m => {
                fence = None;
                lines.push(line.to_string());
            }
            (Some(_), _) => lines.push(line.to_string()),
            (None, None) => lines.push(normalize_line(line)),
        }
    }

    lines.join("\n")
}

fn normalize_line(line: &str) -> String {
    let line = HEADING_NO_SPACE.replace(line, "${1} ${2}");
    let line = HEADING_WIDE_SPACE.replace(&line, "${1} ");
    let line = unescape_asterisks(&line);
    let line = space_after_closing(&line, 2);
    space_after_closing(&line, 1)
}

/// Turns escaped asterisks back into asterisks: `\*\*` pairs first, then
/// lone `\*`, then any that remain.
///
/// An escaped backslash (`\\`) is copied as is and never starts an escape,
/// so `\\\*` becomes `\\*` and stays that way on a second pass.
fn unescape_asterisks(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        match (chars[i], chars.get(i + 1).copied()) {
            ('\\', Some('\\')) => {
                out.push_str(r"\\");
                i += 2;
            }
            ('\\', Some('*')) => {
                out.push('*');
                i += 2;
            }
            (c, _) => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Inserts a space after closing emphasis markers of exactly `run_len`
/// asterisks that are glued to the following character.
///
/// Markers pair up left to right: a run followed by a non-space character
/// opens, the next run preceded by a non-space character closes. Runs of
/// any other length are left alone.
fn space_after_closing(line: &str, run_len: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 4);
    let mut open = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '*' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == '*' {
            i += 1;
        }
        out.extend(&chars[start..i]);

        if i - start != run_len {
            continue;
        }

        let before = start.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i).copied();
        let glued_after = after.is_some_and(|c| !c.is_whitespace());

        if open {
            if before.is_some_and(|c| !c.is_whitespace()) {
                open = false;
                if glued_after {
                    out.push(' ');
                }
            }
        } else if glued_after {
            open = true;
        }
    }

    out
}

/// Markdown formatter with configurable options
pub struct MarkdownFormatter {
    config: MarkdownConfig,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn convert(&self, html: &str) -> Result<String> {
        convert_to_markdown(html, &self.config)
    }
}
