//! Filename sanitizing for article titles.

/// Name used when a title has nothing usable left after sanitizing.
pub const FALLBACK_TITLE: &str = "qiita_article";

/// Longest sanitized name in bytes; keeps `<name>.zip` under common
/// filesystem component limits.
const MAX_NAME_BYTES: usize = 200;

const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Safely truncate a string to at most `max_len` bytes at a character boundary
fn truncate_at_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }

    let safe_len = s.floor_char_boundary(max_len);
    &s[..safe_len]
}

/// Turns an arbitrary title into a single, portable path segment.
///
/// Removes `\ / * ? : " < > |` and control characters, trims surrounding
/// whitespace and caps the length. Returns [`FALLBACK_TITLE`] when nothing
/// usable remains.
///
/// # Example
///
/// ```rust
/// use qiitadl_core::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Rust: A/B <test>?"), "Rust AB test");
/// assert_eq!(sanitize_filename("???"), "qiita_article");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();

    let trimmed = truncate_at_char_boundary(cleaned.trim(), MAX_NAME_BYTES).trim_end();

    match trimmed {
        "" | "." | ".." => FALLBACK_TITLE.to_string(),
        name => name.to_string(),
    }
}
