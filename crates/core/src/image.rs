//! File extension inference for downloaded images.

use url::Url;

/// Extension used when neither the URL nor the content type is recognized.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Known image tokens and the extension each maps to.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("jpeg", ".jpg"),
    ("jpg", ".jpg"),
    ("png", ".png"),
    ("gif", ".gif"),
    ("webp", ".webp"),
    ("svg", ".svg"),
    ("bmp", ".bmp"),
];

/// Infers a file extension (with the leading dot) for an image.
///
/// The URL path suffix wins; the declared content type is consulted only
/// when the path has no known image extension. Falls back to `.jpg`.
///
/// # Example
///
/// ```rust
/// use qiitadl_core::resolve_extension;
/// use url::Url;
///
/// let url = Url::parse("https://cdn.example.com/a/b").unwrap();
/// assert_eq!(resolve_extension(&url, Some("image/png")), ".png");
/// ```
pub fn resolve_extension(url: &Url, content_type: Option<&str>) -> &'static str {
    from_path(url.path())
        .or_else(|| content_type.and_then(from_content_type))
        .unwrap_or(DEFAULT_EXTENSION)
}

fn from_path(path: &str) -> Option<&'static str> {
    let file_name = path.rsplit('/').next()?;
    let (_, suffix) = file_name.rsplit_once('.')?;
    let suffix = suffix.to_ascii_lowercase();

    KNOWN_TYPES
        .iter()
        .find(|(token, _)| *token == suffix)
        .map(|(_, ext)| *ext)
}

fn from_content_type(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.to_ascii_lowercase();

    KNOWN_TYPES
        .iter()
        .find(|(token, _)| content_type.contains(token))
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case("https://example.com/a.png", ".png")]
    #[case("https://example.com/a.PNG", ".png")]
    #[case("https://example.com/photo.jpeg", ".jpg")]
    #[case("https://example.com/photo.JPG", ".jpg")]
    #[case("https://example.com/anim.gif", ".gif")]
    #[case("https://example.com/pic.webp", ".webp")]
    #[case("https://example.com/logo.svg", ".svg")]
    #[case("https://example.com/old.bmp", ".bmp")]
    fn test_suffix_wins_over_content_type(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(resolve_extension(&url(input), Some("image/gif")), expected);
        assert_eq!(resolve_extension(&url(input), None), expected);
    }

    #[test]
    fn test_query_string_ignored() {
        let u = url("https://qiita-user-contents.imgix.net/https%3A%2F%2Fx/y.png?ixlib=rb-4.0.0&auto=format");
        assert_eq!(resolve_extension(&u, None), ".png");
    }

    #[rstest]
    #[case(Some("image/png"), ".png")]
    #[case(Some("image/svg+xml"), ".svg")]
    #[case(Some("image/webp; charset=binary"), ".webp")]
    #[case(Some("IMAGE/JPEG"), ".jpg")]
    #[case(Some("application/octet-stream"), ".jpg")]
    #[case(None, ".jpg")]
    fn test_content_type_fallback(#[case] content_type: Option<&str>, #[case] expected: &str) {
        let u = url("https://example.com/images/12345");
        assert_eq!(resolve_extension(&u, content_type), expected);
    }

    #[test]
    fn test_unknown_suffix_uses_content_type() {
        let u = url("https://example.com/file.php");
        assert_eq!(resolve_extension(&u, Some("image/gif")), ".gif");
    }
}
