// Utility functions

use url::Url;

/// Resolve an image URL against the page it was found on.
///
/// Absolute URLs pass through, relative and protocol-relative URLs are
/// joined against the base. Only http/https results are accepted: data
/// URIs and other schemes resolve to `None`, as does anything that fails
/// to parse.
pub fn resolve_image_url(image_url: &str, base_url: &str) -> Option<Url> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return None;
    }

    // Try parsing as absolute URL first
    if let Ok(absolute) = Url::parse(image_url) {
        return allowed(absolute);
    }

    // Resolve relative (or protocol-relative) URL against the base URL
    let base = Url::parse(base_url).ok()?;
    let resolved = base.join(image_url).ok()?;
    allowed(resolved)
}

fn allowed(url: Url) -> Option<Url> {
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute() {
        let result = resolve_image_url(
            "https://example.com/images/photo.jpg",
            "https://example.com/articles/cake",
        );
        assert_eq!(
            result.map(String::from),
            Some("https://example.com/images/photo.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_filename() {
        let result = resolve_image_url("Lemon Drop.jpeg", "https://example.com/articles/lemon");
        assert_eq!(
            result.map(String::from),
            Some("https://example.com/articles/Lemon%20Drop.jpeg".to_string())
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let result = resolve_image_url("../images/photo.jpg", "https://example.com/articles/cake");
        assert_eq!(
            result.map(String::from),
            Some("https://example.com/images/photo.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        let result = resolve_image_url("/images/photo.jpg", "https://example.com/articles/cake");
        assert_eq!(
            result.map(String::from),
            Some("https://example.com/images/photo.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let result = resolve_image_url("//cdn.example.com/photo.jpg", "https://example.com/a");
        assert_eq!(
            result.map(String::from),
            Some("https://cdn.example.com/photo.jpg".to_string())
        );
    }

    #[test]
    fn test_rejects_data_uri() {
        assert!(resolve_image_url("data:image/png;base64,iVBOR", "https://example.com/a").is_none());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(resolve_image_url("ftp://example.com/photo.jpg", "https://example.com/a").is_none());
        assert!(resolve_image_url("file:///etc/passwd", "https://example.com/a").is_none());
    }

    #[test]
    fn test_rejects_empty_and_unresolvable() {
        assert!(resolve_image_url("", "https://example.com/a").is_none());
        assert!(resolve_image_url("   ", "https://example.com/a").is_none());
        assert!(resolve_image_url("photo.jpg", "not a base url").is_none());
    }
}
