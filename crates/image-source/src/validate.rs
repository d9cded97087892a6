use crate::AcquireError;
use std::path::Path;
use url::Url;

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether a file name (or the last path segment of a URL) ends in `.png`,
/// `.jpg` or `.jpeg`, ignoring case.
pub fn is_supported_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Parse a user supplied URL. Only http(s) URLs whose path ends in a supported
/// image extension are accepted; the query string and fragment are not looked at.
pub fn validate_url(raw: &str) -> Result<Url, AcquireError> {
    let raw = raw.trim();
    let invalid = |reason: &str| AcquireError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }

    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    if !is_supported_extension(last_segment) {
        return Err(AcquireError::UnsupportedExtension(raw.to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_supported_extension() {
        assert!(is_supported_extension("cat.png"));
        assert!(is_supported_extension("cat.JPG"));
        assert!(is_supported_extension("holiday.photo.jpeg"));
        assert!(!is_supported_extension("cat.gif"));
        assert!(!is_supported_extension("cat"));
        assert!(!is_supported_extension(".png"));
        assert!(!is_supported_extension(""));
    }

    #[test]
    fn test_validate_url() {
        let url = validate_url(" https://example.com/images/cat.jpg ").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));

        assert!(validate_url("http://example.com/a/b/dog.PNG?size=large#top").is_ok());
    }

    #[test]
    fn test_validate_url_refuses() {
        assert!(matches!(
            validate_url("https://example.com/page.html"),
            Err(AcquireError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            validate_url("https://example.com/"),
            Err(AcquireError::UnsupportedExtension(_))
        ));
        // extension only in the query does not count
        assert!(matches!(
            validate_url("https://example.com/image?name=cat.png"),
            Err(AcquireError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com/cat.png"),
            Err(AcquireError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("file:///etc/cat.png"),
            Err(AcquireError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(AcquireError::InvalidUrl { .. })
        ));
        assert!(matches!(validate_url(""), Err(AcquireError::InvalidUrl { .. })));
    }
}
