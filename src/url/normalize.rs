use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
];

/// File extensions that never point at crawlable documents
///
/// Links ending in one of these are rejected during scope admission so the
/// fetch budget is spent on pages, not assets.
pub const SKIP_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "bmp", // archives
    "zip", "tar", "gz", "bz2", "rar", "7z", // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", // media
    "mp3", "mp4", "avi", "mov", "webm", "wav", // assets
    "css", "js", "woff", "woff2", "ttf", "eot",
];

/// Normalizes a URL, optionally resolving it against a base page
///
/// Steps:
/// 1. Resolve relative references against `base` (absolute input needs none)
/// 2. Reject anything that is not http(s)
/// 3. Lowercase the host
/// 4. Collapse duplicate path slashes and drop the trailing slash (root `/`
///    is kept, and an empty path becomes `/`)
/// 5. Drop the fragment
/// 6. Remove tracking query parameters and sort the rest
///
/// The result is deterministic and idempotent: normalizing an already
/// normalized URL returns it unchanged. Malformed input fails closed with a
/// [`UrlError`]; nothing in this module panics on untrusted input.
///
/// # Examples
///
/// ```
/// use deepcrawl::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/products/").unwrap();
/// let url = normalize_url("../about/", Some(&base)).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let mut url = match base {
        Some(base) => base
            .join(raw.trim())
            .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?,
        None => Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let lowered = host.to_lowercase();
    if lowered != host {
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    }

    let normalized_path = normalize_path(url.path());
    if normalized_path != url.path() {
        url.set_path(&normalized_path);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Returns the lowercase extension of a URL path, if any
pub(crate) fn path_extension(url: &Url) -> Option<String> {
    let path = url.path();
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Collapses duplicate slashes and strips the trailing slash (except root)
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Drops tracking parameters and sorts the remainder by key
fn filter_and_sort_query(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize_url(raw, None).unwrap().to_string()
    }

    #[test]
    fn test_lowercase_host() {
        assert_eq!(norm("https://EXAMPLE.COM/Page"), "https://example.com/Page");
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(
            norm("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_remove_trailing_slash() {
        assert_eq!(norm("https://example.com/page/"), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(norm("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_bare_host_becomes_root() {
        assert_eq!(norm("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_default_port_stripped() {
        assert_eq!(norm("https://example.com:443/x"), "https://example.com/x");
        assert_eq!(norm("http://example.com:80/x"), "http://example.com/x");
    }

    #[test]
    fn test_explicit_port_kept() {
        assert_eq!(
            norm("http://example.com:8080/x"),
            "http://example.com:8080/x"
        );
    }

    #[test]
    fn test_collapse_duplicate_slashes() {
        assert_eq!(
            norm("https://example.com///a//b/"),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn test_remove_tracking_params() {
        assert_eq!(
            norm("https://example.com/p?utm_source=x&fbclid=1"),
            "https://example.com/p"
        );
    }

    #[test]
    fn test_utm_prefix_removed() {
        assert_eq!(
            norm("https://example.com/p?utm_custom=x"),
            "https://example.com/p"
        );
    }

    #[test]
    fn test_sort_query_params() {
        assert_eq!(
            norm("https://example.com/p?b=2&a=1"),
            "https://example.com/p?a=1&b=2"
        );
    }

    #[test]
    fn test_mixed_query_params() {
        assert_eq!(
            norm("https://example.com/p?keep=yes&utm_medium=email&also=1"),
            "https://example.com/p?also=1&keep=yes"
        );
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let base = Url::parse("https://example.com/products/").unwrap();
        let url = normalize_url("item.html", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/products/item.html");
    }

    #[test]
    fn test_resolve_parent_directory() {
        let base = Url::parse("https://example.com/products/").unwrap();
        let url = normalize_url("../category/item", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/category/item");
    }

    #[test]
    fn test_resolve_rooted_path() {
        let base = Url::parse("https://example.com/deep/nested/page").unwrap();
        let url = normalize_url("/top", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/top");
    }

    #[test]
    fn test_reject_non_http_scheme() {
        let result = normalize_url("ftp://example.com/file", None);
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_reject_mailto_resolved_against_base() {
        let base = Url::parse("https://example.com/").unwrap();
        let result = normalize_url("mailto:test@example.com", Some(&base));
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_fails_closed() {
        assert!(normalize_url("http://", None).is_err());
        assert!(normalize_url("not a url", None).is_err());
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "https://EXAMPLE.com//a/b/?z=1&a=2&utm_source=t#frag",
            "https://example.com",
            "http://example.com:8080/path/",
            "https://example.com/p?ref=rss",
            "https://example.com/a%20b?q=hello%20world",
        ];

        for raw in samples {
            let once = normalize_url(raw, None).unwrap();
            let twice = normalize_url(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_path_extension() {
        let url = Url::parse("https://example.com/img/photo.JPG").unwrap();
        assert_eq!(path_extension(&url), Some("jpg".to_string()));

        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(path_extension(&url), None);

        let url = Url::parse("https://example.com/release-1.0/notes").unwrap();
        assert_eq!(path_extension(&url), None);
    }
}
