//! HTML parsing: link extraction and visible-text derivation
//!
//! Links come back in DOM order, which fixes the enqueue order within one
//! depth level. The visible-text pass also feeds the simple backend's
//! blocked-content heuristic and the extraction layer.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extracted information from one HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Page title, if present and non-empty
    pub title: Option<String>,

    /// Outbound links as absolute URLs, in DOM order
    pub links: Vec<String>,

    /// Visible text with scripts/styles removed and whitespace collapsed
    pub text: String,
}

/// Parses HTML content into title, links, and visible text
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        text: collect_visible_text(&document),
    }
}

/// Extracts just the visible text from HTML
pub fn visible_text(html: &str) -> String {
    collect_visible_text(&Html::parse_document(html))
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts `<a href>` targets in document order
///
/// Skips download links, fragment-only anchors, and non-web schemes
/// (`javascript:`, `mailto:`, `tel:`, `data:`). Relative references are
/// resolved against the page's final URL. Scope filtering is not done here;
/// the ledger records what the page linked to, in-scope or not.
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute) = resolve_link(href, base_url) {
                links.push(absolute);
            }
        }
    }

    links
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

fn collect_visible_text(document: &Html) -> String {
    let mut out = String::new();

    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next());

    match body {
        Some(element) => collect_element_text(element, &mut out),
        None => collect_element_text(document.root_element(), &mut out),
    }

    out
}

fn collect_element_text(element: ElementRef<'_>, out: &mut String) {
    if matches!(
        element.value().name(),
        "script" | "style" | "noscript" | "template"
    ) {
        return;
    }

    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            collect_element_text(el, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/listing").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title>  Shop  </title></head><body></body></html>";
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, Some("Shop".to_string()));
    }

    #[test]
    fn test_missing_title() {
        let parsed = parse_page("<html><body>hi</body></html>", &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_links_in_dom_order() {
        let html = r#"<html><body>
            <a href="/second">2</a>
            <a href="/first">1</a>
            <a href="https://other.com/third">3</a>
        </body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(
            parsed.links,
            vec![
                "https://example.com/second",
                "https://example.com/first",
                "https://other.com/third",
            ]
        );
    }

    #[test]
    fn test_relative_links_resolved() {
        let html = r#"<a href="item">x</a>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/item"]);
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r#"<body>
            <a href="javascript:void(0)">a</a>
            <a href="mailto:x@example.com">b</a>
            <a href="tel:+123">c</a>
            <a href="data:text/html,x">d</a>
        </body>"#;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_skip_fragment_only_and_download() {
        let html = r##"<body>
            <a href="#section">jump</a>
            <a href="/file.iso" download>get</a>
        </body>"##;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_nofollow_links_are_followed() {
        let html = r#"<a href="/page" rel="nofollow">x</a>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/page"]);
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let html = r#"<html><body>
            <h1>Product</h1>
            <script>var x = "hidden";</script>
            <style>.c { color: red }</style>
            <p>Great   value</p>
        </body></html>"#;
        assert_eq!(visible_text(html), "Product Great   value");
    }

    #[test]
    fn test_visible_text_without_body() {
        assert_eq!(visible_text("<p>loose text</p>"), "loose text");
    }

    #[test]
    fn test_visible_text_empty_page() {
        assert_eq!(visible_text("<html><body></body></html>"), "");
    }
}
