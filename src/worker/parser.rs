//! HTML extraction shared by the built-in collectors

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Facts extracted from one HTML document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Text of the first non-empty `<title>`
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub description: Option<String>,

    /// Absolute http(s) links in document order, fragments removed, without repeats
    pub links: Vec<Url>,
}

/// Parses a document and extracts its title, description and links
///
/// # Link extraction
///
/// `<a href>` and `<link rel="canonical">` targets are resolved against `base_url`.
/// Skipped: `download` anchors, fragment-only hrefs, and anything that does not resolve to
/// an http or https URL (`javascript:`, `mailto:`, `tel:`, `data:`).
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The URL the document was served from, after redirects
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: first_text(&document, "title"),
        description: first_attr(&document, r#"meta[name="description"]"#, "content"),
        links: extract_links(&document, base_url),
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(r#"a[href], link[rel="canonical"][href]"#) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
