use crate::UrlError;
use url::Url;

/// Scheme prefix given to bare host inputs
const DEFAULT_SCHEME_PREFIX: &str = "http://";

/// Returns true if the input already names an HTTP(S) scheme
pub fn has_http_scheme(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Normalizes one line of crawl input into a URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Inputs without an `http://` or `https://` prefix get `http://` prepended.
///    Plain HTTP is never upgraded: callers that need TLS must say so explicitly.
/// 3. Parse the URL; reject if malformed
/// 4. Reject non-HTTP(S) schemes and URLs without a host
///
/// The parsed form is the canonical serialization used for deduplication and for the
/// output name hash, so `example.com` and `http://example.com` collapse to the same URL.
///
/// # Arguments
///
/// * `input` - The raw input string
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - The input cannot be turned into a crawlable URL
///
/// # Examples
///
/// ```
/// use crawl_conductor::url::normalize_input;
///
/// let url = normalize_input("example.com").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/");
/// ```
pub fn normalize_input(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}
