use std::net::IpAddr;
use url::{Host, Url};

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_conductor::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the registrable domain (public suffix plus one label) of a URL
///
/// Uses the Public Suffix List, so multi-label suffixes are handled:
/// `shop.example.co.uk` yields `example.co.uk`, not `co.uk`.
///
/// IP addresses and hosts that are themselves a public suffix (or a single label such as
/// `localhost`) have no registrable domain; for those the lowercase host is returned so
/// that every crawlable URL still maps to exactly one partition.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_conductor::url::registrable_domain;
///
/// let url = Url::parse("https://shop.example.co.uk/basket").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.co.uk".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(registrable_domain_of_host(domain)),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Registrable domain of a bare host name, falling back to the host itself
///
/// IP literals come back in the same form [`registrable_domain`] gives them.
pub fn registrable_domain_of_host(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(addr) = literal.parse::<IpAddr>() {
        return addr.to_string();
    }
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}

/// Registrable domain named by one line of a domain list
///
/// The line may carry a scheme, a port or a path, e.g. `https://www.example.com:8080/a`.
///
/// # Examples
///
/// ```
/// use crawl_conductor::url::domain_of_line;
///
/// assert_eq!(domain_of_line(" https://www.example.co.uk/a "), "example.co.uk");
/// ```
pub fn domain_of_line(line: &str) -> String {
    let rest = line
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = match rest.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or(bracketed),
        None => rest.split(['/', ':']).next().unwrap_or(rest),
    };
    registrable_domain_of_host(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of_line() {
        assert_eq!(domain_of_line("www.example.com"), "example.com");
        assert_eq!(domain_of_line("http://shop.example.co.uk:8080/x"), "example.co.uk");
        assert_eq!(domain_of_line("  HTTPS://News.Example.org/  "), "example.org");
        assert_eq!(domain_of_line("127.0.0.1:3000"), "127.0.0.1");
        assert_eq!(domain_of_line("http://[::1]:8080/"), "::1");
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registrable_simple() {
        let url = Url::parse("http://www.example.com/a").unwrap();
        assert_eq!(registrable_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registrable_two_part_country_suffix() {
        let url = Url::parse("http://shop.example.co.uk/a").unwrap();
        assert_eq!(registrable_domain(&url), Some("example.co.uk".to_string()));

        let url = Url::parse("http://www.winkel.com.au/").unwrap();
        assert_eq!(registrable_domain(&url), Some("winkel.com.au".to_string()));
    }

    #[test]
    fn test_registrable_deep_subdomain() {
        let url = Url::parse("https://a.b.c.example.nl/").unwrap();
        assert_eq!(registrable_domain(&url), Some("example.nl".to_string()));
    }

    #[test]
    fn test_registrable_ip_falls_back_to_host() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(registrable_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_registrable_of_ip_host_matches_url_form() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            Some(registrable_domain_of_host("127.0.0.1")),
            registrable_domain(&url)
        );
        assert_eq!(registrable_domain_of_host("[::1]"), "::1");
    }

    #[test]
    fn test_registrable_single_label_falls_back_to_host() {
        assert_eq!(registrable_domain_of_host("localhost"), "localhost");
    }

    #[test]
    fn test_registrable_of_host_lowercases() {
        assert_eq!(registrable_domain_of_host("WWW.Example.COM"), "example.com");
    }
}
