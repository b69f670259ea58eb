//! Reduces a raw `Origin`/`Referer` header value to a canonical host.

use url::Url;

use crate::error::NoDomainError;

/// Returns the lower-cased host of `raw` without scheme, port, path, query or
/// fragment. Accepts full URLs as well as bare `host[:port][/path]` strings.
pub fn normalize_domain(raw: &str) -> Result<String, NoDomainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NoDomainError);
    }

    if let Ok(parsed) = Url::parse(raw) {
        if let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) {
            return Ok(host.to_lowercase());
        }
    }

    bare_host(raw).ok_or(NoDomainError)
}

/// Picks the raw value to normalize: `Origin` when present and non-blank,
/// otherwise `Referer`, otherwise the empty string.
pub fn domain_header<'a>(origin: Option<&'a str>, referer: Option<&'a str>) -> &'a str {
    origin
        .filter(|o| !o.trim().is_empty())
        .or(referer)
        .unwrap_or_default()
}

pub fn domain_from_headers(
    origin: Option<&str>,
    referer: Option<&str>,
) -> Result<String, NoDomainError> {
    normalize_domain(domain_header(origin, referer))
}

fn bare_host(raw: &str) -> Option<String> {
    let rest = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };

    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    let host = if host_port.starts_with('[') {
        // Bracketed IPv6 literal, keep everything up to the closing bracket.
        match host_port.find(']') {
            Some(end) => &host_port[..=end],
            None => host_port,
        }
    } else {
        host_port.split(':').next().unwrap_or_default()
    };

    let host = host.trim().to_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_port_and_path() {
        assert_eq!(
            normalize_domain("https://Sub.Example.com:8080/page?x=1").unwrap(),
            "sub.example.com"
        );
        assert_eq!(normalize_domain("http://example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain("https://example.com:443/path").unwrap(), "example.com");
    }

    #[test]
    fn handles_bare_hosts() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain("EXAMPLE.COM").unwrap(), "example.com");
        assert_eq!(normalize_domain("example.com:8080").unwrap(), "example.com");
        assert_eq!(normalize_domain("example.com/path/to/page").unwrap(), "example.com");
        assert_eq!(normalize_domain("user@example.com:80/x").unwrap(), "example.com");
    }

    #[test]
    fn empty_input_has_no_domain() {
        assert_eq!(normalize_domain(""), Err(NoDomainError));
        assert_eq!(normalize_domain("   "), Err(NoDomainError));
        assert_eq!(normalize_domain("https://"), Err(NoDomainError));
        assert_eq!(normalize_domain(":8080"), Err(NoDomainError));
        assert_eq!(normalize_domain("/only/a/path"), Err(NoDomainError));
    }

    #[test]
    fn never_panics_on_hostile_input() {
        for junk in [
            "://",
            "[",
            "[::1",
            "http://[::1]:80/",
            "\u{0}\u{1}",
            "ü.example.com",
            "javascript:alert(1)",
            "null",
            "%%%",
            "a:b:c:d",
            "http://exa mple.com",
        ] {
            let _ = normalize_domain(junk);
        }
    }

    #[test]
    fn origin_takes_precedence_over_referer() {
        assert_eq!(
            domain_from_headers(Some("https://a.com"), Some("https://b.com/x")).unwrap(),
            "a.com"
        );
        assert_eq!(
            domain_from_headers(None, Some("https://b.com/x")).unwrap(),
            "b.com"
        );
        assert_eq!(domain_from_headers(Some(""), Some("https://b.com")).unwrap(), "b.com");
        assert_eq!(domain_from_headers(None, None), Err(NoDomainError));
    }
}
