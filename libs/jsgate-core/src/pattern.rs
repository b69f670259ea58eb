//! Whitelist pattern validation.
//!
//! A pattern is either an exact host (`example.com`) or a single leading
//! wildcard label (`*.example.com`). Validation runs when a pattern is written;
//! the matcher trusts whatever made it into storage.

use crate::error::InvalidPatternError;

pub const MAX_PATTERN_LEN: usize = 255;
pub const WILDCARD_PREFIX: &str = "*.";

/// Validates `raw` and returns the lower-cased form to store.
pub fn validate_pattern(raw: &str) -> Result<String, InvalidPatternError> {
    let pattern = raw.trim().to_lowercase();

    if pattern.is_empty() {
        return Err(InvalidPatternError::new("Domain pattern cannot be empty"));
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(InvalidPatternError::new("Domain pattern too long (max 255)"));
    }
    if pattern.contains("://") || pattern.contains('/') {
        return Err(InvalidPatternError::new(
            "Domain pattern must not contain protocol or path",
        ));
    }
    if pattern.contains(':') {
        return Err(InvalidPatternError::new("Domain pattern must not contain port"));
    }
    if pattern == "*" {
        return Err(InvalidPatternError::new("Bare wildcard (*) is not allowed"));
    }

    if pattern.contains('*') {
        let Some(rest) = pattern.strip_prefix(WILDCARD_PREFIX) else {
            return Err(InvalidPatternError::new("Wildcard only allowed as leading *."));
        };
        if rest.contains('*') {
            return Err(InvalidPatternError::new("Only one wildcard allowed"));
        }
        if !rest.contains('.') {
            return Err(InvalidPatternError::new(
                "Wildcard domain must have at least one dot",
            ));
        }
        if !is_host_charset(rest) {
            return Err(InvalidPatternError::new("Invalid domain format after wildcard"));
        }
    } else {
        if !pattern.contains('.') {
            return Err(InvalidPatternError::new(
                "Domain must contain at least one dot (no localhost)",
            ));
        }
        if !is_host_charset(&pattern) {
            return Err(InvalidPatternError::new(
                "Domain contains invalid characters (only a-z, 0-9, ., - allowed)",
            ));
        }
    }

    Ok(pattern)
}

/// `[a-z0-9][a-z0-9.-]*[a-z0-9]`
fn is_host_charset(host: &str) -> bool {
    let bytes = host.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    bytes.len() >= 2
        && bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
        && bytes
            .iter()
            .all(|b| edge_ok(b) || *b == b'.' || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_and_wildcard_hosts() {
        for ok in [
            "example.com",
            "sub.example.com",
            "a.b.c.example.com",
            "*.example.com",
            "*.sub.example.com",
            "my-site.example.com",
            "123.456.com",
        ] {
            assert_eq!(validate_pattern(ok).as_deref(), Ok(ok), "{ok}");
        }
    }

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(validate_pattern("  Example.COM ").unwrap(), "example.com");
        assert_eq!(validate_pattern("*.Example.Com").unwrap(), "*.example.com");
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in [
            "",
            "   ",
            "https://example.com",
            "http://example.com",
            "example.com/path",
            "example.com:8080",
            "*",
            "a.*.com",
            "*.*.example.com",
            "*example.com",
            "*.com",
            "localhost",
            "exa_mple.com",
            "-example.com",
            "example.com.",
        ] {
            assert!(validate_pattern(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overlong_pattern() {
        let long = format!("{}.com", "a".repeat(256));
        assert_eq!(
            validate_pattern(&long).unwrap_err().reason,
            "Domain pattern too long (max 255)"
        );
    }

    #[test]
    fn reason_names_the_violated_rule() {
        let err = validate_pattern("https://example.com").unwrap_err();
        assert!(err.to_string().contains("protocol"));

        let err = validate_pattern("example.com:443").unwrap_err();
        assert!(err.to_string().contains("port"));

        let err = validate_pattern("localhost").unwrap_err();
        assert!(err.to_string().contains("localhost"));
    }
}
