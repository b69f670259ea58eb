use serde::Serialize;

use crate::model::WhitelistEntry;
use crate::normalize::normalize_domain;
use crate::pattern::WILDCARD_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub allowed: bool,
    pub matched_patterns: Vec<String>,
}

/// Tests `host` (already normalized) against the active entries.
///
/// An empty active set denies everything. A `*.base` pattern matches strict
/// subdomains of `base` only, never `base` itself. Every matching pattern is
/// reported, in whitelist order.
pub fn match_domain(host: &str, entries: &[WhitelistEntry]) -> MatchOutcome {
    let matched_patterns: Vec<String> = entries
        .iter()
        .filter(|e| e.is_active)
        .filter(|e| pattern_matches(&e.pattern, host))
        .map(|e| e.pattern.clone())
        .collect();

    MatchOutcome {
        allowed: !matched_patterns.is_empty(),
        matched_patterns,
    }
}

pub fn pattern_matches(pattern: &str, host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    let pattern = pattern.trim().to_lowercase();

    match pattern.strip_prefix(WILDCARD_PREFIX) {
        Some(base) => {
            host.len() > base.len() + 1
                && host.ends_with(base)
                && host.as_bytes()[host.len() - base.len() - 1] == b'.'
        }
        None => host == pattern,
    }
}

/// Result of running a raw header value through normalization and matching.
/// Delivery and the operator-facing tester both go through [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCheck {
    pub normalized_domain: Option<String>,
    pub allowed: bool,
    pub matched_patterns: Vec<String>,
    pub active_patterns_count: usize,
}

pub fn evaluate(raw: &str, entries: &[WhitelistEntry]) -> DomainCheck {
    let active_patterns_count = entries.iter().filter(|e| e.is_active).count();

    match normalize_domain(raw) {
        Ok(host) => {
            let outcome = match_domain(&host, entries);
            DomainCheck {
                normalized_domain: Some(host),
                allowed: outcome.allowed,
                matched_patterns: outcome.matched_patterns,
                active_patterns_count,
            }
        }
        Err(_) => DomainCheck {
            normalized_domain: None,
            allowed: false,
            matched_patterns: Vec::new(),
            active_patterns_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WhitelistOwner;
    use chrono::Utc;

    fn entry(pattern: &str, is_active: bool) -> WhitelistEntry {
        WhitelistEntry {
            id: 0,
            owner: WhitelistOwner::Script(1),
            pattern: pattern.to_string(),
            is_active,
            created_at: Utc::now(),
        }
    }

    fn active(patterns: &[&str]) -> Vec<WhitelistEntry> {
        patterns.iter().map(|p| entry(p, true)).collect()
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        for p in ["example.com", "sub.example.com", "a-b.co.uk"] {
            let entries = active(&[p]);
            assert!(match_domain(p, &entries).allowed);
            assert!(!match_domain(&format!("x{p}"), &entries).allowed);
            assert!(!match_domain(&format!("sub.{p}"), &entries).allowed);
        }
    }

    #[test]
    fn wildcard_matches_strict_subdomains() {
        for base in ["example.com", "sub.example.org"] {
            let entries = active(&[&format!("*.{base}")]);
            assert!(!match_domain(base, &entries).allowed);
            assert!(match_domain(&format!("sub.{base}"), &entries).allowed);
            assert!(match_domain(&format!("a.sub.{base}"), &entries).allowed);
            assert!(!match_domain(&format!("evil{base}"), &entries).allowed);
            assert!(!match_domain(&format!(".{base}"), &entries).allowed);
        }
    }

    #[test]
    fn empty_active_set_denies_everything() {
        assert!(!match_domain("example.com", &[]).allowed);

        let inactive = vec![entry("example.com", false), entry("*.example.com", false)];
        assert!(!match_domain("example.com", &inactive).allowed);
        assert!(!match_domain("www.example.com", &inactive).allowed);
    }

    #[test]
    fn inactive_entries_are_ignored() {
        let entries = vec![entry("example.com", false), entry("other.com", true)];
        assert!(!match_domain("example.com", &entries).allowed);
        assert!(match_domain("other.com", &entries).allowed);
    }

    #[test]
    fn reports_every_matching_pattern() {
        let entries = active(&[
            "*.example.com",
            "other.com",
            "*.sub.example.com",
            "a.sub.example.com",
        ]);
        let outcome = match_domain("a.sub.example.com", &entries);
        assert!(outcome.allowed);
        assert_eq!(
            outcome.matched_patterns,
            vec!["*.example.com", "*.sub.example.com", "a.sub.example.com"]
        );
    }

    #[test]
    fn empty_host_never_matches() {
        assert!(!match_domain("", &active(&["example.com"])).allowed);
    }

    #[test]
    fn evaluate_normalizes_before_matching() {
        let entries = active(&["*.example.com"]);
        let check = evaluate("https://Shop.Example.com:8443/cart", &entries);
        assert_eq!(check.normalized_domain.as_deref(), Some("shop.example.com"));
        assert!(check.allowed);
        assert_eq!(check.matched_patterns, vec!["*.example.com"]);
        assert_eq!(check.active_patterns_count, 1);
    }

    #[test]
    fn evaluate_denies_missing_domain() {
        let check = evaluate("", &active(&["example.com"]));
        assert_eq!(check.normalized_domain, None);
        assert!(!check.allowed);
        assert!(check.matched_patterns.is_empty());
    }

    #[test]
    fn evaluate_is_idempotent() {
        let entries = active(&["example.com", "*.example.com"]);
        let first = evaluate("www.example.com", &entries);
        let second = evaluate("www.example.com", &entries);
        assert_eq!(first, second);
    }
}
