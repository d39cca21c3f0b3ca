//! Block list entry matching
//!
//! An entry is either a domain pattern, compared label-wise against the
//! navigated host in both directions, or a keyword pattern (`*word*`),
//! searched case-insensitively in the full URL.

use crate::config::BlockList;
use crate::url::{find_case_insensitive, strip_www};

/// A parsed block list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Domain(&'a str),
    Keyword(&'a str),
}

impl<'a> Entry<'a> {
    /// `*word*` (longer than two characters) is a keyword, anything else a
    /// domain.
    pub fn parse(raw: &'a str) -> Self {
        if raw.len() > 2 && raw.starts_with('*') && raw.ends_with('*') {
            Self::Keyword(&raw[1..raw.len() - 1])
        } else {
            Self::Domain(raw)
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Self::Keyword(_))
    }
}

/// Whether `entry` matches a navigation to `url` on `domain`.
///
/// `domain` may be given with or without its `www.` prefix.
pub fn matches(domain: &str, url: &str, entry: &str) -> bool {
    match Entry::parse(entry) {
        Entry::Keyword(keyword) => keyword_matches(url, keyword),
        Entry::Domain(pattern) => domain_matches(strip_www(domain), pattern),
    }
}

/// Exact match, `domain` below `pattern`, or `pattern` below `domain`.
pub fn domain_matches(domain: &str, pattern: &str) -> bool {
    domain == pattern || is_subdomain_of(domain, pattern) || is_subdomain_of(pattern, domain)
}

/// Case-insensitive substring search over the whole URL.
pub fn keyword_matches(url: &str, keyword: &str) -> bool {
    find_case_insensitive(url.as_bytes(), keyword.as_bytes()).is_some()
}

/// True if any of the list's entries matches.
pub fn list_matches(list: &BlockList, domain: &str, url: &str) -> bool {
    list.websites.iter().any(|entry| matches(domain, url, entry))
}

#[inline]
fn is_subdomain_of(child: &str, parent: &str) -> bool {
    child.len() > parent.len()
        && child.ends_with(parent)
        && child.as_bytes()[child.len() - parent.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/";

    #[test]
    fn test_entry_parse() {
        assert_eq!(Entry::parse("*poker*"), Entry::Keyword("poker"));
        assert_eq!(Entry::parse("**"), Entry::Domain("**"));
        assert_eq!(Entry::parse("*a*"), Entry::Keyword("a"));
        assert_eq!(Entry::parse("example.com"), Entry::Domain("example.com"));
        assert_eq!(Entry::parse("*.example.com"), Entry::Domain("*.example.com"));
    }

    #[test]
    fn test_domain_match_both_directions() {
        assert!(matches("mail.google.com", URL, "google.com"));
        assert!(matches("google.com", URL, "mail.google.com"));
        assert!(matches("google.com", URL, "google.com"));
        assert!(!matches("evilgoogle.com", URL, "google.com"));
        assert!(!matches("google.com", URL, "evilgoogle.com"));
        assert!(!matches("google.co", URL, "google.com"));
    }

    #[test]
    fn test_domain_match_strips_www() {
        assert!(matches("www.reddit.com", URL, "reddit.com"));
        assert!(matches("www.reddit.com", URL, "old.reddit.com"));
        // a stored www entry still matches the bare host as its parent
        assert!(matches("reddit.com", URL, "www.reddit.com"));
    }

    #[test]
    fn test_keyword_is_url_wide() {
        let url = "https://news.example.org/Sports/GAMBLING-odds";
        assert!(matches("news.example.org", url, "*gambling*"));
        assert!(matches("unrelated.test", url, "*gambling*"));
        assert!(!matches("gambling.com", "https://cards.example/", "*gambling*"));
    }

    #[test]
    fn test_list_matches_any() {
        let list = BlockList::new("l", "L").with_websites(["twitter.com", "*casino*"]);
        assert!(list_matches(&list, "twitter.com", "https://twitter.com/home"));
        assert!(list_matches(&list, "example.com", "https://example.com/casino"));
        assert!(!list_matches(&list, "example.com", "https://example.com/news"));
    }
}
