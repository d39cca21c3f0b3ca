//! Fast URL helpers
//!
//! These functions avoid allocations and work directly on string slices.
//! Tab URLs arrive already normalized by the browser, so no full parser is
//! needed on the navigation path.

// =============================================================================
// Scheme Extraction
// =============================================================================

/// URL schemes the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    /// Anything else (`chrome:`, `chrome-extension:`, `file:`, `data:` ...).
    Other,
}

impl Scheme {
    pub fn is_web(self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }
}

/// Fast scheme extraction without URL parsing.
/// Returns None if the string has no scheme at all.
#[inline]
pub fn extract_scheme(url: &str) -> Option<Scheme> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 {
        return None;
    }

    let scheme = &bytes[..colon_pos];
    if scheme.eq_ignore_ascii_case(b"https") {
        Some(Scheme::Https)
    } else if scheme.eq_ignore_ascii_case(b"http") {
        Some(Scheme::Http)
    } else {
        Some(Scheme::Other)
    }
}

/// Offset just past `://`, or None for URLs without an authority
/// (`about:blank`, `data:...`).
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let colon = url.find(':')?;
    url[colon..].starts_with("://").then_some(colon + 3)
}

// =============================================================================
// Host Extraction
// =============================================================================

#[inline]
fn is_authority_end(b: u8) -> bool {
    matches!(b, b'/' | b'?' | b'#')
}

/// Byte range of the hostname: after any `user:pass@`, before any port,
/// path, query or fragment.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let rest = &url.as_bytes()[scheme_end..];

    let authority_len = rest.iter().position(|&b| is_authority_end(b)).unwrap_or(rest.len());
    let authority = &rest[..authority_len];

    let host_start = authority.iter().rposition(|&b| b == b'@').map_or(0, |at| at + 1);
    let host = &authority[host_start..];
    // IPv6 literals keep their brackets and inner colons
    let host_len = if host.first() == Some(&b'[') {
        host.iter().position(|&b| b == b']').map_or(host.len(), |close| close + 1)
    } else {
        host.iter().position(|&b| b == b':').unwrap_or(host.len())
    };

    let start = scheme_end + host_start;
    Some((start, start + host_len))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, or None when there is no host.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    let host = &url[host_start..host_end];
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Strip a single leading `www.` label.
#[inline]
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// A bare DNS hostname: dot-separated labels of ASCII letters, digits and
/// inner hyphens, each 1-63 bytes, 253 bytes at most overall.
pub fn is_plain_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes.len() <= 63
            && bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
            && bytes[0] != b'-'
            && bytes[bytes.len() - 1] != b'-'
    })
}

/// An absolute http(s) URL with a non-empty host.
pub fn is_http_url(s: &str) -> bool {
    extract_scheme(s).is_some_and(Scheme::is_web) && extract_host(s).is_some()
}

// =============================================================================
// Case-Insensitive Search
// =============================================================================

/// ASCII case-insensitive substring search.
pub fn find_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }

    let last = haystack.len() - needle.len();
    (0..=last).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
