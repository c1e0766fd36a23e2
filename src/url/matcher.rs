/// Checks if a host matches an allow-list pattern
///
/// Two pattern forms are supported:
/// 1. Exact: `nyaa.land` matches only `nyaa.land`
/// 2. Wildcard: `*.tokyo-tosho.net` matches `tokyo-tosho.net` itself and any
///    subdomain of it, however deeply nested
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("nyaa.land", "nyaa.land"));
/// assert!(!matches_wildcard("nyaa.land", "www.nyaa.land"));
///
/// assert!(matches_wildcard("*.tokyo-tosho.net", "tokyo-tosho.net"));
/// assert!(matches_wildcard("*.tokyo-tosho.net", "www.tokyo-tosho.net"));
/// assert!(!matches_wildcard("*.tokyo-tosho.net", "tokyo-tosho.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
