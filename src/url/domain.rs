use url::Url;

/// Extracts the lowercase host of a URL
///
/// Ports, paths and queries are ignored. Returns `None` for URLs without a host
/// such as `mailto:` or `data:` URLs.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://Nyaa.Land/?f=0&p=3").unwrap();
/// assert_eq!(extract_domain(&url), Some("nyaa.land".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
