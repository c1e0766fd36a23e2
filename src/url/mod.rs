//! URL handling for Sumi-Harvest
//!
//! The harvester only ever talks to the hosts a target is configured for. This
//! module holds the domain allow-list that enforces that, along with the small
//! host helpers it is built from.

mod domain;
mod matcher;

pub use domain::extract_domain;
pub use matcher::matches_wildcard;

use url::Url;

/// The set of hosts a crawl is permitted to contact
///
/// Patterns follow the same syntax as the configuration file: either an exact
/// host (`nyaa.land`) or a wildcard (`*.tokyo-tosho.net`) that also covers the
/// bare domain. An empty allow-list permits every host.
#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    patterns: Vec<String>,
}

impl DomainAllowList {
    /// Creates an allow-list from configured domain patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    /// An allow-list that permits every host
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true when no restriction is configured
    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks whether a host may be contacted
    pub fn permits_domain(&self, domain: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        let domain = domain.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| matches_wildcard(pattern, &domain))
    }

    /// Checks whether a URL's host may be contacted
    ///
    /// URLs that do not parse or carry no host are never permitted, even by an
    /// unrestricted list.
    pub fn permits_url(&self, url: &str) -> bool {
        match Url::parse(url).ok().as_ref().and_then(extract_domain) {
            Some(domain) => self.permits_domain(&domain),
            None => false,
        }
    }
}
