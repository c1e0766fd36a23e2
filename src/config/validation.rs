use crate::config::types::{
    AuthConfig, Config, CrawlerConfig, DetailConfig, ExtractorConfig, FetchConfig, FilterConfig,
    OutputConfig, TargetConfig, UserAgentConfig,
};
use crate::crawler::RecordTemplate;
use crate::url::DomainAllowList;
use crate::ConfigError;
use reqwest::header::HeaderName;
use scraper::Selector;
use std::time::Duration;
use url::Url;

/// Upper bound for concurrently fetched pages
const MAX_CONCURRENCY: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_target_config(&config.target, &config.crawler)?;
    validate_extractor_config(&config.extractor, &config.crawler)?;
    if let Some(detail) = &config.detail {
        validate_detail_config(detail, &config.target)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates page traversal configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_pages = 0 is a legal no-op run

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start-page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.stop_after_empty_pages == Some(0) {
        return Err(ConfigError::Validation(
            "stop-after-empty-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch and retry configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_backoff_ms < config.retry_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= retry-backoff-ms ({})",
            config.max_backoff_ms, config.retry_backoff_ms
        )));
    }

    if config.rate_limit_headers.is_empty() {
        return Err(ConfigError::Validation(
            "rate-limit-headers cannot be empty".to_string(),
        ));
    }

    for header in &config.rate_limit_headers {
        validate_header_name(header, "rate-limit-headers")?;
    }

    validate_seconds(
        config.fallback_rate_limit_wait_secs,
        "fallback-rate-limit-wait-secs",
    )?;
    validate_seconds(config.max_rate_limit_wait_secs, "max-rate-limit-wait-secs")?;

    Ok(())
}

/// Validates an optional duration given in (fractional) seconds
///
/// The value must convert to a `Duration`, so NaN, negative and
/// overflowing values are all rejected here rather than dropped later.
fn validate_seconds(value: Option<f64>, name: &str) -> Result<(), ConfigError> {
    match value {
        Some(secs) if Duration::try_from_secs_f64(secs).is_err() => {
            Err(ConfigError::Validation(format!(
                "{} must be a non-negative number of seconds that fits a duration, got {}",
                name, secs
            )))
        }
        _ => Ok(()),
    }
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if let Some(value) = &config.override_value {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent override cannot be empty".to_string(),
            ));
        }
        return Ok(());
    }

    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates the target catalog configuration
fn validate_target_config(config: &TargetConfig, crawler: &CrawlerConfig) -> Result<(), ConfigError> {
    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    let template = &config.url_template;
    let sample = if crawler.start_token.is_some() {
        if !template.contains("{cursor}") {
            return Err(ConfigError::Validation(format!(
                "url-template '{}' must contain {{cursor}} when start-token is set",
                template
            )));
        }
        template.replace("{cursor}", "token")
    } else {
        if !template.contains("{page}") {
            return Err(ConfigError::Validation(format!(
                "url-template '{}' must contain {{page}}",
                template
            )));
        }
        template.replace("{page}", &crawler.start_page.to_string())
    };

    validate_http_template(template, &sample, config, "url-template")?;

    if let Some(auth) = &config.auth {
        validate_auth_config(auth)?;
    }

    Ok(())
}

/// Checks a filled-in template sample: http(s) and inside the allow-list
fn validate_http_template(
    template: &str,
    sample: &str,
    target: &TargetConfig,
    name: &str,
) -> Result<(), ConfigError> {
    let url = Url::parse(sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, template
        )));
    }

    let allow_list = DomainAllowList::new(target.allowed_domains.iter().cloned());
    if !allow_list.permits_url(sample) {
        return Err(ConfigError::Validation(format!(
            "{} '{}' points outside allowed-domains",
            name, template
        )));
    }

    Ok(())
}

/// Validates the per-record detail stage
fn validate_detail_config(config: &DetailConfig, target: &TargetConfig) -> Result<(), ConfigError> {
    let template = RecordTemplate::new(&config.url_template);
    let placeholders = template.placeholders();

    if placeholders.is_empty() {
        return Err(ConfigError::Validation(format!(
            "detail url-template '{}' must contain a {{field}} placeholder",
            config.url_template
        )));
    }
    if placeholders.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "detail url-template '{}' has an empty placeholder",
            config.url_template
        )));
    }

    let sample = template
        .fill(|_| Some("1".to_string()))
        .map_err(|name| ConfigError::Validation(format!("unfillable placeholder {{{}}}", name)))?;
    validate_http_template(&config.url_template, &sample, target, "detail url-template")?;

    if config
        .parent_attribute
        .as_ref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "detail parent-attribute cannot be empty".to_string(),
        ));
    }

    validate_extractor_fields(&config.extractor)
}

/// Validates the static credential configuration
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    validate_header_name(&config.header, "auth header")?;

    if config.env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "auth env variable name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(
    config: &ExtractorConfig,
    crawler: &CrawlerConfig,
) -> Result<(), ConfigError> {
    if crawler.start_token.is_some() {
        let has_cursor_field = match config {
            ExtractorConfig::Html(_) => false,
            ExtractorConfig::Json(json) => json.next_cursor_field.is_some(),
        };
        if !has_cursor_field {
            return Err(ConfigError::Validation(
                "start-token requires a json extractor with next-cursor-field".to_string(),
            ));
        }
    }

    validate_extractor_fields(config)
}

/// Validates selectors, fields and filters of an extractor
fn validate_extractor_fields(config: &ExtractorConfig) -> Result<(), ConfigError> {
    match config {
        ExtractorConfig::Html(html) => {
            validate_selector(&html.row_selector, "row-selector")?;
            if let Some(field) = &html.field_selector {
                validate_selector(field, "field-selector")?;
            }
            validate_filter(&html.filter)
        }
        ExtractorConfig::Json(json) => {
            if json.text_field.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "text-field cannot be empty".to_string(),
                ));
            }
            validate_filter(&json.filter)
        }
    }
}

fn validate_selector(selector: &str, name: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("Invalid {} '{}': {:?}", name, selector, e))
    })?;
    Ok(())
}

fn validate_filter(filter: &FilterConfig) -> Result<(), ConfigError> {
    if filter.require_any.iter().any(|needle| needle.is_empty()) {
        return Err(ConfigError::Validation(
            "require-any entries cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_header_name(name: &str, context: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::Validation(format!("Invalid header name in {}: '{}'", context, name)))?;
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const BASE: &str = r#"
[crawler]
max-pages = 3

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-email = "admin@example.com"

[target]
url-template = "https://nyaa.land/?p={page}"
allowed-domains = ["nyaa.land"]

[extractor]
kind = "html"
row-selector = "table tbody tr"

[output]
path = "out.txt"
"#;

    fn with(replace: &str, by: &str) -> Result<Config, ConfigError> {
        parse_config(&BASE.replace(replace, by))
    }

    #[test]
    fn test_base_config_is_valid() {
        assert!(parse_config(BASE).is_ok());
    }

    #[test]
    fn test_zero_max_pages_is_valid() {
        assert!(with("max-pages = 3", "max-pages = 0").is_ok());
    }

    #[test]
    fn test_invalid_concurrency() {
        assert!(with("max-pages = 3", "max-pages = 3\nconcurrency = 0").is_err());
        assert!(with("max-pages = 3", "max-pages = 3\nconcurrency = 65").is_err());
        assert!(with("max-pages = 3", "max-pages = 3\nconcurrency = 8").is_ok());
    }

    #[test]
    fn test_invalid_start_page() {
        let result = with("max-pages = 3", "max-pages = 3\nstart-page = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_template_requires_placeholder() {
        let result = with("?p={page}", "?p=1");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_template_must_stay_inside_allow_list() {
        let result = with("https://nyaa.land/", "https://other.land/");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_template_must_be_http() {
        let result = with("https://nyaa.land/", "ftp://nyaa.land/");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_selector() {
        let result = with("table tbody tr", "a[[");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_start_token_requires_json_cursor_field() {
        let result = with(
            "max-pages = 3",
            "max-pages = 3\nstart-token = \"\"",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_fallback_wait_rejected() {
        let content = format!("{}\n[fetch]\nfallback-rate-limit-wait-secs = -1.0\n", BASE);
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    const DETAIL: &str = r#"
[detail]
url-template = "https://nyaa.land/view/{id}"

[detail.extractor]
kind = "html"
row-selector = "div.torrent-file-list li"
"#;

    #[test]
    fn test_detail_stage_is_valid() {
        let content = format!("{}{}", BASE, DETAIL);
        let config = parse_config(&content).unwrap();
        assert!(config.detail.is_some());
    }

    #[test]
    fn test_detail_template_needs_placeholder() {
        let content = format!("{}{}", BASE, DETAIL.replace("{id}", "1"));
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_detail_template_must_stay_inside_allow_list() {
        let content = format!("{}{}", BASE, DETAIL.replace("nyaa.land", "elsewhere.org"));
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_detail_extractor_is_checked() {
        let content = format!("{}{}", BASE, DETAIL.replace("div.torrent-file-list li", "a[["));
        assert!(matches!(
            parse_config(&content),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_wait_rejected() {
        for key in ["fallback-rate-limit-wait-secs", "max-rate-limit-wait-secs"] {
            let content = format!("{}\n[fetch]\n{} = 1e30\n", BASE, key);
            assert!(
                matches!(parse_config(&content), Err(ConfigError::Validation(_))),
                "{} = 1e30 should be rejected",
                key
            );
        }

        let content = format!("{}\n[fetch]\nfallback-rate-limit-wait-secs = 5.0\n", BASE);
        let config = parse_config(&content).unwrap();
        assert_eq!(
            crate::fetch::RetrySettings::from(&config.fetch).fallback_rate_limit_wait,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_backoff_bounds() {
        let content = format!(
            "{}\n[fetch]\nretry-backoff-ms = 5000\nmax-backoff-ms = 100\n",
            BASE
        );
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_invalid_rate_limit_header() {
        let content = format!("{}\n[fetch]\nrate-limit-headers = [\"bad header\"]\n", BASE);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_empty_output_path() {
        let result = with("path = \"out.txt\"", "path = \"\"");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("nyaa.land").is_ok());
        assert!(validate_domain_pattern("*.tokyo-tosho.net").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("localhost").is_err());
        assert!(validate_domain_pattern(".nyaa.land").is_err());
        assert!(validate_domain_pattern("nyaa.land.").is_err());
        assert!(validate_domain_pattern("nyaa..land").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }
}
