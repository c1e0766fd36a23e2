use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub target: TargetConfig,
    pub extractor: ExtractorConfig,

    /// Second-level fetch made for every listing record
    #[serde(default)]
    pub detail: Option<DetailConfig>,

    pub output: OutputConfig,
}

/// Page traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First page number to request (1-based)
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Continuation token to start from
    ///
    /// When set, the crawl follows continuation tokens instead of page numbers.
    /// An empty string requests the first page.
    #[serde(rename = "start-token", default)]
    pub start_token: Option<String>,

    /// Maximum number of pages to visit
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Number of pages fetched at the same time (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Stop after this many consecutive pages yield no records
    #[serde(rename = "stop-after-empty-pages", default)]
    pub stop_after_empty_pages: Option<u32>,
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Timeout for a single HTTP round trip (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt on server or network errors
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between server/network error retries (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// How the retry delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for a single retry delay (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Response headers carrying the rate-limit reset delay, checked in order
    #[serde(rename = "rate-limit-headers", default = "default_rate_limit_headers")]
    pub rate_limit_headers: Vec<String>,

    /// Wait used when a 429 carries no usable reset header (seconds)
    ///
    /// Absent means such a response fails the page.
    #[serde(rename = "fallback-rate-limit-wait-secs", default)]
    pub fallback_rate_limit_wait_secs: Option<f64>,

    /// Maximum number of rate-limit waits per page (absent = unbounded)
    #[serde(rename = "max-rate-limit-retries", default)]
    pub max_rate_limit_retries: Option<u32>,

    /// Maximum cumulative rate-limit wait per page in seconds (absent = unbounded)
    #[serde(rename = "max-rate-limit-wait-secs", default)]
    pub max_rate_limit_wait_secs: Option<f64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            backoff: BackoffKind::default(),
            max_backoff_ms: default_max_backoff(),
            rate_limit_headers: default_rate_limit_headers(),
            fallback_rate_limit_wait_secs: None,
            max_rate_limit_retries: None,
            max_rate_limit_wait_secs: None,
        }
    }
}

/// Retry delay growth strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles with every retry
    #[default]
    Exponential,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,

    /// Literal user agent string, used verbatim instead of the formatted one
    #[serde(rename = "override", default)]
    pub override_value: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the parenthesized
    /// part reduced to whatever contact details are configured.
    pub fn header_value(&self) -> String {
        if let Some(value) = &self.override_value {
            return value.clone();
        }

        let mut contact = Vec::new();
        if let Some(url) = &self.contact_url {
            contact.push(format!("+{}", url));
        }
        if let Some(email) = &self.contact_email {
            contact.push(email.clone());
        }

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// The remote catalog being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// URL pattern with a `{page}` or `{cursor}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Hosts the harvester may contact (empty = any)
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Static credential sent with every request
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// Static credential header configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the credential
    #[serde(default = "default_auth_header")]
    pub header: String,

    /// Environment variable holding the credential
    pub env: String,

    /// Text placed before the credential (e.g. "Bearer ")
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Record extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractorConfig {
    Html(HtmlExtractorConfig),
    Json(JsonExtractorConfig),
}

/// Extraction from HTML listings
#[derive(Debug, Clone, Deserialize)]
pub struct HtmlExtractorConfig {
    /// CSS selector matching one listing row per record
    #[serde(rename = "row-selector")]
    pub row_selector: String,

    /// CSS selector for the record text inside a row (the row itself if absent)
    #[serde(rename = "field-selector", default)]
    pub field_selector: Option<String>,

    #[serde(flatten)]
    pub filter: FilterConfig,
}

/// Extraction from JSON API responses
#[derive(Debug, Clone, Deserialize)]
pub struct JsonExtractorConfig {
    /// Dotted path to the array of items (empty = the document root)
    #[serde(rename = "items-path", default)]
    pub items_path: String,

    /// Item field used as the record text
    #[serde(rename = "text-field")]
    pub text_field: String,

    /// Item fields copied into record attributes
    #[serde(rename = "attribute-fields", default)]
    pub attribute_fields: Vec<String>,

    /// Dotted path to the continuation token for the next page
    #[serde(rename = "next-cursor-field", default)]
    pub next_cursor_field: Option<String>,

    #[serde(flatten)]
    pub filter: FilterConfig,
}

/// Per-record detail pages
///
/// Every record read from a listing page is turned into a detail URL whose
/// records replace it in the output. `{text}` in the template stands for the
/// record text, any other `{name}` for the record attribute of that name.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    /// URL pattern filled in from a listing record
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Attach the listing record text to every detail record under this name
    #[serde(rename = "parent-attribute", default)]
    pub parent_attribute: Option<String>,

    /// Extraction of the detail page
    pub extractor: ExtractorConfig,
}

/// Record text clean-up and filtering
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Remove stray digits glued to the start of the text
    #[serde(rename = "strip-leading-digits", default)]
    pub strip_leading_digits: bool,

    /// Keep only records containing one of these (case-insensitive)
    #[serde(rename = "require-any", default)]
    pub require_any: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Destination file (text, JSON lines or SQLite database)
    pub path: String,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Whether an existing destination is kept or replaced
    #[serde(default)]
    pub mode: WriteMode,

    /// Also print every record to stdout
    #[serde(default)]
    pub echo: bool,
}

/// Output formats supported by the built-in sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One record text per line
    #[default]
    Lines,
    /// One JSON object per line
    Jsonl,
    /// Rows in a SQLite database
    Sqlite,
}

/// How a sink treats output left by a previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Existing output is discarded when the sink opens
    #[default]
    Overwrite,
    /// New records are added after existing output
    Append,
}

fn default_start_page() -> u32 {
    1
}

fn default_concurrency() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    1000
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_rate_limit_headers() -> Vec<String> {
    vec![
        "x-ratelimit-reset-after".to_string(),
        "retry-after".to_string(),
    ]
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}
