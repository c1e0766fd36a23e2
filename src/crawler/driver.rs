//! Pagination driver - walks a catalog page by page
//!
//! The driver owns the cursor. For every page it builds the request, hands it
//! to the fetch client, runs the extractor over the payload and forwards the
//! records to the sink. A failing page is counted and skipped; only
//! cancellation or the page bound end a run early.
//!
//! With a detail stage, every listing record is replaced by the records of
//! its own detail page, fetched through the same client. A detail page that
//! fails is counted and skips only its listing record.

use crate::crawler::{AuthSupplier, CrawlSummary, PageCursor, RecordTemplate, UrlTemplate};
use crate::extract::{PageExtractor, Record};
use crate::fetch::{FetchClient, FetchError, ReqwestTransport, Request, Transport};
use crate::output::Sink;
use crate::url::DomainAllowList;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// What happened to one page
#[derive(Debug, Default)]
struct PageReport {
    failed: bool,
    extraction_failed: bool,
    cancelled: bool,
    records: u64,
    sink_failures: u64,
    details_failed: u64,
    next_token: Option<String>,
}

impl CrawlSummary {
    fn absorb(&mut self, report: &PageReport) {
        self.records_emitted += report.records;
        self.sink_failures += report.sink_failures;
        self.details_failed += report.details_failed;
        if report.cancelled {
            self.cancelled = true;
            return;
        }
        self.pages_visited += 1;
        if report.failed {
            self.pages_failed += 1;
        }
        if report.extraction_failed {
            self.extraction_failures += 1;
        }
    }
}

/// Second-level fetch made for every listing record
pub struct DetailStage {
    template: RecordTemplate,
    extractor: Arc<dyn PageExtractor>,
    parent_attribute: Option<String>,
}

impl DetailStage {
    pub fn new(template: RecordTemplate, extractor: Arc<dyn PageExtractor>) -> Self {
        Self {
            template,
            extractor,
            parent_attribute: None,
        }
    }

    /// Copies the listing record text into every detail record as `name`
    pub fn with_parent_attribute(mut self, name: Option<String>) -> Self {
        self.parent_attribute = name;
        self
    }

    fn adopt(&self, child: Record, parent: &Record) -> Record {
        match &self.parent_attribute {
            Some(name) => child.with_attribute(name.as_str(), parent.text.as_str()),
            None => child,
        }
    }
}

/// Why a listing record produced no detail records
enum DetailSkip {
    Failed,
    Cancelled,
}

/// Iterates page cursors and moves records from pages into a sink
///
/// Cloning a driver is cheap; clones share the fetch client and therefore
/// its connection pool.
pub struct PaginationDriver<T = ReqwestTransport> {
    client: Arc<FetchClient<T>>,
    template: Arc<dyn UrlTemplate>,
    allow_list: Arc<DomainAllowList>,
    auth: Option<(HeaderName, Arc<dyn AuthSupplier>)>,
    detail: Option<Arc<DetailStage>>,
    concurrency: usize,
    stop_after_empty_pages: Option<u32>,
}

impl<T> Clone for PaginationDriver<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            template: Arc::clone(&self.template),
            allow_list: Arc::clone(&self.allow_list),
            auth: self.auth.clone(),
            detail: self.detail.clone(),
            concurrency: self.concurrency,
            stop_after_empty_pages: self.stop_after_empty_pages,
        }
    }
}

impl<T: Transport + 'static> PaginationDriver<T> {
    /// Creates a sequential driver with no host restriction and no credential
    pub fn new(client: FetchClient<T>, template: impl UrlTemplate + 'static) -> Self {
        Self {
            client: Arc::new(client),
            template: Arc::new(template),
            allow_list: Arc::new(DomainAllowList::allow_all()),
            auth: None,
            detail: None,
            concurrency: 1,
            stop_after_empty_pages: None,
        }
    }

    /// Restricts requests to the hosts of the allow-list
    pub fn with_allow_list(mut self, allow_list: DomainAllowList) -> Self {
        self.allow_list = Arc::new(allow_list);
        self
    }

    /// Sends the supplier's credential in `header` with every request
    pub fn with_auth(mut self, header: HeaderName, supplier: impl AuthSupplier + 'static) -> Self {
        self.auth = Some((header, Arc::new(supplier)));
        self
    }

    /// Replaces every listing record by the records of its detail page
    pub fn with_detail(mut self, detail: DetailStage) -> Self {
        self.detail = Some(Arc::new(detail));
        self
    }

    /// Allows up to `concurrency` pages in flight (page-number cursors only)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ends a sequential run after this many consecutive pages without records
    pub fn with_stop_after_empty_pages(mut self, pages: Option<u32>) -> Self {
        self.stop_after_empty_pages = pages.filter(|&n| n > 0);
        self
    }

    pub fn client(&self) -> &FetchClient<T> {
        &self.client
    }

    /// Runs a crawl over at most `max_pages` pages starting at `start`
    ///
    /// # Arguments
    ///
    /// * `start` - The first cursor
    /// * `max_pages` - Upper bound on pages visited; 0 issues no request
    /// * `extractor` - Turns each payload into records
    /// * `sink` - Receives every non-blank record
    /// * `cancel` - Stops the run between pages and interrupts waits
    ///
    /// # Returns
    ///
    /// The counters of the run. Page failures never abort the run, so there
    /// is no error path; the sink is flushed before returning.
    pub async fn run(
        &self,
        start: PageCursor,
        max_pages: u32,
        extractor: Arc<dyn PageExtractor>,
        sink: Arc<dyn Sink>,
        cancel: CancellationToken,
    ) -> CrawlSummary {
        tracing::info!("Starting harvest at {} (max {} pages)", start, max_pages);
        let started = tokio::time::Instant::now();

        let mut summary = match start {
            PageCursor::Page(first) if self.concurrency > 1 => {
                self.run_concurrent(first, max_pages, extractor, Arc::clone(&sink), cancel)
                    .await
            }
            start => {
                self.run_sequential(start, max_pages, extractor, Arc::clone(&sink), cancel)
                    .await
            }
        };

        if let Err(e) = sink.flush() {
            tracing::error!("Failed to flush sink: {}", e);
            summary.sink_failures += 1;
        }

        tracing::info!(
            "Harvest finished: {} pages visited, {} records, {} failed pages in {:?}",
            summary.pages_visited,
            summary.records_emitted,
            summary.pages_failed,
            started.elapsed()
        );
        summary
    }

    async fn run_sequential(
        &self,
        start: PageCursor,
        max_pages: u32,
        extractor: Arc<dyn PageExtractor>,
        sink: Arc<dyn Sink>,
        cancel: CancellationToken,
    ) -> CrawlSummary {
        let mut summary = CrawlSummary::new();
        let mut cursor = start;
        let mut empty_streak = 0u32;

        for _ in 0..max_pages {
            if cancel.is_cancelled() {
                tracing::info!("Cancelled before {}", cursor);
                summary.cancelled = true;
                break;
            }

            let report = self
                .visit(&cursor, extractor.as_ref(), sink.as_ref(), &cancel)
                .await;
            summary.absorb(&report);
            if report.cancelled {
                break;
            }

            if let Some(limit) = self.stop_after_empty_pages {
                let empty = !report.failed && !report.extraction_failed && report.records == 0;
                empty_streak = if empty { empty_streak + 1 } else { 0 };
                if empty_streak >= limit {
                    tracing::info!(
                        "{} consecutive pages without records, stopping at {}",
                        empty_streak,
                        cursor
                    );
                    break;
                }
            }

            cursor = match cursor.advance(report.next_token) {
                Some(next) => next,
                None => {
                    tracing::info!("No cursor after {}, traversal complete", cursor);
                    break;
                }
            };
        }

        summary
    }

    async fn run_concurrent(
        &self,
        first: u32,
        max_pages: u32,
        extractor: Arc<dyn PageExtractor>,
        sink: Arc<dyn Sink>,
        cancel: CancellationToken,
    ) -> CrawlSummary {
        let mut summary = CrawlSummary::new();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let last = first.saturating_add(max_pages);

        for page in first..last {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Cancelled before page {}", page);
                    summary.cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let driver = self.clone();
            let extractor = Arc::clone(&extractor);
            let sink = Arc::clone(&sink);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                driver
                    .visit(&PageCursor::Page(page), extractor.as_ref(), sink.as_ref(), &cancel)
                    .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => summary.absorb(&report),
                Err(e) => {
                    tracing::error!("Page task failed: {}", e);
                    summary.absorb(&PageReport {
                        failed: true,
                        ..PageReport::default()
                    });
                }
            }
        }

        summary
    }

    /// Fetches one page and forwards its records
    async fn visit(
        &self,
        cursor: &PageCursor,
        extractor: &dyn PageExtractor,
        sink: &dyn Sink,
        cancel: &CancellationToken,
    ) -> PageReport {
        let mut report = PageReport::default();
        let url = self.template.url_for(cursor);

        if !self.allow_list.permits_url(&url) {
            tracing::error!("Refusing {} ({}): host is not allowed", url, cursor);
            report.failed = true;
            return report;
        }

        tracing::info!("Visiting: {}", url);

        let kind = extractor.content_kind();
        let request = match self.build_request(&url, kind.accept_header()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("{}", e);
                report.failed = true;
                return report;
            }
        };

        let payload = match self.client.fetch(&request, cancel).await {
            Ok(payload) => payload,
            Err(e) if e.is_cancelled() => {
                report.cancelled = true;
                return report;
            }
            Err(e) => {
                tracing::error!("Giving up on {}: {}", cursor, e);
                report.failed = true;
                return report;
            }
        };

        let page = extractor.extract_page(&payload.body, kind);
        if cursor.is_token() {
            report.next_token = page.next_cursor;
        }

        let records = match page.records {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Failed to extract records from {}: {}", url, e);
                report.extraction_failed = true;
                return report;
            }
        };

        for record in records {
            if record.is_blank() {
                continue;
            }

            let emitted = match &self.detail {
                None => vec![record],
                Some(detail) => match self.fetch_detail(detail, &record, cancel).await {
                    Ok(children) => children,
                    Err(DetailSkip::Failed) => {
                        report.details_failed += 1;
                        continue;
                    }
                    Err(DetailSkip::Cancelled) => {
                        report.cancelled = true;
                        break;
                    }
                },
            };

            for record in emitted {
                if record.is_blank() {
                    continue;
                }
                match sink.accept(record) {
                    Ok(()) => report.records += 1,
                    Err(e) => {
                        tracing::warn!("Sink rejected a record from {}: {}", url, e);
                        report.sink_failures += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "{}: {} records after {} attempts",
            cursor,
            report.records,
            payload.attempts
        );
        report
    }

    /// Fetches and extracts the detail page of one listing record
    async fn fetch_detail(
        &self,
        detail: &DetailStage,
        parent: &Record,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, DetailSkip> {
        let url = match detail.template.url_for_record(parent) {
            Ok(url) => url,
            Err(field) => {
                tracing::warn!(
                    "Skipping '{}': no '{}' to build its detail URL",
                    parent.text,
                    field
                );
                return Err(DetailSkip::Failed);
            }
        };

        if !self.allow_list.permits_url(&url) {
            tracing::error!("Refusing detail page {}: host is not allowed", url);
            return Err(DetailSkip::Failed);
        }

        tracing::info!("Processing: {}", parent.text);

        let kind = detail.extractor.content_kind();
        let request = self
            .build_request(&url, kind.accept_header())
            .map_err(|e| {
                tracing::error!("{}", e);
                DetailSkip::Failed
            })?;

        let payload = match self.client.fetch(&request, cancel).await {
            Ok(payload) => payload,
            Err(e) if e.is_cancelled() => return Err(DetailSkip::Cancelled),
            Err(e) => {
                tracing::warn!("Skipping '{}': {}", parent.text, e);
                return Err(DetailSkip::Failed);
            }
        };

        let children = detail
            .extractor
            .extract(&payload.body, kind)
            .map_err(|e| {
                tracing::warn!("Failed to extract records from {}: {}", url, e);
                DetailSkip::Failed
            })?;

        tracing::debug!("{}: {} detail records", url, children.len());
        Ok(children
            .into_iter()
            .map(|child| detail.adopt(child, parent))
            .collect())
    }

    fn build_request(&self, url: &str, accept: &'static str) -> Result<Request, FetchError> {
        let mut request = Request::get(url).with_header(ACCEPT, HeaderValue::from_static(accept));

        if let Some((header, supplier)) = &self.auth {
            let mut value = HeaderValue::from_str(&supplier.credential()).map_err(|e| {
                FetchError::InvalidRequest {
                    url: url.to_string(),
                    reason: format!("credential is not a valid header value: {}", e),
                }
            })?;
            value.set_sensitive(true);
            request = request.with_header(header.clone(), value);
        }

        Ok(request)
    }
}
