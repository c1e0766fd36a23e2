//! Complete harvest runs driven from configuration

use std::path::Path;
use sumi_harvest::config::{parse_config, Config};
use sumi_harvest::crawler::harvest;
use sumi_harvest::output::SqliteSink;
use sumi_harvest::{CrawlSummary, Record};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates an HTML listing configuration pointed at the mock server
fn html_config(server: &MockServer, output: &Path, max_pages: u32, extra_crawler: &str) -> Config {
    let content = r#"
[crawler]
max-pages = MAX_PAGES
EXTRA

[fetch]
max-retries = 2
retry-backoff-ms = 10
max-backoff-ms = 50

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-email = "admin@example.com"

[target]
url-template = "URI/list?p={page}"
allowed-domains = ["127.0.0.1"]

[extractor]
kind = "html"
row-selector = "table tbody tr"
field-selector = "td:nth-child(2) a"

[output]
path = "OUTPUT"
"#
    .replace("MAX_PAGES", &max_pages.to_string())
    .replace("EXTRA", extra_crawler)
    .replace("URI", &server.uri())
    .replace("OUTPUT", &output.to_string_lossy());

    parse_config(&content).unwrap()
}

/// Renders a listing page with one row per title
fn listing(titles: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<tr><td>Anime</td><td><a href="/view/{}">{}</a></td></tr>"#,
                i, title
            )
        })
        .collect();
    format!(
        "<html><body><table><tbody>{}</tbody></table></body></html>",
        rows
    )
}

async fn mount_page(server: &MockServer, page: u32, titles: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("p", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(titles)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_with_rate_limit_and_failing_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("torrents.txt");

    mount_page(&server, 1, &["A", "B"]).await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-reset-after", "0.05"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, &["C"]).await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("p", "3"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("p", "3"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = html_config(&server, &output, 3, "");
    let summary = harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.records_emitted, 3);
    assert_eq!(summary.pages_failed, 1);
    assert!(!summary.cancelled);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "A\nB\nC\n");
}

#[tokio::test]
async fn test_zero_max_pages_issues_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = html_config(&server, &dir.path().join("out.txt"), 0, "");
    let summary = harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary, CrawlSummary::default());
}

#[tokio::test]
async fn test_overwrite_runs_are_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("torrents.txt");

    mount_page(&server, 1, &["Show - 01", "Show - 02"]).await;
    mount_page(&server, 2, &["Show - 03"]).await;

    let config = html_config(&server, &output, 2, "");

    harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();
    let first = std::fs::read_to_string(&output).unwrap();

    harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();
    let second = std::fs::read_to_string(&output).unwrap();

    assert_eq!(first, "Show - 01\nShow - 02\nShow - 03\n");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_page_is_fetched_once_and_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, &["After the gap"]).await;

    let config = html_config(&server, &output, 2, "");
    let summary = harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "After the gap\n");
}

#[tokio::test]
async fn test_concurrent_pages_all_arrive() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");

    for page in 1..=8 {
        let title = format!("Title {}", page);
        mount_page(&server, page, &[title.as_str()]).await;
    }

    let config = html_config(&server, &output, 8, "concurrency = 4");
    let summary = harvest(&config, "test-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 8);
    assert_eq!(summary.records_emitted, 8);

    let content = std::fs::read_to_string(&output).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort();
    let mut expected: Vec<String> = (1..=8).map(|n| format!("Title {}", n)).collect();
    expected.sort();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn test_cancelled_run_issues_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = html_config(&server, &dir.path().join("out.txt"), 5, "");
    let summary = harvest(&config, "test-hash", cancel).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.pages_visited, 0);
}

#[tokio::test]
async fn test_json_api_with_token_cursor_and_credential() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("files.db");

    std::env::set_var("SUMI_HARVEST_IT_API_KEY", "k3y");

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("after", "first"))
        .and(header("authorization", "Bearer k3y"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"files": [{"id": 1, "name": "Show.S01E01.ja.srt"}], "next": "second"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("after", "second"))
        .and(header("authorization", "Bearer k3y"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"files": [{"id": 2, "name": "Show.S01E02.ja.srt"}], "next": null}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let content = r#"
[crawler]
max-pages = 10
start-token = "first"

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"

[target]
url-template = "URI/api/files?after={cursor}"
allowed-domains = ["127.0.0.1"]

[target.auth]
env = "SUMI_HARVEST_IT_API_KEY"
prefix = "Bearer"

[extractor]
kind = "json"
items-path = "files"
text-field = "name"
attribute-fields = ["id"]
next-cursor-field = "next"

[output]
path = "OUTPUT"
format = "sqlite"
"#
    .replace("URI", &server.uri())
    .replace("OUTPUT", &output.to_string_lossy());
    let config = parse_config(&content).unwrap();

    let summary = harvest(&config, "json-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.records_emitted, 2);

    let stored = SqliteSink::open(&output, sumi_harvest::config::WriteMode::Append, "json-hash")
        .unwrap()
        .records()
        .unwrap();
    assert_eq!(
        stored,
        vec![
            Record::new("Show.S01E01.ja.srt").with_attribute("id", "1"),
            Record::new("Show.S01E02.ja.srt").with_attribute("id", "2"),
        ]
    );
}

#[tokio::test]
async fn test_entry_files_skip_failing_entry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("filenames.txt");

    Mock::given(method("GET"))
        .and(path("/api/entries/search"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"id": 11, "name": "Frieren"}, {"id": 12, "name": "Dungeon Meshi"}]"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/entries/11/files"))
        .and(header("authorization", "jimaku-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"name": "Frieren - 01.ja.srt"}, {"name": "Frieren - 02.ja.srt"}]"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/entries/12/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    std::env::set_var("SUMI_HARVEST_IT_DETAIL_KEY", "jimaku-key");

    let content = r#"
[crawler]
max-pages = 1

[fetch]
max-retries = 2
retry-backoff-ms = 10
max-backoff-ms = 50

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"

[target]
url-template = "URI/api/entries/search?anime=true&page={page}"
allowed-domains = ["127.0.0.1"]

[target.auth]
env = "SUMI_HARVEST_IT_DETAIL_KEY"

[extractor]
kind = "json"
text-field = "name"
attribute-fields = ["id"]

[detail]
url-template = "URI/api/entries/{id}/files"

[detail.extractor]
kind = "json"
text-field = "name"

[output]
path = "OUTPUT"
"#
    .replace("URI", &server.uri())
    .replace("OUTPUT", &output.to_string_lossy());
    let config = parse_config(&content).unwrap();

    let summary = harvest(&config, "detail-hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.records_emitted, 2);
    assert_eq!(summary.details_failed, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Frieren - 01.ja.srt\nFrieren - 02.ja.srt\n"
    );
}
