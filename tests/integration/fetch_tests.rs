//! Fetch client tests against a real HTTP server

use reqwest::header::{HeaderValue, AUTHORIZATION};
use sumi_harvest::config::{FetchConfig, UserAgentConfig};
use sumi_harvest::fetch::{
    FetchClient, FetchError, PolicyError, RateLimitPolicy, ReqwestTransport, Request,
    RetrySettings,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestHarvester".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: None,
        contact_email: Some("admin@example.com".to_string()),
        override_value: None,
    }
}

fn client() -> FetchClient {
    let fetch = FetchConfig {
        max_retries: 2,
        retry_backoff_ms: 10,
        max_backoff_ms: 50,
        ..FetchConfig::default()
    };
    let transport = ReqwestTransport::from_config(&user_agent(), &fetch).unwrap();
    FetchClient::new(transport, RateLimitPolicy::default(), RetrySettings::from(&fetch))
}

#[tokio::test]
async fn test_sends_user_agent_and_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/entries"))
        .and(header("user-agent", "TestHarvester/1.0 (admin@example.com)"))
        .and(header("authorization", "k3y"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::get(format!("{}/api/entries", server.uri()))
        .with_header(AUTHORIZATION, HeaderValue::from_static("k3y"));
    let payload = client()
        .fetch(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(payload.status, 200);
    assert_eq!(payload.text(), "[]");
    assert_eq!(payload.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-reset-after", "0.05"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client()
        .fetch(
            &Request::get(format!("{}/busy", server.uri())),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(payload.text(), "done");
    assert_eq!(payload.attempts, 3);
}

#[tokio::test]
async fn test_not_found_is_fetched_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .fetch(
            &Request::get(format!("{}/missing", server.uri())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Client { status: 404, .. }));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = client()
        .fetch(
            &Request::get(format!("{}/flaky", server.uri())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn test_rate_limit_without_header_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .fetch(
            &Request::get(format!("{}/limited", server.uri())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::RateLimitPolicy {
            source: PolicyError::MissingHeader { .. },
            ..
        }
    ));
}
