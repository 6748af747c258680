//! Integration tests for the call executor surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cachecall::{
    Authenticator, CachePolicy, CallError, CallerConfig, DiskStore, WebServiceCaller,
};
use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next};
use serde::Deserialize;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

fn caller() -> WebServiceCaller {
    WebServiceCaller::builder()
        .store(DiskStore::in_memory().unwrap())
        .build()
        .unwrap()
}

/// Test 1: typed objects come from the mapper
#[tokio::test]
async fn test_object_is_mapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "name": "Ada"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let caller = caller();
    let request = caller
        .client()
        .get(format!("{}/users/1", mock_server.uri()))
        .build()
        .unwrap();

    let user: User = caller.call(request).object().await.unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            name: "Ada".to_owned()
        }
    );
}

/// Test 2: a malformed body surfaces as a parsing error
#[tokio::test]
async fn test_malformed_body_is_parsing_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let caller = caller();
    let request = caller.client().get(mock_server.uri()).build().unwrap();

    let error = caller.call(request).object::<User>().await.unwrap_err();
    match error {
        CallError::Parsing(parsing) => assert!(parsing.target().ends_with("User")),
        other => panic!("expected parsing error, got {other:?}"),
    }
}

/// Test 3: non-2xx responses fail by default and can be returned on demand
#[tokio::test]
async fn test_error_responses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let caller = caller();
    let url = format!("{}/missing", mock_server.uri());

    let error = caller
        .call(caller.client().get(&url).build().unwrap())
        .send()
        .await
        .unwrap_err();
    match error {
        CallError::Status(status) => {
            assert_eq!(status.status(), Some(StatusCode::NOT_FOUND));
            assert_eq!(status.message(), Some("Not Found"));
            let body = status.into_response().unwrap().into_body();
            assert_eq!(body.as_ref(), b"no such thing");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let response = caller
        .call(caller.client().get(&url).build().unwrap())
        .return_error_responses(true)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "no such thing");
}

/// Test 4: configured defaults apply when a call picks nothing
#[tokio::test]
async fn test_configured_defaults() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("configured"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = CallerConfig::from_yaml(
        r#"
        connect_timeout: 2s
        read_timeout: 2s
        write_timeout: 2s
        default_policy: network_then_cache
        default_retention_secs: 45
        "#,
    )
    .unwrap();
    let caller = WebServiceCaller::builder()
        .config(config)
        .store(DiskStore::in_memory().unwrap())
        .build()
        .unwrap();
    let url = format!("{}/config", mock_server.uri());

    let response = caller
        .call(caller.client().get(&url).build().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers().get("cache-control").unwrap(), "max-age=45");

    let body = caller
        .call(caller.client().get(&url).build().unwrap())
        .policy(CachePolicy::OnlyCache)
        .text()
        .await
        .unwrap();
    assert_eq!(body, "configured");
}

/// Test 5: the disk cache is created in the configured directory
#[tokio::test]
async fn test_disk_cache_directory() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/disk"))
        .respond_with(ResponseTemplate::new(200).set_body_string("on disk"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("http");
    let caller = WebServiceCaller::builder()
        .cache_dir(&cache_dir)
        .build()
        .unwrap();
    assert!(cache_dir.is_dir());

    let url = format!("{}/disk", mock_server.uri());
    caller
        .call(caller.client().get(&url).build().unwrap())
        .policy(CachePolicy::NetworkThenCache)
        .retention_secs(60)
        .send()
        .await
        .unwrap();

    let body = caller
        .call(caller.client().get(&url).build().unwrap())
        .policy(CachePolicy::OnlyCache)
        .text()
        .await
        .unwrap();
    assert_eq!(body, "on disk");
}

struct Token(&'static str);

#[async_trait]
impl Authenticator for Token {
    async fn authenticate(&self, request: &Request, _: &Response) -> Option<Request> {
        let mut retry = request.try_clone()?;
        retry.headers_mut().insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", self.0).parse().ok()?,
        );
        Some(retry)
    }
}

/// Test 6: a 401 is replayed once through the authenticator
#[tokio::test]
async fn test_authenticator_replays_on_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let caller = WebServiceCaller::builder()
        .authenticator(Token("secret"))
        .build()
        .unwrap();
    let url = format!("{}/private", mock_server.uri());

    let body = caller
        .call(caller.client().get(&url).build().unwrap())
        .text()
        .await
        .unwrap();
    assert_eq!(body, "welcome");
}

struct CountingMiddleware(Arc<AtomicUsize>);

#[async_trait]
impl Middleware for CountingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.0.fetch_add(1, Ordering::SeqCst);
        next.run(req, extensions).await
    }
}

/// Test 7: extra middlewares see every call once, fallbacks included
#[tokio::test]
async fn test_extra_middleware_runs_once_per_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("counted"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let caller = WebServiceCaller::builder()
        .middleware(CountingMiddleware(calls.clone()))
        .store(DiskStore::in_memory().unwrap())
        .build()
        .unwrap();

    // cache miss, then network: two attempts, one call
    caller
        .call(caller.client().get(mock_server.uri()).build().unwrap())
        .policy(CachePolicy::CacheThenNetwork)
        .send()
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Test 8: clones share the connectivity flag
#[tokio::test]
async fn test_clones_share_connectivity() {
    let caller = caller();
    let clone = caller.clone();

    caller.connectivity().set_connected(false);
    assert!(!clone.connectivity().is_connected());

    let request = clone
        .client()
        .get("http://unreachable.invalid/")
        .build()
        .unwrap();
    let error = clone.call(request).send().await.unwrap_err();
    match error {
        CallError::Connectivity { host } => assert_eq!(host, "unreachable.invalid"),
        other => panic!("expected connectivity error, got {other:?}"),
    }
}

/// Test 9: rebuilt responses keep the URL of the call
#[tokio::test]
async fn test_rebuilt_responses_report_call_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_string("orders"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;

    let caller = caller();
    let url = format!("{}/orders", mock_server.uri());

    let stored = caller
        .call(caller.client().get(&url).build().unwrap())
        .policy(CachePolicy::NetworkThenCache)
        .retention_secs(60)
        .send()
        .await
        .unwrap();
    assert_eq!(stored.url().as_str(), url);

    let cached = caller
        .call(caller.client().get(&url).build().unwrap())
        .policy(CachePolicy::OnlyCache)
        .send()
        .await
        .unwrap();
    assert_eq!(cached.url().as_str(), url);

    let gone_url = format!("{}/gone", mock_server.uri());
    let gone = caller
        .call(caller.client().get(&gone_url).build().unwrap())
        .return_error_responses(true)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::GONE);
    assert_eq!(gone.url().as_str(), gone_url);
}
