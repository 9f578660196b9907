//! Tests for `ChatCompletionsClient` against a local mock endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::{Value, json};

use terrareview_core::summarize::client::MAX_ERROR_BODY_CHARS;
use terrareview_core::summarize::{
    ChatCompletionsClient, SummarizeError, Summarizer, SummarizerConfig,
};

const GOOD_KEY: &str = "nvapi-good";

/// Echoes request fields back inside the completion so tests can inspect
/// what was sent. Rejects any bearer token other than [`GOOD_KEY`].
async fn completions(headers: HeaderMap, axum::Json(body): axum::Json<Value>) -> (StatusCode, String) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != format!("Bearer {GOOD_KEY}") {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid api key"}"#.to_string(),
        );
    }

    let content = format!(
        "model={} temperature={} max_tokens={} role={} prompt_has_plan={}",
        body["model"].as_str().unwrap_or_default(),
        body["temperature"],
        body["max_tokens"],
        body["messages"][0]["role"].as_str().unwrap_or_default(),
        body["messages"][0]["content"]
            .as_str()
            .unwrap_or_default()
            .contains("Plan: 1 to add"),
    );
    let reply = json!({
        "id": "cmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    });
    (StatusCode::OK, reply.to_string())
}

/// A proxy error page much larger than anything worth showing a user.
async fn bad_gateway() -> (StatusCode, String) {
    let page = format!(
        "<html><body><h1>502 Bad Gateway</h1>{}</body></html>",
        "<p>upstream unavailable</p>".repeat(500)
    );
    (StatusCode::BAD_GATEWAY, page)
}

async fn spawn_mock() -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/gateway/chat/completions", post(bad_gateway));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(base_url: String) -> ChatCompletionsClient {
    ChatCompletionsClient::new(SummarizerConfig {
        base_url,
        model: "test-model".to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn sends_bearer_auth_and_fixed_sampling() {
    let addr = spawn_mock().await;
    let client = client_for(format!("http://{addr}/v1"));

    let reply = client
        .complete("Plan Details: Plan: 1 to add", GOOD_KEY)
        .await
        .unwrap();

    assert!(reply.contains("model=test-model"), "reply: {reply}");
    assert!(reply.contains("temperature=0.3"), "reply: {reply}");
    assert!(reply.contains("max_tokens=400"), "reply: {reply}");
    assert!(reply.contains("role=user"), "reply: {reply}");
    assert!(reply.contains("prompt_has_plan=true"), "reply: {reply}");
}

#[tokio::test]
async fn rejected_credential_is_http_error() {
    let addr = spawn_mock().await;
    let client = client_for(format!("http://{addr}/v1/"));

    let err = client.complete("prompt", "nvapi-wrong").await.unwrap_err();
    match err {
        SummarizeError::HttpError { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected HttpError, got {other:?}"),
    }
}

#[tokio::test]
async fn large_error_page_is_truncated() {
    let addr = spawn_mock().await;
    let client = client_for(format!("http://{addr}/gateway"));

    let err = client.complete("prompt", GOOD_KEY).await.unwrap_err();
    match err {
        SummarizeError::HttpError { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS);
            assert!(body.starts_with("<html><body><h1>502 Bad Gateway</h1>"));
        }
        other => panic!("expected HttpError, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_path_is_http_error() {
    let addr = spawn_mock().await;
    let client = client_for(format!("http://{addr}/v2"));

    let err = client.complete("prompt", GOOD_KEY).await.unwrap_err();
    assert!(matches!(err, SummarizeError::HttpError { status: 404, .. }));
}

#[tokio::test]
async fn refused_connection_is_connection_failed() {
    // Bind and drop to find a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{addr}/v1"));
    let err = client.complete("prompt", GOOD_KEY).await.unwrap_err();
    match err {
        SummarizeError::ConnectionFailed { endpoint, .. } => {
            assert_eq!(endpoint, format!("http://{addr}/v1/chat/completions"));
        }
        other => panic!("expected ConnectionFailed, got {other:?}"),
    }
}
