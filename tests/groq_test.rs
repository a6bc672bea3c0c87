//! Wiremock integration tests for GroqClient.

use std::time::Duration;

use patisserie::providers::CompletionProvider;
use patisserie::{CompletionOptions, FailureKind, GroqClient, Message, PatisserieError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GroqClient {
    GroqClient::with_base_url(Some("test_key".to_string()), server.uri())
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "llama-3.3-70b-versatile",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 40, "completion_tokens": 2, "total_tokens": 42}
    })
}

#[tokio::test]
async fn test_complete_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.3-70b-versatile",
            "messages": [{"role": "user", "content": "Merhaba"}],
            "temperature": 0.0,
            "max_tokens": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("greeting")))
        .expect(1)
        .mount(&server)
        .await;

    let options = CompletionOptions::new().temperature(0.0).max_tokens(10);
    let response = client(&server)
        .complete(&[Message::user("Merhaba")], &options)
        .await
        .expect("complete should succeed");

    assert_eq!(response.content, "greeting");
    assert_eq!(response.model.as_deref(), Some("llama-3.3-70b-versatile"));
    assert_eq!(response.usage.unwrap().total_tokens, 42);
}

#[tokio::test]
async fn test_options_model_overrides_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"model": "llama-3.1-8b-instant"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let options = CompletionOptions::new().model("llama-3.1-8b-instant");
    let response = client(&server)
        .complete(&[Message::user("hi")], &options)
        .await
        .unwrap();
    assert_eq!(response.content, "ok");
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::AuthenticationFailed));
    assert_eq!(err.kind(), FailureKind::Auth);
}

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    match err {
        PatisserieError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_model_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::ModelNotFound(ref m) if m == "llama-3.3-70b-versatile"));
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"message": "upstream exploded"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    match err {
        PatisserieError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "groq API error: upstream exploded");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_no_choices_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::EmptyResponse));
    assert_eq!(err.kind(), FailureKind::MalformedResponse);
}

#[tokio::test]
async fn test_missing_key_never_reaches_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("greeting")))
        .expect(0)
        .mount(&server)
        .await;

    let client = GroqClient::with_base_url(None, server.uri());
    let err = client
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::MissingCredential { ref provider } if provider == "groq"));
    assert_eq!(err.kind(), FailureKind::MissingCredential);
}
