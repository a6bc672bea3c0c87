//! Wiremock integration tests for MistralClient.

use patisserie::providers::CompletionProvider;
use patisserie::{CompletionOptions, MistralClient, Message, PatisserieError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> MistralClient {
    MistralClient::with_base_url(Some("test_key".to_string()), server.uri())
}

#[tokio::test]
async fn test_complete_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_partial_json(serde_json::json!({"model": "open-mistral-nemo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "model": "open-mistral-nemo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": " ask_recommendation\n"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .complete(&[Message::user("Ne önerirsiniz?")], &CompletionOptions::new())
        .await
        .expect("complete should succeed");

    // Whitespace is left for label normalisation
    assert_eq!(response.content, " ask_recommendation\n");
    assert!(response.usage.is_none());
}

#[tokio::test]
async fn test_chunked_content_is_joined() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": [
                {"type": "text", "text": "order_"},
                {"type": "text", "text": "dessert"}
            ]}}]
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(response.content, "order_dessert");
}

#[tokio::test]
async fn test_validation_error_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "detail": [
                {"loc": ["body", "temperature"], "msg": "Input should be less than or equal to 1.5"}
            ]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new().temperature(9.0))
        .await
        .unwrap_err();
    match err {
        PatisserieError::Api { status, message } => {
            assert_eq!(status, 422);
            assert!(message.contains("less than or equal to 1.5"), "got: {message}");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_is_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "Forbidden"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::AuthenticationFailed));
}

#[tokio::test]
async fn test_null_content_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::EmptyResponse));
}

#[tokio::test]
async fn test_blank_key_counts_as_missing() {
    let client = MistralClient::with_base_url(Some("   ".to_string()), "http://127.0.0.1:9");
    let err = client
        .complete(&[Message::user("hi")], &CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PatisserieError::MissingCredential { .. }));
}
