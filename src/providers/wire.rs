//! Shared HTTP plumbing for chat-completion backends.
//!
//! Groq and Mistral both speak a `/v1/chat/completions` dialect: the same
//! request body, the same `choices[0].message.content` response. They
//! differ in base URL, default model and error body layout, so each
//! backend supplies its own [`ErrorMessageFn`].

use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::telemetry;
use crate::types::{CompletionOptions, CompletionResponse, Message, Usage};
use crate::{PatisserieError, Result};

/// Default request timeout for remote calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Pulls a human-readable message out of a backend's error body.
pub(crate) type ErrorMessageFn = fn(&Value) -> Option<String>;

/// Build the HTTP client shared by a backend's requests.
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PatisserieError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Client used by the standalone constructors until one is shared in.
pub(crate) fn default_http_client() -> Client {
    http_client(DEFAULT_TIMEOUT_SECS).unwrap_or_else(|e| {
        warn!(error = %e, "falling back to an HTTP client without timeout");
        Client::new()
    })
}

/// Treat absent and blank keys alike.
pub(crate) fn normalize_key(api_key: Option<String>) -> Option<String> {
    api_key.filter(|k| !k.trim().is_empty())
}

/// One chat-completion call against an OpenAI-style endpoint.
pub(crate) struct ChatCall<'a> {
    pub provider: &'a str,
    pub url: String,
    pub api_key: Option<&'a str>,
    pub model: &'a str,
    pub error_message: ErrorMessageFn,
}

impl ChatCall<'_> {
    /// Send the request and decode the first choice, recording metrics.
    pub(crate) async fn send(
        self,
        http: &Client,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        let start = Instant::now();
        let result = self.send_inner(http, messages, options).await;

        let status = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        metrics::counter!(telemetry::COMPLETION_REQUESTS_TOTAL,
            "provider" => self.provider.to_string(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::COMPLETION_DURATION_SECONDS,
            "provider" => self.provider.to_string(),
        )
        .record(start.elapsed().as_secs_f64());

        result
    }

    async fn send_inner(
        &self,
        http: &Client,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        let api_key = self
            .api_key
            .ok_or_else(|| PatisserieError::MissingCredential {
                provider: self.provider.to_string(),
            })?;

        let body = ChatRequest {
            model: options.model.as_deref().unwrap_or(self.model),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PatisserieError::Http(e.to_string()))?;

        let response = self.check_status(response, body.model).await?;

        let text = response
            .text()
            .await
            .map_err(|e| PatisserieError::Http(e.to_string()))?;
        let decoded: ChatResponseBody = serde_json::from_str(&text)
            .map_err(|e| PatisserieError::MalformedResponse(e.to_string()))?;

        let content = decoded
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(WireContent::into_text)
            .ok_or(PatisserieError::EmptyResponse)?;

        Ok(CompletionResponse {
            content,
            model: decoded.model,
            usage: decoded.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    /// Map non-success statuses to errors, consuming the body for detail.
    async fn check_status(&self, response: Response, model: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Read before the body is consumed
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| (self.error_message)(&v))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        Err(match status.as_u16() {
            401 | 403 => PatisserieError::AuthenticationFailed,
            404 => PatisserieError::ModelNotFound(model.to_string()),
            429 => PatisserieError::RateLimited { retry_after },
            code => PatisserieError::Api {
                status: code,
                message: format!("{} API error: {detail}", self.provider),
            },
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<WireContent>,
}

/// Message content is usually a string; some models return typed chunks.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Chunks(Vec<WireChunk>),
}

impl WireContent {
    fn into_text(self) -> String {
        match self {
            WireContent::Text(text) => text,
            WireContent::Chunks(chunks) => chunks
                .into_iter()
                .filter(|c| c.kind.as_deref().is_none_or(|k| k == "text"))
                .filter_map(|c| c.text)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct WireChunk {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
