//! Mistral chat-completion client.
//!
//! See: <https://docs.mistral.ai/api/#tag/chat>

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{instrument, warn};

use super::traits::CompletionProvider;
use super::wire::{self, ChatCall};
use crate::Result;
use crate::types::{CompletionOptions, CompletionResponse, Message};

/// Default base URL for the Mistral API
const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// Default Mistral chat model.
pub const DEFAULT_MODEL: &str = "open-mistral-nemo";

/// Environment variable holding the Mistral API key.
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Client for Mistral chat completions.
#[derive(Clone)]
pub struct MistralClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    model: String,
}

impl MistralClient {
    /// Create a client against the public Mistral endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = wire::normalize_key(api_key);
        if api_key.is_none() {
            warn!(
                provider = "mistral",
                "{API_KEY_ENV} not set; Mistral completions will fail"
            );
        }

        Self {
            api_key,
            http: wire::default_http_client(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Use a different default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Share an HTTP client (connection pool, timeout) with other providers.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn call(&self) -> ChatCall<'_> {
        ChatCall {
            provider: "mistral",
            url: format!("{}/v1/chat/completions", self.base_url),
            api_key: self.api_key.as_deref(),
            model: &self.model,
            error_message,
        }
    }
}

/// Mistral puts the message at the top level (`{"message": "..."}`);
/// validation failures come back as `{"detail": [...]}` instead.
fn error_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    match body.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

#[async_trait]
impl CompletionProvider for MistralClient {
    fn name(&self) -> &str {
        "mistral"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, options), fields(operation = "complete", provider = "mistral", model = %self.model))]
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        self.call().send(&self.http, messages, options).await
    }
}
