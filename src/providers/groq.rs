//! Groq chat-completion client.
//!
//! Groq serves open-weight models behind an OpenAI-compatible API.
//! See: <https://console.groq.com/docs/api-reference#chat-create>

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{instrument, warn};

use super::traits::CompletionProvider;
use super::wire::{self, ChatCall};
use crate::Result;
use crate::types::{CompletionOptions, CompletionResponse, Message};

/// Default base URL for the Groq API
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Default Groq chat model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Environment variable holding the Groq API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Client for Groq chat completions.
///
/// A client without an API key can still be built; the problem is logged
/// once here and every call returns `MissingCredential`.
#[derive(Clone)]
pub struct GroqClient {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    model: String,
}

impl GroqClient {
    /// Create a client against the public Groq endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = wire::normalize_key(api_key);
        if api_key.is_none() {
            warn!(
                provider = "groq",
                "{API_KEY_ENV} not set; Groq completions will fail"
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
            provider: "groq",
            url: format!("{}/v1/chat/completions", self.base_url),
            api_key: self.api_key.as_deref(),
            model: &self.model,
            error_message,
        }
    }
}

/// Groq wraps errors OpenAI-style: `{"error": {"message": "..."}}`.
fn error_message(body: &Value) -> Option<String> {
    body.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl CompletionProvider for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, options), fields(operation = "complete", provider = "groq", model = %self.model))]
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        self.call().send(&self.http, messages, options).await
    }
}
