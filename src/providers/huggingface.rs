//! HuggingFace Inference API client for sentence embeddings.
//!
//! This client uses HuggingFace's serverless feature-extraction pipeline.
//! See: <https://huggingface.co/docs/api-inference/index>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{instrument, warn};

use super::traits::EmbeddingProvider;
use super::wire;
use crate::{Embedding, PatisserieError, Result};

/// Default base URL for HuggingFace Inference API
const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Multilingual sentence model; the shop's customers write Turkish.
pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Environment variable holding the HuggingFace API key.
pub const API_KEY_ENV: &str = "HF_API_KEY";

/// Remote embedder backed by the HuggingFace Inference API.
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    model: String,
}

impl HuggingFaceEmbedder {
    /// Create an embedder for the default multilingual model.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create an embedder with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = wire::normalize_key(api_key);
        if api_key.is_none() {
            warn!(
                provider = "huggingface",
                "{API_KEY_ENV} not set; embedding requests will fail"
            );
        }

        Self {
            api_key,
            http: wire::default_http_client(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Use a different sentence-transformers model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Share an HTTP client with other providers.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check response status and map to appropriate error.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(PatisserieError::AuthenticationFailed),
            404 => Err(PatisserieError::ModelNotFound(self.model.clone())),
            429 => {
                // Try to parse retry-after header
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(PatisserieError::RateLimited { retry_after })
            }
            503 => Err(PatisserieError::Api {
                status: 503,
                message: "Model is loading, please retry".to_string(),
            }),
            code => Err(PatisserieError::Api {
                status: code,
                message: format!("HuggingFace API error: {}", status),
            }),
        }
    }
}

#[derive(Serialize)]
struct EmbedBatchRequest<'a> {
    inputs: &'a [&'a str],
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    fn name(&self) -> &str {
        "huggingface"
    }

    #[instrument(skip(self, texts), fields(operation = "embed_batch", batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key =
            self.api_key
                .as_deref()
                .ok_or_else(|| PatisserieError::MissingCredential {
                    provider: "huggingface".to_string(),
                })?;

        let url = format!(
            "{}/pipeline/feature-extraction/{}",
            self.base_url, self.model
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&EmbedBatchRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| PatisserieError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        // Sentence-transformers models return one pooled vector per input
        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| PatisserieError::MalformedResponse(e.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(PatisserieError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors
            .into_iter()
            .map(|values| Embedding::new(values, self.model.clone()))
            .collect())
    }
}
