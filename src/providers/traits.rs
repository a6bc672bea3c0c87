//! Provider traits for the two remote capabilities the pipeline consumes.
//!
//! Classification and dialogue code only ever see these traits, so prompt
//! construction stays independent of any vendor's request shape:
//! - [`CompletionProvider`]: message-based chat completion (Groq, Mistral)
//! - [`EmbeddingProvider`]: text to fixed-width vectors (HuggingFace, fastembed)
//!
//! Implementations return errors; they never degrade on their own. Turning
//! a failed call into a sentinel label or an apology is the caller's job.

use async_trait::async_trait;

use crate::Result;
use crate::types::{CompletionOptions, CompletionResponse, Embedding, Message};

// ============================================================================
// Completion Provider
// ============================================================================

/// Provider for non-streaming chat completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Model used when the options don't override it.
    fn model(&self) -> &str;

    /// Complete an ordered message list and return the first choice.
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse>;
}

// ============================================================================
// Embedding Provider
// ============================================================================

/// Provider for text embeddings.
///
/// The model is fixed per provider, so the same input always maps to the
/// same vector and every vector shares one dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Embed many texts; one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    ///
    /// Default implementation goes through `embed_batch`.
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or(crate::PatisserieError::EmptyResponse)
    }
}

// ============================================================================
// Tests
// ============================================================================
