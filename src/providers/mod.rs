//! Remote and local backends behind the provider traits.
//!
//! Completion: [`GroqClient`], [`MistralClient`]. Embeddings:
//! [`HuggingFaceEmbedder`], plus [`FastEmbedProvider`] with the
//! `local-inference` feature.

#[cfg(feature = "local-inference")]
pub mod fastembed;
pub mod groq;
pub mod huggingface;
pub mod mistral;
pub mod traits;
pub(crate) mod wire;

#[cfg(feature = "local-inference")]
pub use fastembed::{FastEmbedProvider, LocalEmbeddingModel};
pub use groq::GroqClient;
pub use huggingface::HuggingFaceEmbedder;
pub use mistral::MistralClient;
pub use traits::{CompletionProvider, EmbeddingProvider};
pub use wire::DEFAULT_TIMEOUT_SECS;
