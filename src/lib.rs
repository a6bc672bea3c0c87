//! Patisserie - intent-classifying dessert shop assistant
//!
//! Customer messages are mapped to one of five intents by a hosted LLM,
//! steered with labeled examples, and answered in a shop persona that knows
//! the detected intent. Two pairings are provided:
//!
//! - Groq + [`RetrievalClassifier`]: examples nearest to each message,
//!   found through sentence embeddings
//! - Mistral + [`StaticFewShotClassifier`]: a fixed per-intent sample
//!
//! Classification and chat never fail from the caller's point of view:
//! remote failures come back as the `error` label (or an apology reply)
//! with a [`FailureKind`] attached.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use patisserie::{ExampleTable, GroqClient, HuggingFaceEmbedder, MistralClient, Registry};
//! use patisserie::app::Backend;
//!
//! #[tokio::main]
//! async fn main() -> patisserie::Result<()> {
//!     let registry = Registry::builder()
//!         .groq(Arc::new(GroqClient::new(std::env::var("GROQ_API_KEY").ok())))
//!         .mistral(Arc::new(MistralClient::new(std::env::var("MISTRAL_API_KEY").ok())))
//!         .embedder(Arc::new(HuggingFaceEmbedder::new(std::env::var("HF_API_KEY").ok())))
//!         .training_data(ExampleTable::from_json_path("data/train.json")?)
//!         .build()
//!         .await?;
//!
//!     let assistant = registry.get(Backend::Groq);
//!     let intent = assistant.predict_intent("Bir dilim cheesecake alabilir miyim?").await;
//!     println!("{intent}");
//!
//!     let reply = assistant.chat("Merhaba!", &[]).await;
//!     println!("[{}] {}", reply.intent, reply.reply);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod classifier;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod providers;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use app::{Assistant, Registry, RegistryBuilder};
pub use classifier::{IntentClassifier, RetrievalClassifier, StaticFewShotClassifier};
pub use dialogue::DialogueResponder;
pub use error::{FailureKind, PatisserieError, Result};
pub use evaluate::{ConfusionMatrix, EvaluationReport, Evaluator};
pub use index::{Neighbor, SimilarityIndex};
pub use providers::{
    CompletionProvider, EmbeddingProvider, GroqClient, HuggingFaceEmbedder, MistralClient,
};
pub use store::{ExampleStore, ExampleTable};
pub use version::{PKG_VERSION, version_string};

pub use types::{
    ChatReply, ClassificationResult, CompletionOptions, CompletionResponse, ConversationTurn,
    Embedding, Intent, Label, LabeledExample, Message, Role, Speaker, Usage,
};
