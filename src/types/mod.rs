//! Public types for the Patisserie API.

mod embedding;
mod example;
mod intent;
mod message;
mod options;
mod response;

pub use embedding::Embedding;
pub use example::LabeledExample;
pub use intent::{Intent, Label};
pub use message::{ConversationTurn, Message, Role, Speaker};
pub use options::CompletionOptions;
pub use response::{ChatReply, ClassificationResult, CompletionResponse, Usage};
