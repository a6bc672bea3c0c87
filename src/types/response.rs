//! Completion, classification and chat result types

use serde::{Deserialize, Serialize};

use super::intent::Label;
use crate::error::FailureKind;

/// Non-streaming completion response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Outcome of one classification call. Produced per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_intent: Label,
    /// Completion text as returned by the model, before normalisation.
    /// Empty when the remote call failed.
    pub raw_model_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ClassificationResult {
    /// Result for a completion that came back; maps the text to a label.
    pub fn from_output(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            predicted_intent: Label::from_model_output(&raw),
            raw_model_output: raw,
            failure: None,
        }
    }

    /// Result for a failed remote call.
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            predicted_intent: Label::Error,
            raw_model_output: String::new(),
            failure: Some(kind),
        }
    }
}

/// A reply paired with the intent detected for the message it answers.
///
/// Always usable: when generation fails `reply` holds an apology that
/// includes the error detail and `failure` says what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub intent: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}
