use serde::{Deserialize, Serialize};

use super::intent::Intent;

/// A customer utterance with its known intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub intent: Intent,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
        }
    }
}
