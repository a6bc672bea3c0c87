//! Intent classifiers.
//!
//! Both classifiers ask a [`CompletionProvider`] for a label at temperature
//! 0 and map the answer through [`Label::from_model_output`]. They differ
//! only in where the few-shot context comes from:
//! - [`RetrievalClassifier`]: nearest stored examples, per query
//! - [`StaticFewShotClassifier`]: a fixed per-intent sample, chosen once
//!
//! Classification never fails from the caller's point of view: a remote
//! error becomes [`Label::Error`] with the [`FailureKind`] attached.
//!
//! [`FailureKind`]: crate::FailureKind

mod few_shot;
pub mod prompt;
mod retrieval;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use few_shot::StaticFewShotClassifier;
pub use retrieval::RetrievalClassifier;

use crate::providers::CompletionProvider;
use crate::telemetry;
use crate::types::{ClassificationResult, CompletionOptions, Label, Message};

/// Output budget for a label; the longest label is a handful of tokens.
pub const CLASSIFY_MAX_TOKENS: u32 = 10;

/// Maps a customer message to an intent label.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classifier name for logging/metrics.
    fn name(&self) -> &str;

    /// Classify with the raw model output kept for inspection.
    async fn classify(&self, message: &str) -> ClassificationResult;

    /// Just the label: one of the five intents, `unknown` or `error`.
    async fn predict_intent(&self, message: &str) -> Label {
        self.classify(message).await.predicted_intent
    }
}

/// Run one deterministic classification completion and map the outcome.
pub(crate) async fn complete_label(
    provider: &dyn CompletionProvider,
    classifier: &str,
    messages: &[Message],
) -> ClassificationResult {
    let options = CompletionOptions::new()
        .temperature(0.0)
        .max_tokens(CLASSIFY_MAX_TOKENS);

    let result = match provider.complete(messages, &options).await {
        Ok(response) => {
            debug!(raw = %response.content, "classification output");
            ClassificationResult::from_output(response.content)
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "intent prediction failed");
            ClassificationResult::failed(e.kind())
        }
    };

    metrics::counter!(telemetry::PREDICTIONS_TOTAL,
        "classifier" => classifier.to_string(),
        "label" => result.predicted_intent.as_str(),
    )
    .increment(1);

    result
}
