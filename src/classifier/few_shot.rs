use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

use super::{IntentClassifier, complete_label, prompt};
use crate::Result;
use crate::providers::CompletionProvider;
use crate::store::ExampleTable;
use crate::types::{ClassificationResult, Intent, Message};

/// Classifier with a few-shot block fixed at construction.
///
/// A small random sample per intent is rendered once and reused for every
/// call, so predictions cost one completion and nothing else.
pub struct StaticFewShotClassifier {
    provider: Arc<dyn CompletionProvider>,
    few_shot: String,
}

impl StaticFewShotClassifier {
    /// Examples sampled per intent unless overridden.
    pub const DEFAULT_SAMPLES_PER_INTENT: usize = 2;

    /// Sample the default number of examples per intent from `table`.
    pub fn new(provider: Arc<dyn CompletionProvider>, table: &ExampleTable) -> Self {
        Self::with_sampling(
            provider,
            table,
            Self::DEFAULT_SAMPLES_PER_INTENT,
            &mut rand::thread_rng(),
        )
    }

    /// Sample `samples_per_intent` examples per intent using `rng`.
    ///
    /// A table without `text`/`intent` columns (after lowercasing and
    /// trimming the names) leaves the block empty; the classifier then
    /// works zero-shot.
    ///
    /// Intent cells are compared exactly, so the table should already hold
    /// normalised (trimmed, lowercase) intent names. Rows like `"Goodbye "`
    /// are never sampled, although [`ExampleStore::from_table`] would keep
    /// them.
    ///
    /// [`ExampleStore::from_table`]: crate::store::ExampleStore::from_table
    pub fn with_sampling<R: Rng + ?Sized>(
        provider: Arc<dyn CompletionProvider>,
        table: &ExampleTable,
        samples_per_intent: usize,
        rng: &mut R,
    ) -> Self {
        let few_shot = match sample_block(table, samples_per_intent, rng) {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "could not prepare few-shot examples; continuing without");
                String::new()
            }
        };
        Self { provider, few_shot }
    }

    /// The fixed reference block embedded in every prompt.
    pub fn few_shot_block(&self) -> &str {
        &self.few_shot
    }

    pub fn build_messages(&self, message: &str) -> Vec<Message> {
        prompt::few_shot_messages(message, &self.few_shot)
    }
}

fn sample_block<R: Rng + ?Sized>(
    table: &ExampleTable,
    samples_per_intent: usize,
    rng: &mut R,
) -> Result<String> {
    let mut table = table.clone();
    table.normalize_columns();
    let rows: Vec<(Option<&str>, Option<&str>)> = table.labeled_cells()?.collect();

    let mut picked: Vec<(&str, Intent)> = Vec::new();
    for intent in Intent::ALL {
        let candidates: Vec<&str> = rows
            .iter()
            .filter(|(_, label)| label.is_some_and(|l| l == intent.as_str()))
            .filter_map(|(text, _)| *text)
            .collect();

        if candidates.len() >= samples_per_intent {
            picked.extend(
                candidates
                    .choose_multiple(&mut *rng, samples_per_intent)
                    .map(|text| (*text, intent)),
            );
        } else {
            picked.extend(candidates.into_iter().map(|text| (text, intent)));
        }
    }

    info!(examples = picked.len(), "static few-shot examples loaded");
    Ok(prompt::render_few_shot(picked))
}

#[async_trait]
impl IntentClassifier for StaticFewShotClassifier {
    fn name(&self) -> &str {
        "static-few-shot"
    }

    #[instrument(skip(self, message), fields(classifier = "static-few-shot", provider = self.provider.name()))]
    async fn classify(&self, message: &str) -> ClassificationResult {
        let messages = self.build_messages(message);
        complete_label(self.provider.as_ref(), self.name(), &messages).await
    }
}
