use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::{IntentClassifier, complete_label, prompt};
use crate::index::SimilarityIndex;
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::store::ExampleStore;
use crate::types::{ClassificationResult, LabeledExample, Message};
use crate::{PatisserieError, Result};

/// Classifier that grounds each prompt in the stored examples nearest to
/// the incoming message.
///
/// The store's embeddings are indexed once at construction. Without a
/// working embedder the classifier still runs, zero-shot.
pub struct RetrievalClassifier {
    provider: Arc<dyn CompletionProvider>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: ExampleStore,
    index: Option<SimilarityIndex>,
    top_k: usize,
}

impl RetrievalClassifier {
    /// Neighbours retrieved per query unless overridden.
    pub const DEFAULT_TOP_K: usize = 5;

    /// Build the classifier, degrading to zero-shot if the store cannot be
    /// embedded (no embedder, model failure, remote error).
    pub async fn new(
        provider: Arc<dyn CompletionProvider>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        store: ExampleStore,
    ) -> Self {
        let index = match &embedder {
            Some(embedder) => match build_index(embedder.as_ref(), &store).await {
                Ok(index) => Some(index),
                Err(e) => {
                    warn!(embedder = embedder.name(), error = %e, "retrieval disabled: could not index examples");
                    None
                }
            },
            None => {
                warn!("retrieval disabled: no embedder configured");
                None
            }
        };

        Self {
            provider,
            embedder,
            store,
            index,
            top_k: Self::DEFAULT_TOP_K,
        }
    }

    /// Build the classifier, failing if retrieval cannot be set up.
    pub async fn try_new(
        provider: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: ExampleStore,
    ) -> Result<Self> {
        let index = build_index(embedder.as_ref(), &store).await?;
        Ok(Self {
            provider,
            embedder: Some(embedder),
            store,
            index: Some(index),
            top_k: Self::DEFAULT_TOP_K,
        })
    }

    /// Set how many neighbours are retrieved per query.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Whether queries are grounded in retrieved examples.
    pub fn has_retrieval(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    /// The stored examples nearest to `message`, nearest first.
    ///
    /// Any failure here (no index, query embedding error) yields no
    /// examples; the prediction then proceeds zero-shot.
    pub async fn retrieve(&self, message: &str) -> Vec<&LabeledExample> {
        let (Some(index), Some(embedder)) = (&self.index, &self.embedder) else {
            return Vec::new();
        };
        if index.is_empty() || self.top_k == 0 {
            return Vec::new();
        }

        let query = match embedder.embed(message).await {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "query embedding failed; classifying without examples");
                return Vec::new();
            }
        };

        match index.search(&query.values, self.top_k) {
            Ok(hits) => hits
                .into_iter()
                .filter_map(|hit| self.store.get(hit.index))
                .collect(),
            Err(e) => {
                warn!(error = %e, "similarity search failed; classifying without examples");
                Vec::new()
            }
        }
    }

    /// Prompt messages for `message` given its retrieved examples.
    pub fn build_messages(&self, message: &str, examples: &[&LabeledExample]) -> Vec<Message> {
        prompt::retrieval_messages(message, &prompt::render_retrieved(examples))
    }
}

async fn build_index(embedder: &dyn EmbeddingProvider, store: &ExampleStore) -> Result<SimilarityIndex> {
    let vectors = embedder.embed_batch(&store.texts()).await?;
    if vectors.len() != store.len() {
        return Err(PatisserieError::MalformedResponse(format!(
            "embedder returned {} vectors for {} examples",
            vectors.len(),
            store.len()
        )));
    }
    let index = SimilarityIndex::build(&vectors)?;
    info!(
        examples = index.len(),
        dimensions = index.dimensions(),
        "similarity index built"
    );
    Ok(index)
}

#[async_trait]
impl IntentClassifier for RetrievalClassifier {
    fn name(&self) -> &str {
        "retrieval"
    }

    #[instrument(skip(self, message), fields(classifier = "retrieval", provider = self.provider.name()))]
    async fn classify(&self, message: &str) -> ClassificationResult {
        let examples = self.retrieve(message).await;
        let messages = self.build_messages(message, &examples);
        complete_label(self.provider.as_ref(), self.name(), &messages).await
    }
}
