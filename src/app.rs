//! Application wiring: one assistant per completion backend.
//!
//! The [`Registry`] is built once at startup and passed around by handle.
//! Groq is paired with the retrieval classifier, Mistral with the static
//! few-shot classifier; both reply through the same [`DialogueResponder`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::{IntentClassifier, RetrievalClassifier, StaticFewShotClassifier};
use crate::config::{Config, Secrets};
use crate::dialogue::DialogueResponder;
use crate::evaluate::{EvaluationReport, Evaluator};
use crate::providers::{
    CompletionProvider, EmbeddingProvider, GroqClient, HuggingFaceEmbedder, MistralClient, groq,
    mistral, wire,
};
use crate::store::{ExampleStore, ExampleTable, INTENT_COLUMN, TEXT_COLUMN};
use crate::types::{ChatReply, ClassificationResult, ConversationTurn, Label, LabeledExample};
use crate::{PatisserieError, Result};

/// Completion backend an assistant runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Groq,
    Mistral,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Groq, Backend::Mistral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Groq => "groq",
            Backend::Mistral => "mistral",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = PatisserieError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Backend::Groq),
            "mistral" => Ok(Backend::Mistral),
            other => Err(PatisserieError::InvalidInput(format!(
                "unknown backend '{other}' (expected groq or mistral)"
            ))),
        }
    }
}

/// Classifier and responder for one backend.
pub struct Assistant {
    backend: Backend,
    classifier: Arc<dyn IntentClassifier>,
    responder: DialogueResponder,
    evaluation_delay: Duration,
}

impl Assistant {
    pub fn new(
        backend: Backend,
        classifier: Arc<dyn IntentClassifier>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            backend,
            responder: DialogueResponder::new(classifier.clone(), provider),
            classifier,
            evaluation_delay: Evaluator::DEFAULT_DELAY,
        }
    }

    pub fn with_evaluation_delay(mut self, delay: Duration) -> Self {
        self.evaluation_delay = delay;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn classifier(&self) -> &Arc<dyn IntentClassifier> {
        &self.classifier
    }

    pub async fn predict_intent(&self, message: &str) -> Label {
        self.classifier.predict_intent(message).await
    }

    pub async fn classify(&self, message: &str) -> ClassificationResult {
        self.classifier.classify(message).await
    }

    pub async fn chat(&self, message: &str, history: &[ConversationTurn]) -> ChatReply {
        self.responder.chat(message, history).await
    }

    pub async fn evaluate(&self, test_examples: &[LabeledExample]) -> EvaluationReport {
        Evaluator::new(self.classifier.clone())
            .with_name(self.backend.as_str())
            .with_delay(self.evaluation_delay)
            .evaluate(test_examples)
            .await
    }
}

/// The assistants of a running application, one per [`Backend`].
pub struct Registry {
    groq: Assistant,
    mistral: Assistant,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build remote clients from configuration and load the training set.
    ///
    /// A missing training file starts both assistants without examples, so
    /// they classify zero-shot. A file that exists but cannot be read or
    /// parsed is an error.
    ///
    /// Missing API keys are not an error here; affected calls report
    /// `missing_credential` instead.
    pub async fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let http = wire::http_client(config.http.timeout_secs)?;
        let providers = &config.providers;

        let groq_client = match &providers.groq.base_url {
            Some(url) => GroqClient::with_base_url(secrets.api_key("groq"), url),
            None => GroqClient::new(secrets.api_key("groq")),
        }
        .with_model(providers.groq.model_or(groq::DEFAULT_MODEL))
        .with_http_client(http.clone());

        let mistral_client = match &providers.mistral.base_url {
            Some(url) => MistralClient::with_base_url(secrets.api_key("mistral"), url),
            None => MistralClient::new(secrets.api_key("mistral")),
        }
        .with_model(providers.mistral.model_or(mistral::DEFAULT_MODEL))
        .with_http_client(http.clone());

        let embedder = match &providers.local {
            Some(local) => local_embedder(local),
            None => None,
        }
        .unwrap_or_else(|| {
            let hf = &providers.huggingface;
            let embedder = match &hf.base_url {
                Some(url) => HuggingFaceEmbedder::with_base_url(secrets.api_key("huggingface"), url),
                None => HuggingFaceEmbedder::new(secrets.api_key("huggingface")),
            }
            .with_model(&hf.embedding_model)
            .with_http_client(http);
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);
            embedder
        });

        let train_path = &config.data.train_path;
        let table = if train_path.exists() {
            ExampleTable::from_json_path(train_path)?
        } else {
            warn!(path = %train_path.display(), "training data not found; starting without examples");
            ExampleTable::new([TEXT_COLUMN, INTENT_COLUMN])
        };

        let mut builder = Self::builder()
            .groq(Arc::new(groq_client))
            .mistral(Arc::new(mistral_client))
            .embedder(embedder)
            .training_data(table)
            .top_k(config.classifier.top_k)
            .samples_per_intent(config.classifier.samples_per_intent)
            .evaluation_delay(config.evaluation.delay());
        if let Some(seed) = config.classifier.seed {
            builder = builder.seed(seed);
        }
        builder.build().await
    }

    pub fn get(&self, backend: Backend) -> &Assistant {
        match backend {
            Backend::Groq => &self.groq,
            Backend::Mistral => &self.mistral,
        }
    }

    pub fn assistants(&self) -> impl Iterator<Item = &Assistant> {
        Backend::ALL.into_iter().map(|b| self.get(b))
    }

    /// Evaluate every backend on the same test set, one after the other.
    pub async fn compare(&self, test_examples: &[LabeledExample]) -> Vec<EvaluationReport> {
        let mut reports = Vec::with_capacity(Backend::ALL.len());
        for assistant in self.assistants() {
            reports.push(assistant.evaluate(test_examples).await);
        }
        reports
    }
}

#[cfg(feature = "local-inference")]
fn local_embedder(local: &crate::config::LocalConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    use crate::providers::{FastEmbedProvider, LocalEmbeddingModel, fastembed};

    let Some(model) = LocalEmbeddingModel::from_name(&local.model) else {
        warn!(model = %local.model, "unknown local embedding model; using HuggingFace");
        return None;
    };
    let cache_dir = local
        .cache_dir
        .clone()
        .unwrap_or_else(fastembed::default_cache_dir);
    match FastEmbedProvider::new(model, cache_dir) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "local embedder unavailable; using HuggingFace");
            None
        }
    }
}

#[cfg(not(feature = "local-inference"))]
fn local_embedder(_local: &crate::config::LocalConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    warn!("[providers.local] requires the local-inference feature; using HuggingFace");
    None
}

/// Builder for [`Registry`].
pub struct RegistryBuilder {
    groq: Option<Arc<dyn CompletionProvider>>,
    mistral: Option<Arc<dyn CompletionProvider>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    training_data: Option<ExampleTable>,
    top_k: usize,
    samples_per_intent: usize,
    seed: Option<u64>,
    evaluation_delay: Duration,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            groq: None,
            mistral: None,
            embedder: None,
            training_data: None,
            top_k: RetrievalClassifier::DEFAULT_TOP_K,
            samples_per_intent: StaticFewShotClassifier::DEFAULT_SAMPLES_PER_INTENT,
            seed: None,
            evaluation_delay: Evaluator::DEFAULT_DELAY,
        }
    }

    /// Completion backend for the retrieval assistant.
    pub fn groq(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.groq = Some(provider);
        self
    }

    /// Completion backend for the static few-shot assistant.
    pub fn mistral(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.mistral = Some(provider);
        self
    }

    /// Embedder for retrieval; without one the Groq assistant runs zero-shot.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Labeled examples for retrieval and few-shot sampling.
    pub fn training_data(mut self, table: ExampleTable) -> Self {
        self.training_data = Some(table);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn samples_per_intent(mut self, n: usize) -> Self {
        self.samples_per_intent = n;
        self
    }

    /// Make few-shot sampling reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn evaluation_delay(mut self, delay: Duration) -> Self {
        self.evaluation_delay = delay;
        self
    }

    /// Index the training data and assemble both assistants.
    ///
    /// Fails only on missing pieces or unusable training data; an embedder
    /// that cannot index the store leaves retrieval disabled.
    pub async fn build(self) -> Result<Registry> {
        let groq = self.groq.ok_or_else(|| {
            PatisserieError::Configuration("no completion provider set for groq".into())
        })?;
        let mistral = self.mistral.ok_or_else(|| {
            PatisserieError::Configuration("no completion provider set for mistral".into())
        })?;
        let mut table = self.training_data.ok_or_else(|| {
            PatisserieError::Configuration("no training data set".into())
        })?;
        table.canonicalize_columns();

        let store = ExampleStore::from_table(table.clone())?;
        let retrieval = RetrievalClassifier::new(groq.clone(), self.embedder, store)
            .await
            .with_top_k(self.top_k);

        let few_shot = match self.seed {
            Some(seed) => StaticFewShotClassifier::with_sampling(
                mistral.clone(),
                &table,
                self.samples_per_intent,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => StaticFewShotClassifier::with_sampling(
                mistral.clone(),
                &table,
                self.samples_per_intent,
                &mut rand::thread_rng(),
            ),
        };

        info!(
            retrieval = retrieval.has_retrieval(),
            top_k = self.top_k,
            "assistants ready"
        );

        let delay = self.evaluation_delay;
        Ok(Registry {
            groq: Assistant::new(Backend::Groq, Arc::new(retrieval), groq).with_evaluation_delay(delay),
            mistral: Assistant::new(Backend::Mistral, Arc::new(few_shot), mistral)
                .with_evaluation_delay(delay),
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
