//! Local embeddings via fastembed-rs.

use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use super::traits::EmbeddingProvider;
use crate::error::{PatisserieError, Result};
use crate::types::Embedding;

/// Supported local embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalEmbeddingModel {
    /// paraphrase-multilingual-MiniLM-L12-v2 (384 dims, covers Turkish).
    ParaphraseMultilingualMiniLmL12V2,
    /// all-MiniLM-L6-v2 (384 dims, English only, fast).
    AllMiniLmL6V2,
}

impl LocalEmbeddingModel {
    /// Get the model name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParaphraseMultilingualMiniLmL12V2 => "paraphrase-multilingual-MiniLM-L12-v2",
            Self::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
        }
    }

    /// Look a model up by its display name.
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::ParaphraseMultilingualMiniLmL12V2, Self::AllMiniLmL6V2]
            .into_iter()
            .find(|m| m.name() == name)
    }

    /// Get the embedding dimensions.
    pub fn dimensions(&self) -> usize {
        384
    }
}

impl From<LocalEmbeddingModel> for fastembed::EmbeddingModel {
    fn from(model: LocalEmbeddingModel) -> Self {
        match model {
            LocalEmbeddingModel::ParaphraseMultilingualMiniLmL12V2 => {
                fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2
            }
            LocalEmbeddingModel::AllMiniLmL6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
        }
    }
}

/// Default model cache: `$PATISSERIE_CACHE_DIR`, else the user cache dir.
pub fn default_cache_dir() -> PathBuf {
    std::env::var("PATISSERIE_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("patisserie")
                .join("models")
        })
}

/// Local embedding provider using fastembed-rs.
///
/// The ONNX session needs `&mut` access, so calls are serialised through a lock.
pub struct FastEmbedProvider {
    model: RwLock<fastembed::TextEmbedding>,
    kind: LocalEmbeddingModel,
}

impl FastEmbedProvider {
    /// Load the model, downloading it into `cache_dir` if not cached yet.
    pub fn new(model: LocalEmbeddingModel, cache_dir: PathBuf) -> Result<Self> {
        let options = fastembed::InitOptions::new(model.into())
            .with_show_download_progress(false)
            .with_cache_dir(cache_dir);

        let model_instance = fastembed::TextEmbedding::try_new(options).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to load embedding model: {}", e))
        })?;
        info!(model = model.name(), "local embedding model loaded");

        Ok(Self {
            model: RwLock::new(model_instance),
            kind: model,
        })
    }

    pub fn model(&self) -> LocalEmbeddingModel {
        self.kind
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "fastembed"
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let texts_owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();

        let mut model = self
            .model
            .write()
            .map_err(|_| PatisserieError::DataError("embedding model lock poisoned".into()))?;
        let vectors = model
            .embed(texts_owned, None)
            .map_err(|e| PatisserieError::DataError(format!("Batch embedding failed: {}", e)))?;

        Ok(vectors
            .into_iter()
            .map(|values| Embedding::new(values, self.kind.name()))
            .collect())
    }
}
