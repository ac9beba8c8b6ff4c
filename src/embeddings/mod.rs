//! Embeddings module - dense vectors for queries and documents
//!
//! Provides trait-based abstraction for embedding generation with ONNX backend.
//! The model is selected via the `[models]` settings section and loaded once.

mod onnx;
mod similarity;

pub use onnx::OnnxEmbedder;
pub use similarity::{dot_product, l2_normalize};

use anyhow::Result;

use crate::config::ModelsSection;
use crate::models::{resolve_model_files, ModelKind, ModelRegistry};

/// Trait for embedding generation engines
///
/// Shared read-only across concurrent retrievals, hence `&self` + `Sync`.
/// Implementations must return L2-normalized vectors.
pub trait EmbeddingEngine: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch processing)
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a query text (with model-specific prefix if needed)
    ///
    /// For symmetric models this is identical to embed().
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }

    /// Generate embeddings for passages (with model-specific prefix if needed)
    fn embed_passages(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }

    /// Get embedding dimension (e.g., 384 for all-MiniLM-L6-v2)
    fn dimension(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Create the configured embedder
///
/// Fails if the model is unknown, not an embedding model, or its files are missing.
pub fn create_embedder(models: &ModelsSection) -> Result<Box<dyn EmbeddingEngine>> {
    let registry = ModelRegistry::load()?;
    let model_def = registry.get_model_of_kind(&models.embedding, ModelKind::Embedding)?;
    let files = resolve_model_files(&models.dir, &models.embedding)?;

    Ok(Box::new(OnnxEmbedder::new_from_paths(
        &files.model,
        &files.tokenizer,
        &models.embedding,
        model_def,
        models.use_accelerated_device,
    )?))
}
