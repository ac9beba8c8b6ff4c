//! Second-stage reranking
//!
//! A cross-encoder scores each (query, document) pair jointly. It is far more
//! expensive per pair than the first-stage scorers, so it only ever sees the
//! fused coarse candidate set.

mod cross_encoder;

pub use cross_encoder::CrossEncoder;

use anyhow::{bail, Result};

use crate::config::ModelsSection;
use crate::models::{resolve_model_files, ModelKind, ModelRegistry};

/// Pairwise relevance model
pub trait Reranker: Send + Sync {
    /// Reranker name for provenance tracking
    fn name(&self) -> &str;

    /// Score each document against the query, one score per document, same order
    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>>;
}

/// A candidate after reranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reranked {
    /// Corpus position
    pub index: usize,
    /// Cross-encoder relevance score
    pub score: f32,
}

/// Reorder candidates by descending reranker score
///
/// `candidates` are corpus positions in fusion order; `texts` is the full
/// indexable text list. Ties keep fusion order. Any failure (model error,
/// wrong score count, non-finite score) is returned as `Err` so the caller
/// can keep the fusion order; the output is always a permutation of the input.
pub fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    candidates: &[usize],
    texts: &[&str],
) -> Result<Vec<Reranked>> {
    let documents: Vec<&str> = candidates.iter().map(|&i| texts[i]).collect();
    let scores = reranker.score(query, &documents)?;

    if scores.len() != candidates.len() {
        bail!(
            "Reranker '{}' returned {} scores for {} candidates",
            reranker.name(),
            scores.len(),
            candidates.len()
        );
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        bail!("Reranker '{}' returned non-finite score {}", reranker.name(), bad);
    }

    let mut reranked: Vec<Reranked> = candidates
        .iter()
        .zip(scores)
        .map(|(&index, score)| Reranked { index, score })
        .collect();

    // Stable sort: equal scores keep fusion order
    reranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(reranked)
}

/// Create the configured cross-encoder
pub fn create_reranker(models: &ModelsSection) -> Result<Box<dyn Reranker>> {
    let registry = ModelRegistry::load()?;
    let model_def = registry.get_model_of_kind(&models.reranker, ModelKind::CrossEncoder)?;
    let files = resolve_model_files(&models.dir, &models.reranker)?;

    Ok(Box::new(CrossEncoder::new_from_paths(
        &files.model,
        &files.tokenizer,
        &models.reranker,
        model_def.max_length,
        models.use_accelerated_device,
    )?))
}
