//! Scorer trait and ranking types for first-stage retrieval
//!
//! Scorers are internal retrieval strategies. Each one ranks the whole corpus
//! for one or more queries; fusion only ever looks at rank positions.

use anyhow::{bail, Result};

/// A full ranking of the corpus produced by one scorer for one query
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Source scorer name
    pub source: &'static str,
    /// Corpus positions, most relevant first
    pub order: Vec<usize>,
    /// Raw scorer scores, aligned with `order` (scale varies by scorer)
    pub scores: Vec<f32>,
}

impl Ranking {
    /// Build a ranking from per-document scores (indexed by corpus position)
    ///
    /// Descending score; equal scores keep corpus order. Non-finite scores
    /// mean the scorer is broken and are rejected.
    pub fn from_scores(source: &'static str, scores: &[f32]) -> Result<Self> {
        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            bail!(
                "{} scorer produced non-finite score {} for document {}",
                source,
                scores[pos],
                pos
            );
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        // Stable sort keeps corpus order among ties
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        let sorted = order.iter().map(|&i| scores[i]).collect();

        Ok(Self {
            source,
            order,
            scores: sorted,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Scorer interface - each relevance signal implements this
///
/// Implementations must not keep per-call state: one scorer serves
/// concurrent retrievals.
pub trait Scorer: Send + Sync {
    /// Scorer name for provenance tracking
    fn name(&self) -> &'static str;

    /// Rank `texts` once per query, sharing any index built over `texts`
    ///
    /// Returns one ranking per query, in query order. An `Err` means the
    /// whole signal is unavailable for this call.
    fn rank_queries(&self, queries: &[&str], texts: &[&str]) -> Result<Vec<Ranking>>;

    /// Rank `texts` for a single query
    fn rank(&self, query: &str, texts: &[&str]) -> Result<Ranking> {
        self.rank_queries(&[query], texts)?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("{} scorer returned no ranking", self.name()))
    }
}
