//! Reciprocal Rank Fusion (RRF) for combining ranked lists
//!
//! BM25 and cosine scores live on different scales; rank position is the only
//! quantity comparable across scorers. k=60 is the standard value from the
//! original paper (Cormack et al., 2009).

use std::collections::HashMap;

use super::scorer::Ranking;

/// Which query a ranking was produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// The target event description
    Event,
    /// Candidate option, by position in the options list
    Option(usize),
}

/// One ranking with its fusion weight
#[derive(Debug, Clone, Copy)]
pub struct WeightedRanking<'a> {
    pub ranking: &'a Ranking,
    pub query: QueryKind,
    pub weight: f32,
}

/// Per-ranking contribution to a fused document
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Scorer that produced the ranking
    pub source: &'static str,
    /// Query the ranking was produced for
    pub query: QueryKind,
    /// Rank within that ranking (1-indexed)
    pub rank: usize,
    /// Raw score from the scorer (scale varies by scorer)
    pub raw_score: f32,
}

/// Fused document with combined score and provenance
#[derive(Debug, Clone, PartialEq)]
pub struct FusedDocument {
    /// Corpus position
    pub index: usize,
    pub fused_score: f32,
    pub contributions: Vec<Contribution>,
}

/// Weighted Reciprocal Rank Fusion
///
/// Score for document d = Σ weight_i / (k + rank_i) over each ranking i
/// containing d, rank 1-indexed. Documents missing from a ranking get
/// nothing from it. Equal fused scores keep first-seen order across the
/// input rankings. Output is truncated to `limit`.
pub fn rrf_fuse(rankings: &[WeightedRanking<'_>], k: usize, limit: usize) -> Vec<FusedDocument> {
    let mut scores: HashMap<usize, f32> = HashMap::new();
    let mut contributions: HashMap<usize, Vec<Contribution>> = HashMap::new();
    let mut first_seen: Vec<usize> = Vec::new();

    for weighted in rankings {
        let ranking = weighted.ranking;
        for (rank, (&index, &raw_score)) in ranking.order.iter().zip(&ranking.scores).enumerate() {
            // rank is 0-indexed, so rank 0 -> weight/(k+1)
            let rrf_score = weighted.weight / (k + rank + 1) as f32;

            let entry = scores.entry(index).or_insert_with(|| {
                first_seen.push(index);
                0.0
            });
            *entry += rrf_score;

            contributions.entry(index).or_default().push(Contribution {
                source: ranking.source,
                query: weighted.query,
                rank: rank + 1,
                raw_score,
            });
        }
    }

    let mut fused: Vec<FusedDocument> = first_seen
        .into_iter()
        .map(|index| FusedDocument {
            index,
            fused_score: scores[&index],
            contributions: contributions.remove(&index).unwrap_or_default(),
        })
        .collect();

    // Stable sort by fused score descending
    fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));
    fused.truncate(limit);
    fused
}
