//! Retrieval module - hybrid lexical + semantic retrieval with RRF fusion
//!
//! Public interface:
//! - `Retriever` for two-stage retrieval over one topic's corpus
//! - `Scorer` trait, for plugging in additional relevance signals
//! - `ScoredDocument` / `Stage` for scored results
//!
//! Scorers rank, fusion merges ranks, the reranker (see `crate::rerank`)
//! refines the coarse set.

mod engine;
mod fusion;
mod scorer;
pub mod scorers;

pub use engine::{Retriever, ScoredDocument, Stage};
pub use fusion::{rrf_fuse, Contribution, FusedDocument, QueryKind, WeightedRanking};
pub use scorer::{Ranking, Scorer};
