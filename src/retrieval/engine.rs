//! Retriever - two-stage hybrid retrieval
//!
//! Stage 1: every scorer ranks the whole corpus for the event query (and each
//! option query), rankings are fused with weighted RRF into a coarse set.
//! Stage 2: the cross-encoder reorders the coarse set, then it is cut to top_k.
//!
//! Scorer and reranker failures degrade the ranking; they never fail the call.

use serde::Serialize;
use tracing::{debug, warn};

use super::fusion::{rrf_fuse, FusedDocument, QueryKind, WeightedRanking};
use super::scorer::{Ranking, Scorer};
use super::scorers::{LexicalScorer, SemanticScorer};
use crate::config::{RetrievalConfig, Settings, TextField};
use crate::embeddings::create_embedder;
use crate::error::{Result, RetrievalError};
use crate::rerank::{create_reranker, rerank, Reranker};

/// Pipeline stage that produced a document's final position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Corpus no larger than top_k, returned as-is
    Passthrough,
    /// RRF order (reranking disabled, skipped, or failed)
    Fused,
    /// Cross-encoder order
    Reranked,
    /// Every scorer failed; corpus order
    Fallback,
}

/// A retrieved document with its score
///
/// `score` is the cross-encoder score for `Reranked`, the RRF score for
/// `Fused`, and 0.0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    /// Corpus position
    pub index: usize,
    pub text: String,
    pub score: f32,
    pub stage: Stage,
}

/// Hybrid retriever over a per-topic corpus
///
/// Holds its scorers and reranker for its whole lifetime; `retrieve` takes
/// `&self` and may be called from many threads at once.
pub struct Retriever {
    config: RetrievalConfig,
    scorers: Vec<Box<dyn Scorer>>,
    reranker: Option<Box<dyn Reranker>>,
}

impl Retriever {
    /// Create a retriever from explicit parts
    pub fn new(
        config: RetrievalConfig,
        scorers: Vec<Box<dyn Scorer>>,
        reranker: Option<Box<dyn Reranker>>,
    ) -> Result<Self> {
        config.validate()?;

        if scorers.is_empty() {
            return Err(RetrievalError::InvalidConfig(
                "at least one scorer is required".into(),
            ));
        }
        if config.reranking && reranker.is_none() {
            warn!("reranking enabled but no reranker supplied; coarse order will be final");
        }

        Ok(Self {
            config,
            scorers,
            reranker,
        })
    }

    /// Create a retriever with BM25 only and no reranker
    pub fn lexical_only(config: RetrievalConfig) -> Result<Self> {
        let config = RetrievalConfig {
            reranking: false,
            ..config
        };
        Self::new(config, vec![Box::new(LexicalScorer::new())], None)
    }

    /// Create the full hybrid retriever, loading models named in settings
    ///
    /// Models are loaded once here. The cross-encoder is only loaded when
    /// reranking is enabled.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let config = settings.retrieval_config();
        config.validate()?;

        let embedder = create_embedder(&settings.models)?;
        let scorers: Vec<Box<dyn Scorer>> = vec![
            Box::new(LexicalScorer::new()),
            Box::new(SemanticScorer::new(embedder)),
        ];

        let reranker = if config.reranking {
            Some(create_reranker(&settings.models)?)
        } else {
            None
        };

        Ok(Self::new(config, scorers, reranker)?)
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Names of the configured scorers
    pub fn scorer_names(&self) -> Vec<&'static str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    /// Retrieve the top_k most relevant full documents for the event
    ///
    /// `short_texts` (title + snippet) and `full_texts` must be aligned with
    /// the corpus. `options` are only used when option weighting is enabled.
    pub fn retrieve(
        &self,
        event: &str,
        short_texts: &[String],
        full_texts: &[String],
        options: Option<&[String]>,
    ) -> Result<Vec<String>> {
        Ok(self
            .retrieve_with_scores(event, short_texts, full_texts, options)?
            .into_iter()
            .map(|doc| doc.text)
            .collect())
    }

    /// Same as `retrieve`, keeping corpus positions, scores and stage
    pub fn retrieve_with_scores(
        &self,
        event: &str,
        short_texts: &[String],
        full_texts: &[String],
        options: Option<&[String]>,
    ) -> Result<Vec<ScoredDocument>> {
        check_aligned(short_texts, full_texts)?;

        if full_texts.is_empty() {
            return Ok(Vec::new());
        }

        let top_k = self.config.top_k;
        if full_texts.len() <= top_k {
            debug!(corpus = full_texts.len(), top_k, "corpus within top_k, skipping scoring");
            return Ok(full_texts
                .iter()
                .enumerate()
                .map(|(index, text)| ScoredDocument {
                    index,
                    text: text.clone(),
                    score: 0.0,
                    stage: Stage::Passthrough,
                })
                .collect());
        }

        let texts = self.indexable_texts(short_texts, full_texts);
        let options = self.active_options(options);
        let mut candidates = self.coarse(event, &texts, options);

        // Fallback order is final; the reranker only refines a fused set
        let fused = candidates.iter().all(|c| c.2 == Stage::Fused);
        if self.config.reranking && fused && candidates.len() > top_k {
            if let Some(reranker) = &self.reranker {
                let query = rerank_query(event, options);
                let indices: Vec<usize> = candidates.iter().map(|c| c.0).collect();

                match rerank(reranker.as_ref(), &query, &indices, &texts) {
                    Ok(reranked) => {
                        candidates = reranked
                            .into_iter()
                            .map(|r| (r.index, r.score, Stage::Reranked))
                            .collect();
                    }
                    Err(e) => {
                        warn!(
                            reranker = reranker.name(),
                            error = %e,
                            "reranking failed, keeping fusion order"
                        );
                    }
                }
            }
        }

        candidates.truncate(top_k);
        Ok(candidates
            .into_iter()
            .map(|(index, score, stage)| ScoredDocument {
                index,
                text: full_texts[index].clone(),
                score,
                stage,
            })
            .collect())
    }

    /// The fused candidate set (size <= coarse_top_k) before reranking
    pub fn coarse_candidates(
        &self,
        event: &str,
        short_texts: &[String],
        full_texts: &[String],
        options: Option<&[String]>,
    ) -> Result<Vec<ScoredDocument>> {
        check_aligned(short_texts, full_texts)?;

        if full_texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts = self.indexable_texts(short_texts, full_texts);
        let options = self.active_options(options);
        Ok(self
            .coarse(event, &texts, options)
            .into_iter()
            .map(|(index, score, stage)| ScoredDocument {
                index,
                text: full_texts[index].clone(),
                score,
                stage,
            })
            .collect())
    }

    fn indexable_texts<'a>(&self, short_texts: &'a [String], full_texts: &'a [String]) -> Vec<&'a str> {
        let source = match self.config.text_field {
            TextField::Full => full_texts,
            TextField::Short => short_texts,
        };
        source.iter().map(String::as_str).collect()
    }

    /// Options that take part in this call (None when weighting is off or the list is empty)
    fn active_options<'a>(&self, options: Option<&'a [String]>) -> Option<&'a [String]> {
        if !self.config.option_weighting {
            return None;
        }
        match options {
            Some(opts) if !opts.is_empty() => Some(opts),
            Some(_) => {
                debug!("option weighting enabled but no options given, using event only");
                None
            }
            None => None,
        }
    }

    /// Stage 1: score, fuse, truncate to coarse_top_k
    ///
    /// Returns (corpus position, score, stage) in ranked order.
    fn coarse(
        &self,
        event: &str,
        texts: &[&str],
        options: Option<&[String]>,
    ) -> Vec<(usize, f32, Stage)> {
        let mut queries: Vec<&str> = vec![event];
        if let Some(opts) = options {
            queries.extend(opts.iter().map(String::as_str));
        }

        // Each scorer returns one ranking per query, in query order
        let mut rankings: Vec<(QueryKind, Ranking)> = Vec::new();
        for scorer in &self.scorers {
            let ranked = scorer
                .rank_queries(&queries, texts)
                .and_then(|per_query| check_rankings(per_query, queries.len(), texts.len()));
            match ranked {
                Ok(per_query) => {
                    for (i, ranking) in per_query.into_iter().enumerate() {
                        let kind = if i == 0 {
                            QueryKind::Event
                        } else {
                            QueryKind::Option(i - 1)
                        };
                        rankings.push((kind, ranking));
                    }
                }
                Err(e) => {
                    warn!(
                        scorer = scorer.name(),
                        error = %e,
                        "scorer failed, excluding it from fusion"
                    );
                }
            }
        }

        let limit = self.config.coarse_top_k;
        if rankings.is_empty() {
            warn!(limit, "all scorers failed, falling back to corpus order");
            return (0..texts.len().min(limit))
                .map(|index| (index, 0.0, Stage::Fallback))
                .collect();
        }

        let weighted: Vec<WeightedRanking<'_>> = rankings
            .iter()
            .map(|(query, ranking)| WeightedRanking {
                ranking,
                query: *query,
                weight: match query {
                    QueryKind::Event => self.config.event_weight,
                    QueryKind::Option(_) => self.config.option_weight,
                },
            })
            .collect();

        let fused: Vec<FusedDocument> = rrf_fuse(&weighted, self.config.rrf_k, limit);
        debug!(
            rankings = weighted.len(),
            candidates = fused.len(),
            "fusion complete"
        );

        fused
            .into_iter()
            .map(|doc| (doc.index, doc.fused_score, Stage::Fused))
            .collect()
    }
}

/// Reject scorer output that skips a query or ranks a position outside the corpus
fn check_rankings(
    per_query: Vec<Ranking>,
    queries: usize,
    corpus: usize,
) -> anyhow::Result<Vec<Ranking>> {
    if per_query.len() != queries {
        anyhow::bail!("returned {} rankings for {} queries", per_query.len(), queries);
    }
    for ranking in &per_query {
        if let Some(&index) = ranking.order.iter().find(|&&index| index >= corpus) {
            anyhow::bail!("ranked position {} in a corpus of {}", index, corpus);
        }
    }
    Ok(per_query)
}

fn check_aligned(short_texts: &[String], full_texts: &[String]) -> Result<()> {
    if short_texts.len() != full_texts.len() {
        return Err(RetrievalError::MisalignedCorpus {
            short: short_texts.len(),
            full: full_texts.len(),
        });
    }
    Ok(())
}

/// Query handed to the cross-encoder: the event, or event + all options
fn rerank_query(event: &str, options: Option<&[String]>) -> String {
    match options {
        Some(opts) => {
            let mut query = event.to_string();
            for opt in opts {
                query.push(' ');
                query.push_str(opt);
            }
            query
        }
        None => event.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(n: usize) -> (Vec<String>, Vec<String>) {
        let full: Vec<String> = (0..n).map(|i| format!("full document {}", i)).collect();
        let short: Vec<String> = (0..n).map(|i| format!("short {}", i)).collect();
        (short, full)
    }

    fn config(top_k: usize, coarse_top_k: usize) -> RetrievalConfig {
        RetrievalConfig {
            top_k,
            coarse_top_k,
            reranking: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_rerank_query_concatenates_options() {
        let options = vec!["option a".to_string(), "option b".to_string()];
        assert_eq!(
            rerank_query("event", Some(options.as_slice())),
            "event option a option b"
        );
        assert_eq!(rerank_query("event", None), "event");
    }

    fn ranking(order: Vec<usize>) -> Ranking {
        let scores = vec![0.0; order.len()];
        Ranking {
            source: "test",
            order,
            scores,
        }
    }

    #[test]
    fn test_check_rankings_requires_one_per_query() {
        let err = check_rankings(vec![ranking(vec![0, 1])], 3, 2).unwrap_err();
        assert!(err.to_string().contains("1 rankings for 3 queries"));
        assert!(check_rankings(vec![ranking(vec![1, 0])], 1, 2).is_ok());
    }

    #[test]
    fn test_check_rankings_rejects_out_of_corpus_positions() {
        let err = check_rankings(vec![ranking(vec![0, 5])], 1, 2).unwrap_err();
        assert!(err.to_string().contains("position 5"));
    }

    #[test]
    fn test_empty_corpus() {
        let retriever = Retriever::lexical_only(config(3, 5)).unwrap();
        let docs = retriever.retrieve("event", &[], &[], None).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_small_corpus_passthrough() {
        let retriever = Retriever::lexical_only(config(3, 5)).unwrap();
        let (short, full) = corpus(3);
        let docs = retriever
            .retrieve_with_scores("document 2", &short, &full, None)
            .unwrap();
        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        assert_eq!(texts, full);
        assert!(docs.iter().all(|d| d.stage == Stage::Passthrough));
    }

    #[test]
    fn test_misaligned_corpus_rejected() {
        let retriever = Retriever::lexical_only(config(3, 5)).unwrap();
        let (short, full) = corpus(4);
        let err = retriever
            .retrieve("event", &short[..3], &full, None)
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::MisalignedCorpus { short: 3, full: 4 }
        ));
    }

    #[test]
    fn test_misaligned_small_corpus_still_rejected() {
        let retriever = Retriever::lexical_only(config(10, 10)).unwrap();
        let (short, full) = corpus(2);
        assert!(retriever.retrieve("event", &short[..1], &full, None).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Retriever::lexical_only(config(5, 4)).is_err());
        assert!(Retriever::lexical_only(config(0, 4)).is_err());
    }

    #[test]
    fn test_no_scorers_rejected() {
        assert!(Retriever::new(config(1, 1), Vec::new(), None).is_err());
    }

    #[test]
    fn test_returns_full_text_when_indexing_short() {
        let retriever = Retriever::lexical_only(config(1, 2)).unwrap();
        let short = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let full = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let docs = retriever.retrieve("gamma", &short, &full, None).unwrap();
        assert_eq!(docs, vec!["C".to_string()]);
    }

    #[test]
    fn test_full_content_mode_indexes_full_text() {
        let cfg = RetrievalConfig {
            text_field: TextField::Full,
            ..config(1, 2)
        };
        let retriever = Retriever::lexical_only(cfg).unwrap();
        let short = vec!["gamma".to_string(), "x".to_string(), "y".to_string()];
        let full = vec!["one".to_string(), "two".to_string(), "gamma three".to_string()];
        let docs = retriever.retrieve("gamma", &short, &full, None).unwrap();
        assert_eq!(docs, vec!["gamma three".to_string()]);
    }

    #[test]
    fn test_options_ignored_when_weighting_disabled() {
        let cfg = RetrievalConfig {
            option_weighting: false,
            ..config(1, 3)
        };
        let retriever = Retriever::lexical_only(cfg).unwrap();
        let (short, full) = corpus(4);
        let options = vec!["3".to_string()];
        let with = retriever
            .coarse_candidates("short 1", &short, &full, Some(options.as_slice()))
            .unwrap();
        let without = retriever
            .coarse_candidates("short 1", &short, &full, None)
            .unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_lexical_only_disables_reranking() {
        let retriever = Retriever::lexical_only(RetrievalConfig::default()).unwrap();
        assert!(!retriever.config().reranking);
        assert_eq!(retriever.scorer_names(), vec!["lexical"]);
    }
}
