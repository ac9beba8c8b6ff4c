//! Lexical scorer - BM25 (Okapi) term-overlap ranking
//!
//! The index is built per call over the indexable texts; nothing is cached
//! between calls.

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::retrieval::scorer::{Ranking, Scorer};

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f32,
    /// Document-length normalisation
    pub b: f32,
    /// Floor for negative IDF, as a fraction of the average IDF
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

/// Case-folded, whitespace-delimited tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// In-memory BM25 index over one corpus
struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl Bm25Index {
    fn build(texts: &[&str], params: Bm25Params) -> Result<Self> {
        if texts.is_empty() {
            bail!("cannot build BM25 index over an empty corpus");
        }

        let mut term_freqs = Vec::with_capacity(texts.len());
        let mut doc_lens = Vec::with_capacity(texts.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for text in texts {
            let tokens = tokenize(text);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_default() += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(freqs);
        }

        let total_len: usize = doc_lens.iter().sum();
        if total_len == 0 {
            bail!("cannot build BM25 index: every document is empty");
        }
        let avg_doc_len = total_len as f32 / texts.len() as f32;

        // Okapi IDF; terms in more than half the corpus go negative and are
        // floored to epsilon * average IDF. Summed in term order so the floor
        // doesn't depend on hash iteration order.
        let mut doc_freqs: Vec<(String, usize)> = doc_freqs.into_iter().collect();
        doc_freqs.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let n = texts.len() as f32;
        let mut idf: HashMap<String, f32> = HashMap::with_capacity(doc_freqs.len());
        let mut idf_sum = 0.0f32;
        let mut negative = Vec::new();
        for (term, df) in doc_freqs {
            let df = df as f32;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        let floor = params.epsilon * idf_sum / idf.len() as f32;
        for term in negative {
            idf.insert(term, floor);
        }

        Ok(Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        })
    }

    /// BM25 score of every document for the query, by corpus position
    fn scores(&self, query: &str) -> Vec<f32> {
        let Bm25Params { k1, b, .. } = self.params;
        let query_terms = tokenize(query);

        self.term_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(freqs, &len)| {
                let norm = k1 * (1.0 - b + b * len as f32 / self.avg_doc_len);
                query_terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *freqs.get(term)? as f32;
                        let idf = self.idf.get(term).copied().unwrap_or(0.0);
                        Some(idf * tf * (k1 + 1.0) / (tf + norm))
                    })
                    .sum()
            })
            .collect()
    }
}

/// BM25 lexical scorer
#[derive(Debug, Clone, Default)]
pub struct LexicalScorer {
    params: Bm25Params,
}

impl LexicalScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Bm25Params) -> Self {
        Self { params }
    }
}

impl Scorer for LexicalScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn rank_queries(&self, queries: &[&str], texts: &[&str]) -> Result<Vec<Ranking>> {
        let index = Bm25Index::build(texts, self.params)?;
        queries
            .iter()
            .map(|query| Ranking::from_scores(self.name(), &index.scores(query)))
            .collect()
    }
}
