//! Semantic scorer - dense embeddings + cosine similarity

use anyhow::{bail, Result};

use crate::embeddings::{dot_product, EmbeddingEngine};
use crate::retrieval::scorer::{Ranking, Scorer};

pub struct SemanticScorer {
    embedder: Box<dyn EmbeddingEngine>,
}

impl SemanticScorer {
    pub fn new(embedder: Box<dyn EmbeddingEngine>) -> Self {
        Self { embedder }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn check_dimension(&self, vec: &[f32], what: &str) -> Result<()> {
        let expected = self.embedder.dimension();
        if vec.len() != expected {
            bail!(
                "{} embedding has {} dims, model '{}' declares {}",
                what,
                vec.len(),
                self.embedder.model_name(),
                expected
            );
        }
        Ok(())
    }
}

impl Scorer for SemanticScorer {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn rank_queries(&self, queries: &[&str], texts: &[&str]) -> Result<Vec<Ranking>> {
        // Documents are batch-encoded once and shared by every query
        let doc_vecs = self.embedder.embed_passages(texts)?;
        if doc_vecs.len() != texts.len() {
            bail!(
                "Embedder returned {} vectors for {} documents",
                doc_vecs.len(),
                texts.len()
            );
        }
        for vec in &doc_vecs {
            self.check_dimension(vec, "Document")?;
        }

        queries
            .iter()
            .map(|query| {
                let query_vec = self.embedder.embed_query(query)?;
                self.check_dimension(&query_vec, "Query")?;

                // Vectors are L2-normalized: dot product is cosine similarity
                let scores: Vec<f32> = doc_vecs
                    .iter()
                    .map(|doc_vec| dot_product(&query_vec, doc_vec))
                    .collect();
                Ranking::from_scores(self.name(), &scores)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::l2_normalize;

    /// Bag-of-letters embedder: counts a..z, normalized
    struct LetterEmbedder {
        dimension: usize,
    }

    impl EmbeddingEngine for LetterEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vec = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                vec[(c as u8 - b'a') as usize] += 1.0;
            }
            l2_normalize(&mut vec);
            vec.truncate(self.dimension);
            Ok(vec)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            26
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    struct FailingEmbedder;

    impl EmbeddingEngine for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            bail!("device lost")
        }

        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            bail!("device lost")
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_rank_by_similarity() {
        let scorer = SemanticScorer::new(Box::new(LetterEmbedder { dimension: 26 }));
        let ranking = scorer.rank("aaa", &["zzz", "aab", "abc"]).unwrap();
        assert_eq!(ranking.order, vec![1, 2, 0]);
        assert!(ranking.scores[0] <= 1.0 + 1e-6);
        assert_eq!(ranking.source, "semantic");
    }

    #[test]
    fn test_identical_text_scores_one() {
        let scorer = SemanticScorer::new(Box::new(LetterEmbedder { dimension: 26 }));
        let ranking = scorer.rank("ash cloud", &["ash cloud", "flights"]).unwrap();
        assert_eq!(ranking.order[0], 0);
        approx::assert_relative_eq!(ranking.scores[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_model_failure_is_error() {
        let scorer = SemanticScorer::new(Box::new(FailingEmbedder));
        let err = scorer.rank("q", &["a", "b"]).unwrap_err();
        assert!(err.to_string().contains("device lost"));
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let scorer = SemanticScorer::new(Box::new(LetterEmbedder { dimension: 10 }));
        let err = scorer.rank("q", &["a"]).unwrap_err();
        assert!(err.to_string().contains("declares 26"));
    }
}
