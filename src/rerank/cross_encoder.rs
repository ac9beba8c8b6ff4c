//! ONNX cross-encoder (query, document) relevance scorer

use super::Reranker;
use crate::runtime::{build_session, load_tokenizer, takes_token_types, BatchInputs};
use anyhow::{anyhow, bail, Context, Result};
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tokenizers::Tokenizer;

/// Pairs per inference call
const BATCH_SIZE: usize = 16;

/// Cross-encoder with a single relevance logit per pair
/// (ms-marco MiniLM, bge-reranker). For two-logit heads the last column is used.
pub struct CrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
    /// Graph declares a `token_type_ids` input
    token_types: bool,
}

impl CrossEncoder {
    pub fn new_from_paths(
        model_path: &Path,
        tokenizer_path: &Path,
        model_name: &str,
        max_length: usize,
        accelerated: bool,
    ) -> Result<Self> {
        let session = build_session(model_path, accelerated)?;
        let tokenizer = load_tokenizer(tokenizer_path, max_length)?;

        let token_types = takes_token_types(&session);

        Ok(Self {
            token_types,
            session: Mutex::new(session),
            tokenizer,
            model_name: model_name.to_string(),
        })
    }

    fn score_chunk(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let pairs: Vec<(&str, &str)> = documents.iter().map(|doc| (query, *doc)).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow!("Pair tokenization failed: {}", e))?;

        let batch = BatchInputs::from_encodings(&encodings)?;
        let batch_size = batch.batch_size();
        let inputs = batch.into_session_inputs(self.token_types)?;

        let mut session = self.session.lock();
        let outputs = session.run(inputs).context("Cross-encoder inference failed")?;

        // Shape is [batch_size, num_labels]
        let (shape, data) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits tensor")?;

        let shape_dims = shape.as_ref();
        if shape_dims.len() != 2 || shape_dims[0] as usize != batch_size {
            bail!(
                "Expected logits of shape [{}, n], got: {:?}",
                batch_size,
                shape_dims
            );
        }
        let num_labels = shape_dims[1] as usize;
        if num_labels == 0 {
            bail!("Cross-encoder produced no logits");
        }

        Ok((0..batch_size)
            .map(|row| data[row * num_labels + num_labels - 1])
            .collect())
    }
}

impl Reranker for CrossEncoder {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(documents.len());
        for chunk in documents.chunks(BATCH_SIZE) {
            scores.extend(self.score_chunk(query, chunk)?);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_files() {
        let result = CrossEncoder::new_from_paths(
            Path::new("/nonexistent/model.onnx"),
            Path::new("/nonexistent/tokenizer.json"),
            "ms-marco-minilm-l6-v2",
            512,
            false,
        );
        assert!(result.is_err());
    }
}
