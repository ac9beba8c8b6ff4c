//! ONNX Runtime embedder (mean-pooled sentence-transformer models)

use super::{l2_normalize, EmbeddingEngine};
use crate::models::ModelDefinition;
use crate::runtime::{build_session, load_tokenizer, takes_token_types, BatchInputs};
use anyhow::{anyhow, bail, Context, Result};
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tokenizers::Tokenizer;

/// Texts per inference call when batch-encoding documents
const BATCH_SIZE: usize = 32;

/// ONNX-based embedding generator
///
/// The session needs exclusive access per run; the mutex serialises
/// inference so one embedder can serve concurrent retrievals.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    model_name: String,
    /// Graph declares a `token_type_ids` input
    token_types: bool,
    query_prefix: Option<String>,
    passage_prefix: Option<String>,
}

impl OnnxEmbedder {
    /// Create a new ONNX embedder from model/tokenizer paths
    ///
    /// # Arguments
    /// * `model_path` - Path to ONNX model file
    /// * `tokenizer_path` - Path to tokenizer.json file
    /// * `model_name` - Registry name (e.g., "bge-small-en-v1-5")
    /// * `model_def` - Registry entry (dimension, prefixes, token limit)
    /// * `accelerated` - Register the CUDA execution provider
    pub fn new_from_paths(
        model_path: &Path,
        tokenizer_path: &Path,
        model_name: &str,
        model_def: &ModelDefinition,
        accelerated: bool,
    ) -> Result<Self> {
        let dimension = model_def
            .dimensions
            .ok_or_else(|| anyhow!("Model '{}' has no embedding dimension", model_name))?;

        let session = build_session(model_path, accelerated)?;
        let tokenizer = load_tokenizer(tokenizer_path, model_def.max_length)?;

        let token_types = takes_token_types(&session);

        Ok(Self {
            token_types,
            session: Mutex::new(session),
            tokenizer,
            dimension,
            model_name: model_name.to_string(),
            query_prefix: model_def.query_prefix.clone(),
            passage_prefix: model_def.passage_prefix.clone(),
        })
    }

    /// Run one padded batch through the model, returning normalized embeddings
    fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true) // Add special tokens ([CLS], [SEP])
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let batch = BatchInputs::from_encodings(&encodings)?;
        let (batch_size, seq_len) = (batch.batch_size(), batch.seq_len());
        let attention_mask = batch.attention_mask.clone();
        let inputs = batch.into_session_inputs(self.token_types)?;

        let mut session = self.session.lock();
        let outputs = session.run(inputs).context("ONNX inference failed")?;

        // Shape is [batch_size, seq_len, hidden_dim]
        let (shape, data) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract last_hidden_state tensor")?;

        let shape_dims = shape.as_ref();
        if shape_dims.len() != 3 {
            bail!("Expected 3D tensor, got shape: {:?}", shape_dims);
        }
        let hidden_dim = shape_dims[2] as usize;
        if shape_dims[0] as usize != batch_size || shape_dims[1] as usize != seq_len {
            bail!(
                "Output shape {:?} does not match input batch [{}, {}]",
                shape_dims,
                batch_size,
                seq_len
            );
        }
        if hidden_dim != self.dimension {
            bail!(
                "Model '{}' produced {} dims, registry says {}",
                self.model_name,
                hidden_dim,
                self.dimension
            );
        }

        // Mean pooling - average token embeddings weighted by attention mask
        let mut embeddings = Vec::with_capacity(batch_size);
        for row in 0..batch_size {
            let mut pooled = vec![0.0f32; hidden_dim];
            let mut mask_sum = 0.0f32;
            for token in 0..seq_len {
                if attention_mask[[row, token]] != 1 {
                    continue;
                }
                mask_sum += 1.0;
                let offset = (row * seq_len + token) * hidden_dim;
                for (acc, value) in pooled.iter_mut().zip(&data[offset..offset + hidden_dim]) {
                    *acc += value;
                }
            }

            if mask_sum > 0.0 {
                for x in pooled.iter_mut() {
                    *x /= mask_sum;
                }
            }
            l2_normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }

    fn with_prefix(prefix: &Option<String>, text: &str) -> String {
        match prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text.to_string(),
        }
    }
}

impl EmbeddingEngine for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_chunk(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("Model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            embeddings.extend(self.embed_chunk(chunk)?);
        }
        Ok(embeddings)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&Self::with_prefix(&self.query_prefix, text))
    }

    fn embed_passages(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.passage_prefix.is_none() {
            return self.embed_batch(texts);
        }
        let prefixed: Vec<String> = texts
            .iter()
            .map(|t| Self::with_prefix(&self.passage_prefix, t))
            .collect();
        let refs: Vec<&str> = prefixed.iter().map(String::as_str).collect();
        self.embed_batch(&refs)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
