//! ONNX Runtime plumbing shared by the embedder and the cross-encoder
//!
//! Session construction (with optional CUDA execution provider), tokenizer
//! loading, and packing tokenizer encodings into `[batch, seq]` tensors.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::path::Path;
use tokenizers::{Encoding, PaddingParams, Tokenizer, TruncationParams};

/// Load an ONNX model into a session
///
/// With `accelerated`, the CUDA execution provider is registered first.
/// ONNX Runtime falls back to CPU if CUDA is unavailable.
pub(crate) fn build_session(model_path: &Path, accelerated: bool) -> Result<Session> {
    if !model_path.exists() {
        bail!("ONNX model not found at: {}", model_path.display());
    }

    let mut builder = Session::builder().context("Failed to create ONNX session builder")?;

    if accelerated {
        builder = builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to register CUDA execution provider")?;
    }

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model: {}", model_path.display()))
}

/// Whether the model graph takes a `token_type_ids` input
///
/// BERT-family exports do; RoBERTa/XLM-R exports (e.g. bge-reranker) don't,
/// and ONNX Runtime rejects inputs the graph doesn't declare.
pub(crate) fn takes_token_types(session: &Session) -> bool {
    declares_token_types(session.inputs.iter().map(|input| input.name.as_str()))
}

fn declares_token_types<'a>(mut names: impl Iterator<Item = &'a str>) -> bool {
    names.any(|name| name == "token_type_ids")
}

/// Load a tokenizer with truncation and batch padding enabled
pub(crate) fn load_tokenizer(tokenizer_path: &Path, max_length: usize) -> Result<Tokenizer> {
    if !tokenizer_path.exists() {
        bail!("Tokenizer not found at: {}", tokenizer_path.display());
    }

    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

    // Inputs past the model's position limit break broadcasting in the graph
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

    // Pad every batch to its longest member
    tokenizer.with_padding(Some(PaddingParams::default()));

    Ok(tokenizer)
}

/// Model inputs for one batch: input_ids, attention_mask, token_type_ids
pub(crate) struct BatchInputs {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl BatchInputs {
    /// Pack encodings into `[batch, seq]` arrays, zero-padding ragged rows
    pub fn from_encodings(encodings: &[Encoding]) -> Result<Self> {
        let batch = encodings.len();
        let seq_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
        if batch > 0 && seq_len == 0 {
            bail!("Tokenizer produced empty encodings");
        }

        let mut input_ids = Array2::<i64>::zeros((batch, seq_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, seq_len));
        let mut token_type_ids = Array2::<i64>::zeros((batch, seq_len));

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for col in 0..ids.len() {
                input_ids[[row, col]] = ids[col] as i64;
                attention_mask[[row, col]] = mask[col] as i64;
                token_type_ids[[row, col]] = types[col] as i64;
            }
        }

        Ok(Self {
            input_ids,
            attention_mask,
            token_type_ids,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }

    /// Named session inputs; `token_type_ids` only when the graph takes it
    pub fn into_session_inputs(
        self,
        token_types: bool,
    ) -> Result<Vec<(&'static str, SessionInputValue<'static>)>> {
        let mut inputs: Vec<(&'static str, SessionInputValue<'static>)> = vec![
            ("input_ids", Value::from_array(self.input_ids)?.into()),
            ("attention_mask", Value::from_array(self.attention_mask)?.into()),
        ];
        if token_types {
            inputs.push(("token_type_ids", Value::from_array(self.token_type_ids)?.into()));
        }
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = build_session(Path::new("/nonexistent/model.onnx"), false).unwrap_err();
        assert!(err.to_string().contains("ONNX model not found"));
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let err = load_tokenizer(Path::new("/nonexistent/tokenizer.json"), 512).unwrap_err();
        assert!(err.to_string().contains("Tokenizer not found"));
    }

    #[test]
    fn test_token_types_only_for_declaring_graphs() {
        let bert = ["input_ids", "attention_mask", "token_type_ids"];
        let xlm_roberta = ["input_ids", "attention_mask"];
        assert!(declares_token_types(bert.into_iter()));
        assert!(!declares_token_types(xlm_roberta.into_iter()));
    }

    #[test]
    fn test_empty_encodings_rejected() {
        let err = BatchInputs::from_encodings(&[Encoding::default()]).err().unwrap();
        assert!(err.to_string().contains("empty encodings"));
    }

    #[test]
    fn test_empty_batch() {
        let inputs = BatchInputs::from_encodings(&[]).unwrap();
        assert_eq!(inputs.batch_size(), 0);
        assert_eq!(inputs.seq_len(), 0);
    }
}
