//! Model resolution
//!
//! ```text
//! registry.toml (in binary)  →  What models exist
//!      ↓
//! evidence.toml [models]     →  Which models this run uses + where they live
//!      ↓
//! this module                →  Resolves paths to actual files
//! ```

mod registry;

pub use registry::{ModelDefinition, ModelKind, ModelRegistry};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Resolved on-disk files for one model
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Resolve the files for a model under `models_dir/<name>/`
///
/// Valid = tokenizer.json + (model_quantized.onnx OR model.onnx).
/// The quantized model is preferred when both exist.
pub fn resolve_model_files(models_dir: &Path, name: &str) -> Result<ModelFiles> {
    let model_dir = models_dir.join(name);
    let tokenizer = model_dir.join("tokenizer.json");

    let onnx_quantized = model_dir.join("model_quantized.onnx");
    let onnx = model_dir.join("model.onnx");
    let model = if onnx_quantized.exists() {
        onnx_quantized
    } else {
        onnx
    };

    if !tokenizer.exists() || !model.exists() {
        anyhow::bail!(
            "Model '{}' not found in {}. Expected tokenizer.json and model.onnx \
             (or model_quantized.onnx) in {}",
            name,
            models_dir.display(),
            model_dir.display()
        );
    }

    Ok(ModelFiles { model, tokenizer })
}
