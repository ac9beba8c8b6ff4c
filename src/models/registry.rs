//! Model registry compiled into the binary
//!
//! Allows switching embedding and cross-encoder models via configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

const REGISTRY_TOML: &str = include_str!("../../resources/models/registry.toml");

/// What a model is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Bi-encoder producing one vector per text
    Embedding,
    /// Joint (query, document) scorer producing one logit per pair
    CrossEncoder,
}

/// Model definition from registry
#[derive(Debug, Deserialize, Clone)]
pub struct ModelDefinition {
    pub kind: ModelKind,
    pub description: String,
    /// Embedding dimension (embedding models only)
    #[serde(default)]
    pub dimensions: Option<usize>,
    /// Token limit for truncation
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    pub source: String,

    /// Query prefix for asymmetric models (e.g., "query: " for E5)
    #[serde(default)]
    pub query_prefix: Option<String>,

    /// Passage prefix for asymmetric models (e.g., "passage: " for E5)
    #[serde(default)]
    pub passage_prefix: Option<String>,
}

fn default_max_length() -> usize {
    512
}

/// Model registry (from resources/models/registry.toml)
#[derive(Debug, Deserialize)]
pub struct ModelRegistry {
    pub models: HashMap<String, ModelDefinition>,
    pub default_embedding: String,
    pub default_reranker: String,
}

impl ModelRegistry {
    /// Load the built-in registry
    pub fn load() -> Result<Self> {
        Self::parse(REGISTRY_TOML)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse model registry TOML")
    }

    /// Get model definition by name
    pub fn get_model(&self, name: &str) -> Result<&ModelDefinition> {
        self.models
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Model '{}' not found in registry", name))
    }

    /// Get model definition by name, requiring a specific kind
    pub fn get_model_of_kind(&self, name: &str, kind: ModelKind) -> Result<&ModelDefinition> {
        let model = self.get_model(name)?;
        if model.kind != kind {
            anyhow::bail!(
                "Model '{}' is a {:?} model, expected {:?}",
                name,
                model.kind,
                kind
            );
        }
        Ok(model)
    }

    /// List available models, sorted by name
    pub fn list_models(&self) -> Vec<(&String, &ModelDefinition)> {
        let mut models: Vec<_> = self.models.iter().collect();
        models.sort_by(|a, b| a.0.cmp(b.0));
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_registry() {
        let registry = ModelRegistry::load().expect("Failed to load registry");
        assert!(registry.models.contains_key("all-minilm-l6-v2"));
        assert!(registry.models.contains_key("ms-marco-minilm-l6-v2"));
    }

    #[test]
    fn test_defaults_exist_with_right_kind() {
        let registry = ModelRegistry::load().unwrap();
        assert!(registry
            .get_model_of_kind(&registry.default_embedding, ModelKind::Embedding)
            .is_ok());
        assert!(registry
            .get_model_of_kind(&registry.default_reranker, ModelKind::CrossEncoder)
            .is_ok());
    }

    #[test]
    fn test_embedding_models_have_dimensions() {
        let registry = ModelRegistry::load().unwrap();
        for (name, model) in registry.list_models() {
            if model.kind == ModelKind::Embedding {
                assert!(model.dimensions.is_some(), "{} missing dimensions", name);
            }
        }
    }

    #[test]
    fn test_kind_mismatch() {
        let registry = ModelRegistry::load().unwrap();
        let err = registry
            .get_model_of_kind("all-minilm-l6-v2", ModelKind::CrossEncoder)
            .unwrap_err();
        assert!(err.to_string().contains("expected CrossEncoder"));
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::load().unwrap();
        assert!(registry.get_model("gpt-17").is_err());
    }

    #[test]
    fn test_e5_prefixes() {
        let registry = ModelRegistry::load().unwrap();
        let model = registry.get_model("e5-base-v2").unwrap();
        assert_eq!(model.query_prefix.as_deref(), Some("query: "));
        assert_eq!(model.passage_prefix.as_deref(), Some("passage: "));
        assert_eq!(model.dimensions, Some(768));
    }
}
