//! Retrieval configuration
//!
//! Two layers:
//! - `RetrievalConfig` - the validated, immutable runtime config a `Retriever` is built with
//! - `Settings` - the `evidence.toml` file schema (retrieval knobs + model selection)
//!
//! A missing settings file means defaults everywhere.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RetrievalError;

/// RRF weight for rankings produced from the event query
pub const EVENT_QUERY_WEIGHT: f32 = 2.0;

/// RRF weight for rankings produced from each option query
pub const OPTION_QUERY_WEIGHT: f32 = 1.0;

/// Which text of a document gets indexed by the scorers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    /// Full document content
    Full,
    /// Title + snippet
    #[default]
    Short,
}

/// Runtime retrieval configuration
///
/// Fixed at `Retriever` construction; `validate` runs there.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Final result size (>= 1)
    pub top_k: usize,
    /// Candidate set size fed to reranking (>= top_k)
    pub coarse_top_k: usize,
    /// RRF rank-damping constant (default: 60)
    pub rrf_k: usize,
    /// Text indexed by the scorers
    pub text_field: TextField,
    /// Also score each option as its own query
    pub option_weighting: bool,
    /// Run the cross-encoder over the coarse candidates
    pub reranking: bool,
    /// Weight of event-query rankings in fusion
    pub event_weight: f32,
    /// Weight of each option-query ranking in fusion
    pub option_weight: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            coarse_top_k: 30,
            rrf_k: 60,
            text_field: TextField::Short,
            option_weighting: true,
            reranking: true,
            event_weight: EVENT_QUERY_WEIGHT,
            option_weight: OPTION_QUERY_WEIGHT,
        }
    }
}

impl RetrievalConfig {
    /// Reject configurations that indicate a programming error
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.top_k == 0 {
            return Err(RetrievalError::InvalidConfig("top_k must be >= 1".into()));
        }
        if self.coarse_top_k < self.top_k {
            return Err(RetrievalError::InvalidConfig(format!(
                "coarse_top_k ({}) must be >= top_k ({})",
                self.coarse_top_k, self.top_k
            )));
        }
        if self.rrf_k == 0 {
            return Err(RetrievalError::InvalidConfig("rrf_k must be > 0".into()));
        }
        for (name, weight) in [
            ("event_weight", self.event_weight),
            ("option_weight", self.option_weight),
        ] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(RetrievalError::InvalidConfig(format!(
                    "{} must be a positive finite number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Settings file - evidence.toml
// =============================================================================

/// Settings stored in `evidence.toml`
/// All sections are optional with defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub models: ModelsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_coarse_top_k")]
    pub coarse_top_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Index full content instead of title + snippet
    #[serde(default)]
    pub use_full_content: bool,
    #[serde(default = "default_true")]
    pub enable_option_weighting: bool,
    #[serde(default = "default_true")]
    pub enable_reranking: bool,
    #[serde(default = "default_event_weight")]
    pub event_weight: f32,
    #[serde(default = "default_option_weight")]
    pub option_weight: f32,
}

fn default_top_k() -> usize {
    10
}
fn default_coarse_top_k() -> usize {
    30
}
fn default_rrf_k() -> usize {
    60
}
fn default_true() -> bool {
    true
}
fn default_event_weight() -> f32 {
    EVENT_QUERY_WEIGHT
}
fn default_option_weight() -> f32 {
    OPTION_QUERY_WEIGHT
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            coarse_top_k: default_coarse_top_k(),
            rrf_k: default_rrf_k(),
            use_full_content: false,
            enable_option_weighting: true,
            enable_reranking: true,
            event_weight: default_event_weight(),
            option_weight: default_option_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsSection {
    /// Directory holding one subdirectory per model
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,
    /// Embedding model name (registry key)
    #[serde(default = "default_embedding_model")]
    pub embedding: String,
    /// Cross-encoder model name (registry key)
    #[serde(default = "default_reranker_model")]
    pub reranker: String,
    /// Register the CUDA execution provider for ONNX sessions
    #[serde(default)]
    pub use_accelerated_device: bool,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("resources/models")
}
fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_reranker_model() -> String {
    "ms-marco-minilm-l6-v2".to_string()
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            embedding: default_embedding_model(),
            reranker: default_reranker_model(),
            use_accelerated_device: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    /// Runtime config derived from the `[retrieval]` section
    pub fn retrieval_config(&self) -> RetrievalConfig {
        let r = &self.retrieval;
        RetrievalConfig {
            top_k: r.top_k,
            coarse_top_k: r.coarse_top_k,
            rrf_k: r.rrf_k,
            text_field: if r.use_full_content {
                TextField::Full
            } else {
                TextField::Short
            },
            option_weighting: r.enable_option_weighting,
            reranking: r.enable_reranking,
            event_weight: r.event_weight,
            option_weight: r.option_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RetrievalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let config = RetrievalConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RetrievalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_coarse_smaller_than_top_k_rejected() {
        let config = RetrievalConfig {
            top_k: 5,
            coarse_top_k: 4,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("coarse_top_k (4)"));
    }

    #[test]
    fn test_coarse_equal_to_top_k_allowed() {
        let config = RetrievalConfig {
            top_k: 5,
            coarse_top_k: 5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_weights_rejected() {
        for weight in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = RetrievalConfig {
                option_weight: weight,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "weight {} accepted", weight);
        }
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/evidence.toml")).unwrap();
        assert_eq!(settings.retrieval_config(), RetrievalConfig::default());
        assert_eq!(settings.models.embedding, "all-minilm-l6-v2");
    }

    #[test]
    fn test_partial_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[retrieval]\ntop_k = 3\nuse_full_content = true\nenable_reranking = false\n\n[models]\nuse_accelerated_device = true"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        let config = settings.retrieval_config();

        assert_eq!(config.top_k, 3);
        assert_eq!(config.coarse_top_k, 30);
        assert_eq!(config.text_field, TextField::Full);
        assert!(!config.reranking);
        assert!(config.option_weighting);
        assert!(settings.models.use_accelerated_device);
        assert_eq!(settings.models.reranker, "ms-marco-minilm-l6-v2");
    }

    #[test]
    fn test_malformed_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retrieval]\ntop_k = \"many\"").unwrap();

        let err = Settings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
    }
}
