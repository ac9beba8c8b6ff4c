//! Error types for the retrieval pipeline.
//!
//! Only contract violations live here. Model and scoring failures are
//! recovered inside the pipeline and never reach the caller.

/// Errors surfaced by `Retriever` construction and `retrieve` calls.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Configuration rejected at construction time.
    #[error("invalid retrieval config: {0}")]
    InvalidConfig(String),

    /// Short and full text sequences are not positionally aligned.
    #[error("misaligned corpus: {short} short texts vs {full} full texts")]
    MisalignedCorpus { short: usize, full: usize },
}

/// Convenience alias for retrieval results.
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_config() {
        let err = RetrievalError::InvalidConfig("top_k must be >= 1".into());
        assert_eq!(err.to_string(), "invalid retrieval config: top_k must be >= 1");
    }

    #[test]
    fn display_misaligned_corpus() {
        let err = RetrievalError::MisalignedCorpus { short: 3, full: 4 };
        assert_eq!(
            err.to_string(),
            "misaligned corpus: 3 short texts vs 4 full texts"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RetrievalError>();
    }
}
