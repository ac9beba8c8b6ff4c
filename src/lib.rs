pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod rerank;
pub mod retrieval;
mod runtime;

// Re-export commonly used types
pub use config::{RetrievalConfig, Settings, TextField};
pub use error::RetrievalError;
pub use retrieval::{Retriever, ScoredDocument, Stage};
