//! Concrete scorer implementations: lexical (BM25) and semantic (embeddings)

mod lexical;
mod semantic;

pub use lexical::{tokenize, Bm25Params, LexicalScorer};
pub use semantic::SemanticScorer;
