//! Retriever collaborator abstraction.
//!
//! The Knowledge step grounds its answers in documents returned here. An
//! empty result set means "no match" and is not an error; errors are
//! reserved for backend unavailability, which the Knowledge step degrades
//! around rather than failing the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod keyword;

pub use keyword::{KeywordRetriever, KnowledgeEntry};

/// Errors surfaced by a retrieval backend.
#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("retrieval backend unavailable: {0}")]
    Unavailable(String),
}

/// A retrieved document with its similarity score, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub text: String,
    pub score: f64,
}

/// Returns the `top_k` documents most similar to the query, ranked by
/// descending score.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrieverError>;
}
