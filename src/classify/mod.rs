//! Classifier collaborator abstraction.
//!
//! Triage is the only consumer. The engine does not care whether a
//! classification came from a language model, a rule set, or a test stub;
//! anything implementing [`Classifier`] plugs in at construction time.

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::{Classification, HistoryTurn};

pub mod keyword;

pub use keyword::KeywordClassifier;

/// Errors surfaced by a classification backend.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classification backend unavailable: {0}")]
    Unavailable(String),
    #[error("classification output malformed: {0}")]
    Malformed(String),
}

/// Produces a structured classification for a customer query.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `query` in the context of prior turns.
    ///
    /// Failing here means routing cannot proceed; the orchestrator
    /// escalates the turn rather than retrying.
    async fn classify(
        &self,
        query: &str,
        history: &[HistoryTurn],
    ) -> Result<Classification, ClassifierError>;
}
