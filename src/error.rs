//! Engine-level error types.
//!
//! Per-module errors (`ToolError`, `ClassifierError`, `RetrieverError`,
//! `StepError`, `ConfigError`, `RoutingError`) cover their own domains;
//! `EngineError` is what crosses the `process_turn` boundary. Loop
//! prevention failures are fatal for the turn and never silently retried.

use thiserror::Error;

use crate::config::ConfigError;
use crate::routing::RoutingError;
use crate::steps::{StepError, StepId};
use crate::tools::ToolError;

/// Errors surfaced to the orchestrator's caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A step would have run twice in one turn. A correctness guarantee
    /// was about to be violated; the turn is aborted.
    #[error("routing loop detected: step {step} already visited this turn")]
    RoutingLoop { step: StepId },

    /// The per-turn step budget was exhausted before the turn finished.
    #[error("step limit exceeded: {taken} steps taken (max {max})")]
    StepLimitExceeded { taken: usize, max: usize },

    /// The routing table references a step with no registered
    /// implementation. Caught at orchestrator construction.
    #[error("routing table references step {0} but no implementation was provided")]
    MissingStep(StepId),

    #[error("step {0} was provided more than once")]
    DuplicateStep(StepId),

    #[error("step execution failed: {0}")]
    StepExecution(#[from] StepError),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_loop_message() {
        let error = EngineError::RoutingLoop {
            step: StepId::Action,
        };
        assert!(error.to_string().contains("action"));
        assert!(error.to_string().contains("already visited"));
    }

    #[test]
    fn test_step_error_conversion() {
        let step_error = StepError::new(StepId::Triage, "backend down");
        let engine_error: EngineError = step_error.into();
        assert!(matches!(engine_error, EngineError::StepExecution(_)));
        assert!(engine_error.to_string().contains("backend down"));
    }
}
