//! Step contract and the five concrete processing steps.
//!
//! Steps are domain experts, not workflow coordinators: each one reads the
//! conversation state, does its single job (classify, answer, act, follow
//! up, or escalate), and returns the updated state. Which step runs next is
//! the orchestrator's decision alone; a step never appends to
//! `visited_steps`, so no step can bypass loop protection.
//!
//! External collaborators (classifier, retriever, tool registry) are
//! injected at construction; `run` is a pure function of its input state
//! plus those collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::conversation::ConversationState;
use crate::retrieve::Retriever;
use crate::tools::ToolRegistry;

pub mod action;
pub mod escalation;
pub mod followup;
pub mod knowledge;
pub mod triage;

pub use action::ActionStep;
pub use escalation::EscalationStep;
pub use followup::FollowUpStep;
pub use knowledge::KnowledgeStep;
pub use triage::TriageStep;

/// Closed set of step identifiers.
///
/// Routing dispatches over this enum, so the routing table is statically
/// checkable; there is no open-ended registry of callables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Triage,
    Knowledge,
    Action,
    FollowUp,
    Escalation,
}

impl StepId {
    pub const ALL: [StepId; 5] = [
        StepId::Triage,
        StepId::Knowledge,
        StepId::Action,
        StepId::FollowUp,
        StepId::Escalation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Triage => "triage",
            StepId::Knowledge => "knowledge",
            StepId::Action => "action",
            StepId::FollowUp => "follow_up",
            StepId::Escalation => "escalation",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a step's external collaborator fails in a way the step
/// cannot absorb. The orchestrator decides whether it is recoverable.
#[derive(Debug, Error)]
#[error("step {step} failed: {cause}")]
pub struct StepError {
    pub step: StepId,
    pub cause: String,
}

impl StepError {
    pub fn new<S: Into<String>>(step: StepId, cause: S) -> Self {
        Self {
            step,
            cause: cause.into(),
        }
    }
}

/// Uniform interface every processing step implements.
#[async_trait]
pub trait Step: Send + Sync {
    fn id(&self) -> StepId;

    /// Process the state and return the updated copy.
    ///
    /// Implementations must not touch `visited_steps`; the orchestrator
    /// records dispatches centrally.
    async fn run(&self, state: ConversationState) -> Result<ConversationState, StepError>;
}

/// Build the five standard steps over the given collaborators.
///
/// This is the factory both the binary and the evaluation harness use;
/// tests wire custom step sets directly.
pub fn standard_steps(
    config: &EngineConfig,
    classifier: Arc<dyn Classifier>,
    retriever: Arc<dyn Retriever>,
    tools: Arc<ToolRegistry>,
) -> Vec<Arc<dyn Step>> {
    let timeout = config.thresholds.collaborator_timeout();
    vec![
        Arc::new(TriageStep::new(classifier, timeout)),
        Arc::new(KnowledgeStep::new(
            retriever,
            tools.clone(),
            config.thresholds.retrieval_top_k,
            timeout,
        )),
        Arc::new(ActionStep::new(
            tools,
            config.thresholds.entity_confidence,
        )),
        Arc::new(FollowUpStep::new()),
        Arc::new(EscalationStep::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_round_trip() {
        for id in StepId::ALL {
            let encoded = serde_json::to_string(&id).unwrap();
            let decoded: StepId = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, id);
        }
    }

    #[test]
    fn test_step_id_display() {
        assert_eq!(StepId::FollowUp.to_string(), "follow_up");
        assert_eq!(StepId::Triage.to_string(), "triage");
    }
}
