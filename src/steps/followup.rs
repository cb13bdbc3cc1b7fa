//! Follow-up: append a satisfaction check to an already-answered turn.

use async_trait::async_trait;
use tracing::debug;

use super::{Step, StepError, StepId};
use crate::conversation::ConversationState;

const AFTER_ACTION: &str = "Is there anything else I can help you with today?";
const AFTER_ANSWER: &str = "I hope that answers your question. Let us know if anything is unclear.";

/// Appends a closing remark to the terminal response. Never runs first:
/// a prior step must already have produced the response it extends.
#[derive(Debug, Default)]
pub struct FollowUpStep;

impl FollowUpStep {
    pub fn new() -> Self {
        Self
    }

    /// Pick the closing remark: a satisfaction prompt after a completed
    /// backend action, a softer closer after an informational answer.
    fn closing_remark(state: &ConversationState) -> &'static str {
        if state.any_tool_success() {
            AFTER_ACTION
        } else {
            AFTER_ANSWER
        }
    }
}

#[async_trait]
impl Step for FollowUpStep {
    fn id(&self) -> StepId {
        StepId::FollowUp
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, StepError> {
        if state.terminal_response().is_none() {
            return Err(StepError::new(
                StepId::FollowUp,
                "no terminal response to follow up on",
            ));
        }

        let remark = Self::closing_remark(&state);
        debug!(turn_id = %state.turn_id(), "appending follow-up remark");
        state.append_response(remark);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::conversation::{ToolInvocation, ToolOutcome};

    #[tokio::test]
    async fn test_appends_satisfaction_prompt_after_action() {
        let mut state = ConversationState::new("cancel order 9001", vec![]);
        state.respond("Your order 9001 has been cancelled.");
        state.record_tool_invocation(ToolInvocation {
            tool_name: "cancel_order".to_string(),
            arguments: json!({"order_id": "9001"}),
            outcome: ToolOutcome::Success { payload: json!({}) },
            recorded_at: Utc::now(),
        });

        let state = FollowUpStep::new().run(state).await.unwrap();
        let response = state.terminal_response().unwrap();
        assert!(response.starts_with("Your order 9001 has been cancelled."));
        assert!(response.ends_with(AFTER_ACTION));
    }

    #[tokio::test]
    async fn test_appends_closer_after_answer() {
        let mut state = ConversationState::new("what is your return policy?", vec![]);
        state.respond("Returns are accepted within 30 days.");

        let state = FollowUpStep::new().run(state).await.unwrap();
        assert!(state.terminal_response().unwrap().ends_with(AFTER_ANSWER));
    }

    #[tokio::test]
    async fn test_refuses_to_run_first() {
        let state = ConversationState::new("anything", vec![]);
        let err = FollowUpStep::new().run(state).await.unwrap_err();
        assert_eq!(err.step, StepId::FollowUp);
    }
}
