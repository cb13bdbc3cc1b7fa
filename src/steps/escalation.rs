//! Escalation: hand the conversation to a human with full context.

use async_trait::async_trait;
use tracing::info;

use super::{Step, StepError, StepId};
use crate::conversation::ConversationState;

const HANDOFF_MESSAGE: &str = "I understand this situation needs special attention. I'm \
connecting you with one of our specialist team members, who will review your case shortly \
with the full context of our conversation. Thank you for your patience.";

/// Terminal fallback step. Marks the turn escalated, permanently, and
/// produces both the customer-facing handoff message and a context summary
/// for the receiving human agent.
#[derive(Debug, Default)]
pub struct EscalationStep;

impl EscalationStep {
    pub fn new() -> Self {
        Self
    }

    /// Derive the escalation reason from accumulated state. Pure function.
    fn derive_reason(state: &ConversationState) -> String {
        if let Some(reason) = &state.escalation_reason {
            return reason.clone();
        }
        if let Some(failure) = state.last_tool_failure() {
            return format!("{} failed", failure.tool_name);
        }
        match state.classification() {
            None => "classification unavailable".to_string(),
            Some(c) => format!(
                "{} query with {:?} urgency requires human judgment",
                c.intent, c.urgency
            ),
        }
    }

    /// Summary block for the human agent picking the conversation up.
    fn handoff_summary(state: &ConversationState, reason: &str) -> String {
        let mut lines = vec![
            format!("Escalation summary: {reason}."),
            format!("Customer query: \"{}\"", state.query()),
        ];
        if let Some(c) = state.classification() {
            lines.push(format!(
                "Classified as {} (urgency {:?}, sentiment {:?}).",
                c.intent, c.urgency, c.sentiment
            ));
        }
        if !state.tool_results.is_empty() {
            let attempted: Vec<&str> = state
                .tool_results
                .iter()
                .map(|r| r.tool_name.as_str())
                .collect();
            lines.push(format!("Attempted operations: {}.", attempted.join(", ")));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Step for EscalationStep {
    fn id(&self) -> StepId {
        StepId::Escalation
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, StepError> {
        let reason = Self::derive_reason(&state);
        info!(turn_id = %state.turn_id(), reason = %reason, "escalating to human agent");

        let summary = Self::handoff_summary(&state, &reason);
        // The customer sees the handoff message; the summary travels with
        // the response for the receiving agent.
        state.respond(format!("{HANDOFF_MESSAGE}\n\n{summary}"));
        state.mark_escalated(reason);
        Ok(state)
    }
}
