//! Routing table and transition decisions.
//!
//! The routing table is the declarative heart of the state machine:
//! `Start → Triage → {Knowledge | Action | Escalation} → [FollowUp] → Done`.
//! Ablation configurations override it explicitly: an excluded step is a
//! `None` handler, and the fallback for every exclusion is enumerated here
//! rather than inferred at dispatch time. Escalation is not excludable: it
//! is the path of last resort that guarantees every turn ends with a
//! response.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ConversationState, Intent, Sentiment, Urgency};
use crate::steps::StepId;

/// What the orchestrator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Dispatch the given step.
    Dispatch { step: StepId },
    /// The turn is complete.
    Finish,
}

impl RouteDecision {
    pub fn is_finish(&self) -> bool {
        matches!(self, RouteDecision::Finish)
    }
}

/// Invalid routing-table shapes, rejected at construction.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("step {0} cannot serve as a {1} handler")]
    InvalidHandler(StepId, &'static str),
}

/// Declarative routing policy for one orchestrator instance.
///
/// `None` handlers mean the step is excluded from this configuration and
/// requests that would reach it fall back to Escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Handler for `information_request` intents.
    pub information_handler: Option<StepId>,
    /// Handler for `action_request` intents with an actionable entity.
    pub action_handler: Option<StepId>,
    /// Appended after a successful primary handler, when present.
    pub followup: Option<StepId>,
    /// Route critical-urgency / very-negative turns straight to escalation.
    pub escalate_on_urgency: bool,
}

impl RoutingTable {
    /// The full production routing: all handlers live.
    pub fn standard() -> Self {
        Self {
            information_handler: Some(StepId::Knowledge),
            action_handler: Some(StepId::Action),
            followup: Some(StepId::FollowUp),
            escalate_on_urgency: true,
        }
    }

    /// Reject tables whose handlers cannot do the job they are wired to.
    pub fn validate(&self) -> Result<(), RoutingError> {
        for (handler, role) in [
            (self.information_handler, "information"),
            (self.action_handler, "action"),
        ] {
            if let Some(step) = handler {
                if matches!(step, StepId::Triage | StepId::FollowUp) {
                    return Err(RoutingError::InvalidHandler(step, role));
                }
            }
        }
        if let Some(step) = self.followup {
            if !matches!(step, StepId::FollowUp) {
                return Err(RoutingError::InvalidHandler(step, "follow-up"));
            }
        }
        Ok(())
    }

    /// Every step this table can dispatch to.
    pub fn reachable_steps(&self) -> Vec<StepId> {
        let mut steps = vec![StepId::Triage, StepId::Escalation];
        steps.extend(self.information_handler);
        steps.extend(self.action_handler);
        steps.extend(self.followup);
        steps.sort();
        steps.dedup();
        steps
    }

    /// Choose the primary handler once triage has run.
    pub fn route_after_triage(
        &self,
        state: &ConversationState,
        entity_confidence: f64,
    ) -> StepId {
        if state.needs_escalation {
            return StepId::Escalation;
        }
        let Some(classification) = state.classification() else {
            return StepId::Escalation;
        };

        if self.escalate_on_urgency
            && (classification.urgency == Urgency::Critical
                || classification.sentiment == Sentiment::VeryNegative)
        {
            return StepId::Escalation;
        }

        match classification.intent {
            Intent::InformationRequest => {
                self.information_handler.unwrap_or(StepId::Escalation)
            }
            Intent::ActionRequest | Intent::Complaint => {
                // Both need an actionable target; a complaint without one
                // is human territory.
                if classification.entity("order_id", entity_confidence).is_some() {
                    self.action_handler.unwrap_or(StepId::Escalation)
                } else {
                    StepId::Escalation
                }
            }
            Intent::Unknown => StepId::Escalation,
        }
    }

    /// Decide what follows the primary handler.
    pub fn route_after_primary(&self, state: &ConversationState) -> RouteDecision {
        if state.escalated() {
            return RouteDecision::Finish;
        }
        if state.needs_escalation {
            return RouteDecision::Dispatch {
                step: StepId::Escalation,
            };
        }
        match self.followup {
            Some(step) => RouteDecision::Dispatch { step },
            None => RouteDecision::Finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Classification, Entity};
    use crate::testing::mocks::{test_state_with_classification, test_state_with_entities};

    fn action_state(order_id_confidence: f64) -> ConversationState {
        test_state_with_entities(
            "cancel order 9001",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "9001", order_id_confidence)],
        )
    }

    #[test]
    fn test_information_routes_to_knowledge() {
        let table = RoutingTable::standard();
        let state = test_state_with_classification("what is shipping?", Intent::InformationRequest);
        assert_eq!(table.route_after_triage(&state, 0.7), StepId::Knowledge);
    }

    #[test]
    fn test_action_with_entity_routes_to_action() {
        let table = RoutingTable::standard();
        assert_eq!(
            table.route_after_triage(&action_state(0.9), 0.7),
            StepId::Action
        );
    }

    #[test]
    fn test_action_with_low_confidence_entity_escalates() {
        let table = RoutingTable::standard();
        assert_eq!(
            table.route_after_triage(&action_state(0.3), 0.7),
            StepId::Escalation
        );
    }

    #[test]
    fn test_critical_urgency_escalates() {
        let table = RoutingTable::standard();

        let mut classification = Classification {
            intent: Intent::InformationRequest,
            entities: vec![],
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Critical,
        };
        let mut state = ConversationState::new("emergency", vec![]);
        state.set_classification(classification.clone());
        assert_eq!(table.route_after_triage(&state, 0.7), StepId::Escalation);

        classification.urgency = Urgency::Medium;
        classification.sentiment = Sentiment::VeryNegative;
        let mut state = ConversationState::new("awful", vec![]);
        state.set_classification(classification);
        assert_eq!(table.route_after_triage(&state, 0.7), StepId::Escalation);
    }

    #[test]
    fn test_excluded_information_handler_falls_back_to_escalation() {
        let table = RoutingTable {
            information_handler: None,
            ..RoutingTable::standard()
        };
        let state = test_state_with_classification("what is shipping?", Intent::InformationRequest);
        assert_eq!(table.route_after_triage(&state, 0.7), StepId::Escalation);
    }

    #[test]
    fn test_missing_classification_escalates() {
        let table = RoutingTable::standard();
        let state = ConversationState::new("anything", vec![]);
        assert_eq!(table.route_after_triage(&state, 0.7), StepId::Escalation);
    }

    #[test]
    fn test_after_primary_goes_to_followup() {
        let table = RoutingTable::standard();
        let mut state = test_state_with_classification("q", Intent::InformationRequest);
        state.respond("answer");
        assert_eq!(
            table.route_after_primary(&state),
            RouteDecision::Dispatch {
                step: StepId::FollowUp
            }
        );
    }

    #[test]
    fn test_after_primary_without_followup_finishes() {
        let table = RoutingTable {
            followup: None,
            ..RoutingTable::standard()
        };
        let state = test_state_with_classification("q", Intent::InformationRequest);
        assert!(table.route_after_primary(&state).is_finish());
    }

    #[test]
    fn test_needs_escalation_reroutes() {
        let table = RoutingTable::standard();
        let mut state = test_state_with_classification("q", Intent::ActionRequest);
        state.needs_escalation = true;
        assert_eq!(
            table.route_after_primary(&state),
            RouteDecision::Dispatch {
                step: StepId::Escalation
            }
        );
    }

    #[test]
    fn test_escalated_turn_finishes() {
        let table = RoutingTable::standard();
        let mut state = test_state_with_classification("q", Intent::Complaint);
        state.mark_escalated("done");
        assert!(table.route_after_primary(&state).is_finish());
    }

    #[test]
    fn test_validate_rejects_triage_as_handler() {
        let table = RoutingTable {
            information_handler: Some(StepId::Triage),
            ..RoutingTable::standard()
        };
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_reachable_steps() {
        let table = RoutingTable::standard();
        let steps = table.reachable_steps();
        assert_eq!(steps.len(), 5);

        let action_only = RoutingTable {
            information_handler: None,
            followup: None,
            ..RoutingTable::standard()
        };
        let steps = action_only.reachable_steps();
        assert!(!steps.contains(&StepId::Knowledge));
        assert!(!steps.contains(&StepId::FollowUp));
        assert!(steps.contains(&StepId::Escalation));
    }
}
