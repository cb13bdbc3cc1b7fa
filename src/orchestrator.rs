//! The turn state machine.
//!
//! `Start → Triage → {Knowledge | Action | Escalation} → [FollowUp] → Done`.
//!
//! The orchestrator owns the conversation state for the duration of one
//! turn and is the only component that appends to `visited_steps`; the
//! loop guard is enforced centrally, before every dispatch, so no step can
//! bypass it. It guarantees:
//!
//! - Triage runs first and exactly once per turn;
//! - no step runs twice (`RoutingLoop` is raised instead);
//! - exactly one of Knowledge / Action / Escalation handles the primary
//!   request;
//! - every turn ends with a terminal response; escalation is the
//!   fallback of last resort.
//!
//! The orchestrator holds no cross-turn mutable state: concurrent turns
//! are independent units of work sharing only read-only configuration and
//! the stateless tool registry.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::conversation::{ConversationState, HistoryTurn};
use crate::error::{EngineError, EngineResult};
use crate::routing::{RouteDecision, RoutingTable};
use crate::steps::{Step, StepId};

const LAST_RESORT_RESPONSE: &str = "We were unable to complete your request automatically. \
A member of our support team will review your case and follow up with you shortly.";

/// Sequences steps over one conversation turn.
pub struct Orchestrator {
    steps: HashMap<StepId, Arc<dyn Step>>,
    table: RoutingTable,
    entity_confidence: f64,
    max_steps_per_turn: usize,
}

impl Orchestrator {
    /// Build an orchestrator from step implementations and a routing table.
    ///
    /// The step set is validated exhaustively here: every step the table
    /// can reach must have exactly one implementation.
    pub fn new(
        steps: Vec<Arc<dyn Step>>,
        table: RoutingTable,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        table.validate()?;

        let mut step_map: HashMap<StepId, Arc<dyn Step>> = HashMap::new();
        for step in steps {
            let id = step.id();
            if step_map.insert(id, step).is_some() {
                return Err(EngineError::DuplicateStep(id));
            }
        }
        for id in table.reachable_steps() {
            if !step_map.contains_key(&id) {
                return Err(EngineError::MissingStep(id));
            }
        }

        Ok(Self {
            steps: step_map,
            table,
            entity_confidence: config.thresholds.entity_confidence,
            max_steps_per_turn: config.engine.max_steps_per_turn,
        })
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// Process one turn to completion.
    ///
    /// This is the engine's single entry point. The returned state always
    /// carries a terminal response.
    pub async fn process_turn(
        &self,
        query: &str,
        history: Vec<HistoryTurn>,
    ) -> EngineResult<ConversationState> {
        let mut state = ConversationState::new(query, history);
        info!(turn_id = %state.turn_id(), query, "turn started");

        // Triage always runs first, exactly once.
        state = self.dispatch(StepId::Triage, state).await?;

        // Exactly one primary handler per turn.
        let primary = self.table.route_after_triage(&state, self.entity_confidence);
        debug!(turn_id = %state.turn_id(), primary = %primary, "routed after triage");
        state = self.dispatch(primary, state).await?;

        if primary != StepId::Escalation {
            if let RouteDecision::Dispatch { step } = self.table.route_after_primary(&state) {
                state = self.dispatch(step, state).await?;
            }
        }

        // A failure inside follow-up can still request escalation.
        if state.needs_escalation
            && !state.escalated()
            && !state.visited_steps().contains(&StepId::Escalation)
        {
            state = self.dispatch(StepId::Escalation, state).await?;
        }

        state = self.ensure_terminal_response(state).await?;

        info!(
            turn_id = %state.turn_id(),
            steps = ?state.visited_steps(),
            escalated = state.escalated(),
            resolution = ?state.resolution,
            "turn complete"
        );
        Ok(state)
    }

    /// Dispatch one step, enforcing the loop guard and step budget.
    ///
    /// A step whose collaborator fails is recovered into an escalation
    /// request; the routing-loop and step-budget violations are fatal for
    /// the turn.
    async fn dispatch(
        &self,
        id: StepId,
        mut state: ConversationState,
    ) -> EngineResult<ConversationState> {
        if state.visited_steps().contains(&id) {
            return Err(EngineError::RoutingLoop { step: id });
        }
        if state.steps_taken() >= self.max_steps_per_turn {
            return Err(EngineError::StepLimitExceeded {
                taken: state.steps_taken(),
                max: self.max_steps_per_turn,
            });
        }

        let step = self
            .steps
            .get(&id)
            .ok_or(EngineError::MissingStep(id))?;

        state.record_visit(id);
        debug!(turn_id = %state.turn_id(), step = %id, "dispatching step");

        let snapshot = state.clone();
        match step.run(state).await {
            Ok(next) => Ok(next),
            Err(e) => {
                // The step's collaborator failed. The turn continues: the
                // failure becomes an escalation request on the pre-run
                // state (the dispatch itself stays recorded).
                warn!(step = %id, error = %e, "step failed; requesting escalation");
                let mut next = snapshot;
                next.needs_escalation = true;
                if next.escalation_reason.is_none() {
                    next.escalation_reason = Some(e.to_string());
                }
                Ok(next)
            }
        }
    }

    /// No turn ever returns without a terminal response.
    async fn ensure_terminal_response(
        &self,
        mut state: ConversationState,
    ) -> EngineResult<ConversationState> {
        if state.terminal_response().is_some() {
            return Ok(state);
        }

        if !state.visited_steps().contains(&StepId::Escalation) {
            return self.dispatch(StepId::Escalation, state).await;
        }

        // Escalation itself produced nothing (its collaborator failed);
        // fall back to a canned handoff so the caller still gets an answer.
        warn!(turn_id = %state.turn_id(), "escalation produced no response; using last resort");
        state.respond(LAST_RESORT_RESPONSE);
        state.mark_escalated("no response produced by any step");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KeywordClassifier;
    use crate::config::EngineConfig;
    use crate::conversation::Intent;
    use crate::retrieve::KeywordRetriever;
    use crate::steps::standard_steps;
    use crate::tools::builtin::{standard_registry, BuiltinBackends};

    fn orchestrator(table: RoutingTable) -> Orchestrator {
        let config = EngineConfig::default();
        let registry = standard_registry(&BuiltinBackends::seeded()).unwrap();
        let steps = standard_steps(
            &config,
            Arc::new(KeywordClassifier::new()),
            Arc::new(KeywordRetriever::with_default_knowledge_base()),
            Arc::new(registry),
        );
        Orchestrator::new(steps, table, &config).unwrap()
    }

    #[tokio::test]
    async fn test_triage_runs_first_and_once() {
        let orchestrator = orchestrator(RoutingTable::standard());
        let state = orchestrator
            .process_turn("what is your shipping policy?", vec![])
            .await
            .unwrap();

        assert_eq!(state.visited_steps()[0], StepId::Triage);
        assert_eq!(
            state
                .visited_steps()
                .iter()
                .filter(|s| **s == StepId::Triage)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_exactly_one_primary_handler() {
        let orchestrator = orchestrator(RoutingTable::standard());
        let state = orchestrator
            .process_turn("cancel order 9001", vec![])
            .await
            .unwrap();

        let primaries = state
            .visited_steps()
            .iter()
            .filter(|s| matches!(s, StepId::Knowledge | StepId::Action | StepId::Escalation))
            .count();
        assert_eq!(primaries, 1);
    }

    #[tokio::test]
    async fn test_terminal_response_always_set() {
        let orchestrator = orchestrator(RoutingTable::standard());
        for query in [
            "cancel order 9001",
            "what is your return policy?",
            "",
            "this is the worst, terrible experience, urgent!!",
        ] {
            let state = orchestrator.process_turn(query, vec![]).await.unwrap();
            assert!(
                state.terminal_response().is_some(),
                "no response for query: {query:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_step_rejected_at_construction() {
        let config = EngineConfig::default();
        let result = Orchestrator::new(vec![], RoutingTable::standard(), &config);
        assert!(matches!(result, Err(EngineError::MissingStep(_))));
    }

    #[tokio::test]
    async fn test_classification_before_non_triage_steps() {
        let orchestrator = orchestrator(RoutingTable::standard());
        let state = orchestrator
            .process_turn("what are your support hours?", vec![])
            .await
            .unwrap();

        // Knowledge ran, so triage must have produced a classification.
        assert!(state.visited_steps().contains(&StepId::Knowledge));
        assert_eq!(
            state.classification().unwrap().intent,
            Intent::InformationRequest
        );
    }
}
