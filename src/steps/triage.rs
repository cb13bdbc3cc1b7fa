//! Triage: classify the query and seed routing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{Step, StepError, StepId};
use crate::classify::Classifier;
use crate::conversation::ConversationState;

/// First step of every turn. Sets the classification; never sets the
/// terminal response.
pub struct TriageStep {
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
}

impl TriageStep {
    pub fn new(classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }
}

#[async_trait]
impl Step for TriageStep {
    fn id(&self) -> StepId {
        StepId::Triage
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, StepError> {
        let classify = self.classifier.classify(state.query(), &state.history);

        match tokio::time::timeout(self.timeout, classify).await {
            Ok(Ok(classification)) => {
                info!(
                    turn_id = %state.turn_id(),
                    intent = %classification.intent,
                    urgency = ?classification.urgency,
                    entities = classification.entities.len(),
                    "triage classified query"
                );
                state.set_classification(classification);
                Ok(state)
            }
            Ok(Err(e)) => {
                // Routing cannot proceed without a classification; the
                // orchestrator escalates rather than retrying.
                Err(StepError::new(StepId::Triage, e.to_string()))
            }
            Err(_) => {
                warn!(
                    turn_id = %state.turn_id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classifier timed out"
                );
                state.needs_escalation = true;
                state.escalation_reason = Some("classification timed out".to_string());
                Ok(state)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KeywordClassifier;
    use crate::conversation::Intent;
    use crate::testing::mocks::{FailingClassifier, SlowClassifier};

    fn step(classifier: Arc<dyn Classifier>) -> TriageStep {
        TriageStep::new(classifier, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_sets_classification() {
        let step = step(Arc::new(KeywordClassifier::new()));
        let state = ConversationState::new("cancel order 9001", vec![]);

        let state = step.run(state).await.unwrap();
        let classification = state.classification().unwrap();
        assert_eq!(classification.intent, Intent::ActionRequest);
        assert!(state.terminal_response().is_none());
    }

    #[tokio::test]
    async fn test_classifier_failure_is_step_error() {
        let step = step(Arc::new(FailingClassifier));
        let state = ConversationState::new("anything", vec![]);

        let err = step.run(state).await.unwrap_err();
        assert_eq!(err.step, StepId::Triage);
    }

    #[tokio::test]
    async fn test_timeout_requests_escalation_instead_of_hanging() {
        let step = TriageStep::new(
            Arc::new(SlowClassifier::new(Duration::from_secs(5))),
            Duration::from_millis(20),
        );
        let state = ConversationState::new("anything", vec![]);

        let state = step.run(state).await.unwrap();
        assert!(state.needs_escalation);
        assert!(state.classification().is_none());
    }
}
