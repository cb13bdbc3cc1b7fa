//! Knowledge: answer information requests from retrieved context.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Step, StepError, StepId};
use crate::conversation::{ConversationState, ResolutionStatus};
use crate::retrieve::Retriever;
use crate::tools::ToolRegistry;

const CLOSING_LINE: &str =
    "For further assistance, our support team is available Monday through Friday, 9 AM to 6 PM.";

/// Answers information requests using the retriever, optionally grounding
/// policy questions through the lookup-only `company_info` tool.
///
/// Retrieval unavailability degrades to a no-context response; it never
/// fails the turn.
pub struct KnowledgeStep {
    retriever: Arc<dyn Retriever>,
    tools: Arc<ToolRegistry>,
    top_k: usize,
    timeout: Duration,
}

impl KnowledgeStep {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        tools: Arc<ToolRegistry>,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            tools,
            top_k,
            timeout,
        }
    }

    /// Map a query onto a company-info topic, if one clearly applies.
    fn company_topic(query: &str) -> Option<&'static str> {
        let lower = query.to_lowercase();
        if ["shipping", "ship", "delivery", "deliver"]
            .iter()
            .any(|w| lower.contains(w))
        {
            Some("shipping")
        } else if ["return", "warranty", "guarantee"].iter().any(|w| lower.contains(w)) {
            Some("returns")
        } else if ["contact", "phone", "email", "support hours"]
            .iter()
            .any(|w| lower.contains(w))
        {
            Some("contact")
        } else if ["payment", "billing", "charge", "card"].iter().any(|w| lower.contains(w)) {
            Some("payments")
        } else {
            None
        }
    }

    fn compose_response(context: &[String]) -> String {
        if context.is_empty() {
            format!(
                "Thanks for reaching out. I could not find a specific answer to your question, \
                 but our support team can help directly. {CLOSING_LINE}"
            )
        } else {
            format!("{} {CLOSING_LINE}", context.join(" "))
        }
    }
}

#[async_trait]
impl Step for KnowledgeStep {
    fn id(&self) -> StepId {
        StepId::Knowledge
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, StepError> {
        let mut context: Vec<String> = Vec::new();

        // Policy topics are grounded through the lookup tool so the call
        // lands in the audit trail like any other tool use.
        if let Some(topic) = Self::company_topic(state.query()) {
            match self
                .tools
                .invoke("company_info", json!({ "topic": topic }), &mut state)
                .await
            {
                Ok(payload) => {
                    if let Some(info) = payload["info"].as_str() {
                        context.push(info.to_string());
                    }
                }
                Err(e) => debug!(topic, error = %e, "company info lookup failed"),
            }
        }

        let retrieval = self.retriever.retrieve(state.query(), self.top_k);
        match tokio::time::timeout(self.timeout, retrieval).await {
            Ok(Ok(documents)) => {
                info!(
                    turn_id = %state.turn_id(),
                    retrieved = documents.len(),
                    "knowledge retrieval complete"
                );
                // Ground the answer in the single best document; weaker
                // matches add noise, not signal.
                if let Some(best) = documents.first() {
                    if !context.iter().any(|c| c == &best.text) {
                        context.push(best.text.clone());
                    }
                }
            }
            Ok(Err(e)) => {
                // Backend unavailability degrades to a no-context answer.
                warn!(turn_id = %state.turn_id(), error = %e, "retrieval unavailable, degrading");
            }
            Err(_) => {
                warn!(
                    turn_id = %state.turn_id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "retrieval timed out, degrading"
                );
            }
        }

        state.respond(Self::compose_response(&context));
        state.resolution = ResolutionStatus::Resolved;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::KeywordRetriever;
    use crate::testing::mocks::{test_state_with_classification, FailingRetriever};
    use crate::tools::builtin::{standard_registry, BuiltinBackends};
    use crate::conversation::Intent;

    fn knowledge_step(retriever: Arc<dyn Retriever>) -> KnowledgeStep {
        let registry = standard_registry(&BuiltinBackends::seeded()).unwrap();
        KnowledgeStep::new(retriever, Arc::new(registry), 5, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_answers_from_retrieved_context() {
        let step = knowledge_step(Arc::new(KeywordRetriever::with_default_knowledge_base()));
        let state = test_state_with_classification(
            "what is your return policy?",
            Intent::InformationRequest,
        );

        let state = step.run(state).await.unwrap();
        let response = state.terminal_response().unwrap();
        assert!(response.contains("30 days"));
        assert_eq!(state.resolution, ResolutionStatus::Resolved);
        assert!(!state.needs_escalation);
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades() {
        let step = knowledge_step(Arc::new(FailingRetriever));
        let state = test_state_with_classification(
            "tell me about quantum entanglement",
            Intent::InformationRequest,
        );

        let state = step.run(state).await.unwrap();
        // Degraded, but the turn still gets an answer and is not escalated.
        assert!(state.terminal_response().is_some());
        assert!(!state.needs_escalation);
        assert_eq!(state.resolution, ResolutionStatus::Resolved);
    }

    #[tokio::test]
    async fn test_policy_question_uses_lookup_tool() {
        let step = knowledge_step(Arc::new(KeywordRetriever::new(vec![])));
        let state =
            test_state_with_classification("how long does shipping take?", Intent::InformationRequest);

        let state = step.run(state).await.unwrap();
        assert_eq!(state.tool_results.len(), 1);
        assert_eq!(state.tool_results[0].tool_name, "company_info");
        assert!(state.terminal_response().unwrap().contains("3-5 business days"));
    }
}
