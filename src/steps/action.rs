//! Action: execute backend operations for action requests.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::{Step, StepError, StepId};
use crate::conversation::{Classification, ConversationState, ResolutionStatus};
use crate::tools::{ToolError, ToolRegistry};

/// The backend operation resolved from a classified action request.
#[derive(Debug, Clone, PartialEq)]
enum ActionPlan {
    CancelOrder { order_id: String },
    InitiateRefund { order_id: String, amount: Option<f64> },
    CheckStatus { order_id: String },
    ModifyOrder { order_id: String, new_address: String },
}

impl ActionPlan {
    fn describe(&self) -> String {
        match self {
            ActionPlan::CancelOrder { order_id } => format!("cancel order {order_id}"),
            ActionPlan::InitiateRefund { order_id, .. } => {
                format!("refund order {order_id}")
            }
            ActionPlan::CheckStatus { order_id } => format!("check order {order_id}"),
            ActionPlan::ModifyOrder { order_id, .. } => format!("update order {order_id}"),
        }
    }
}

/// Executes the tool matching the requested action.
///
/// Mutating operations run at most once per turn; a failed invocation is
/// answered with an apology and an escalation request, never a fabricated
/// success.
pub struct ActionStep {
    tools: Arc<ToolRegistry>,
    entity_confidence: f64,
}

impl ActionStep {
    pub fn new(tools: Arc<ToolRegistry>, entity_confidence: f64) -> Self {
        Self {
            tools,
            entity_confidence,
        }
    }

    /// Resolve the requested operation from the query wording and the
    /// extracted entities. Pure function.
    fn resolve_plan(
        query: &str,
        classification: &Classification,
        entity_confidence: f64,
    ) -> Option<ActionPlan> {
        let lower = query.to_lowercase();
        let order_id = classification
            .entity("order_id", entity_confidence)
            .map(str::to_string)?;

        if lower.contains("cancel") {
            Some(ActionPlan::CancelOrder { order_id })
        } else if lower.contains("refund") || lower.contains("money back") {
            let amount = classification
                .entity("amount", entity_confidence)
                .and_then(|a| a.parse::<f64>().ok());
            Some(ActionPlan::InitiateRefund { order_id, amount })
        } else if lower.contains("track") || lower.contains("status") || lower.contains("where is")
        {
            Some(ActionPlan::CheckStatus { order_id })
        } else if lower.contains("address") {
            Self::extract_address(query)
                .map(|new_address| ActionPlan::ModifyOrder { order_id, new_address })
        } else {
            None
        }
    }

    /// Pull a destination address out of "... to <address>" phrasing.
    fn extract_address(query: &str) -> Option<String> {
        static TO_CLAUSE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?i)\s+to\s+(.+?)\.?\s*$").unwrap());
        TO_CLAUSE
            .captures(query)
            .map(|c| c[1].trim().to_string())
            .filter(|address| !address.is_empty())
    }

    fn confirmation(plan: &ActionPlan, payload: &Value) -> String {
        match plan {
            ActionPlan::CancelOrder { order_id } => format!(
                "Your order {order_id} has been cancelled. A refund of ${:.2} will be returned \
                 to your original payment method within 5-7 business days.",
                payload["refund_amount"].as_f64().unwrap_or_default()
            ),
            ActionPlan::InitiateRefund { order_id, .. } => format!(
                "A refund of ${:.2} for order {order_id} has been initiated (reference {}). \
                 Expected completion: {}.",
                payload["amount"].as_f64().unwrap_or_default(),
                payload["refund_id"].as_str().unwrap_or("pending"),
                payload["estimated_completion"].as_str().unwrap_or("soon")
            ),
            ActionPlan::CheckStatus { order_id } => format!(
                "Order {order_id} is currently {}.",
                payload["status"].as_str().unwrap_or("in an unknown state")
            ),
            ActionPlan::ModifyOrder { order_id, .. } => format!(
                "Order {order_id} has been updated. New shipping address: {}.",
                payload["shipping_address"].as_str().unwrap_or("on file")
            ),
        }
    }

    /// The apology never claims the action happened.
    fn apology(plan: &ActionPlan, error: &ToolError) -> String {
        format!(
            "I'm sorry, I wasn't able to {} ({}). I'm flagging this for one of our \
             specialists, who will follow up with you shortly.",
            plan.describe(),
            error
        )
    }

    async fn execute_plan(
        &self,
        plan: &ActionPlan,
        state: &mut ConversationState,
    ) -> Result<Value, ToolError> {
        match plan {
            ActionPlan::CancelOrder { order_id } => {
                self.tools
                    .invoke(
                        "cancel_order",
                        json!({ "order_id": order_id, "reason": "customer request" }),
                        state,
                    )
                    .await
            }
            ActionPlan::InitiateRefund { order_id, amount } => {
                // No amount extracted: look the order up first so the refund
                // matches the order total. Lookup failures end the plan;
                // the refund itself must not be guessed.
                let amount = match amount {
                    Some(a) => *a,
                    None => {
                        let order = self
                            .tools
                            .invoke("check_order_status", json!({ "order_id": order_id }), state)
                            .await?;
                        order["total"].as_f64().ok_or_else(|| {
                            ToolError::ValidationFailed(format!(
                                "order {order_id} has no refundable total"
                            ))
                        })?
                    }
                };
                self.tools
                    .invoke(
                        "initiate_refund",
                        json!({
                            "order_id": order_id,
                            "amount": amount,
                            "reason": "customer request"
                        }),
                        state,
                    )
                    .await
            }
            ActionPlan::CheckStatus { order_id } => {
                self.tools
                    .invoke("check_order_status", json!({ "order_id": order_id }), state)
                    .await
            }
            ActionPlan::ModifyOrder {
                order_id,
                new_address,
            } => {
                self.tools
                    .invoke(
                        "modify_order",
                        json!({ "order_id": order_id, "new_address": new_address }),
                        state,
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl Step for ActionStep {
    fn id(&self) -> StepId {
        StepId::Action
    }

    async fn run(&self, mut state: ConversationState) -> Result<ConversationState, StepError> {
        let classification = state
            .classification()
            .cloned()
            .ok_or_else(|| StepError::new(StepId::Action, "classification missing"))?;

        let Some(plan) =
            Self::resolve_plan(state.query(), &classification, self.entity_confidence)
        else {
            // The router only sends turns here when an actionable entity is
            // present, but a plan can still fail to resolve (e.g. an
            // operation we have no tool for).
            warn!(turn_id = %state.turn_id(), "no executable action resolved");
            state.respond(
                "I wasn't able to determine which operation to perform for your request, \
                 so I'm handing this to one of our specialists.",
            );
            state.needs_escalation = true;
            state.escalation_reason = Some("no executable action resolved".to_string());
            state.resolution = ResolutionStatus::Partial;
            return Ok(state);
        };

        info!(turn_id = %state.turn_id(), action = %plan.describe(), "executing action");

        match self.execute_plan(&plan, &mut state).await {
            Ok(payload) => {
                state.respond(Self::confirmation(&plan, &payload));
                state.resolution = ResolutionStatus::Resolved;
            }
            Err(error) => {
                warn!(
                    turn_id = %state.turn_id(),
                    action = %plan.describe(),
                    error = %error,
                    "action failed"
                );
                state.respond(Self::apology(&plan, &error));
                state.needs_escalation = true;
                state.escalation_reason = Some(format!("action failed: {error}"));
                state.resolution = ResolutionStatus::Partial;
            }
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Entity, Intent, Sentiment, Urgency};
    use crate::testing::mocks::test_state_with_entities;
    use crate::tools::builtin::{standard_registry, BuiltinBackends};

    fn action_step() -> (ActionStep, BuiltinBackends) {
        let backends = BuiltinBackends::seeded();
        let registry = standard_registry(&backends).unwrap();
        (ActionStep::new(Arc::new(registry), 0.7), backends)
    }

    fn classification(entities: Vec<Entity>) -> Classification {
        Classification {
            intent: Intent::ActionRequest,
            entities,
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Medium,
        }
    }

    #[test]
    fn test_resolve_cancel_plan() {
        let c = classification(vec![Entity::new("order_id", "9001", 0.9)]);
        let plan = ActionStep::resolve_plan("please cancel order 9001", &c, 0.7).unwrap();
        assert_eq!(
            plan,
            ActionPlan::CancelOrder {
                order_id: "9001".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_modify_address_plan() {
        let c = classification(vec![Entity::new("order_id", "67890", 0.9)]);
        let plan = ActionStep::resolve_plan(
            "change the shipping address for order 67890 to 12 Pine Street.",
            &c,
            0.7,
        )
        .unwrap();
        assert_eq!(
            plan,
            ActionPlan::ModifyOrder {
                order_id: "67890".to_string(),
                new_address: "12 Pine Street".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_modify_order_applies_address() {
        let (step, backends) = action_step();
        let state = test_state_with_entities(
            "change the address on order 67890 to 12 Pine Street",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "67890", 0.9)],
        );

        let state = step.run(state).await.unwrap();
        assert!(state.terminal_response().unwrap().contains("12 Pine Street"));
        let order = backends.orders.get("67890").await.unwrap();
        assert_eq!(order.shipping_address.as_deref(), Some("12 Pine Street"));
    }

    #[test]
    fn test_low_confidence_entity_blocks_plan() {
        let c = classification(vec![Entity::new("order_id", "9001", 0.2)]);
        assert!(ActionStep::resolve_plan("cancel order 9001", &c, 0.7).is_none());
    }

    #[tokio::test]
    async fn test_successful_cancel_confirms() {
        let (step, _backends) = action_step();
        let state = test_state_with_entities(
            "cancel order 9001",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "9001", 0.9)],
        );

        let state = step.run(state).await.unwrap();
        assert!(state.terminal_response().unwrap().contains("has been cancelled"));
        assert!(!state.needs_escalation);
        assert_eq!(state.resolution, ResolutionStatus::Resolved);
        assert_eq!(state.tool_results.len(), 1);
        assert!(state.tool_results[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_failed_cancel_never_claims_success() {
        let (step, _backends) = action_step();
        let state = test_state_with_entities(
            "cancel order 40404",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "40404", 0.9)],
        );

        let state = step.run(state).await.unwrap();
        let response = state.terminal_response().unwrap();
        assert!(!response.contains("has been cancelled"));
        assert!(response.contains("sorry"));
        assert!(state.needs_escalation);
        assert_eq!(state.resolution, ResolutionStatus::Partial);
        assert!(!state.tool_results[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_refund_without_amount_looks_up_order_total() {
        let (step, _backends) = action_step();
        let state = test_state_with_entities(
            "I want a refund for order 67890",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "67890", 0.9)],
        );

        let state = step.run(state).await.unwrap();
        // Lookup plus refund, both audited in order.
        assert_eq!(state.tool_results.len(), 2);
        assert_eq!(state.tool_results[0].tool_name, "check_order_status");
        assert_eq!(state.tool_results[1].tool_name, "initiate_refund");
        assert!(state.terminal_response().unwrap().contains("$29.99"));
    }

    #[tokio::test]
    async fn test_delivered_order_cancel_is_apologized() {
        let (step, _backends) = action_step();
        let state = test_state_with_entities(
            "cancel order 55555",
            Intent::ActionRequest,
            vec![Entity::new("order_id", "55555", 0.9)],
        );

        let state = step.run(state).await.unwrap();
        assert!(state.needs_escalation);
        assert!(!state.terminal_response().unwrap().contains("has been cancelled"));
    }
}
