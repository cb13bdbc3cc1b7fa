//! Refund backend and tools.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::tools::{Tool, ToolDescription, ToolError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: String,
    pub order_id: String,
    pub amount: f64,
    pub reason: String,
    pub status: String,
    pub initiated_date: NaiveDate,
    pub estimated_completion: NaiveDate,
}

/// In-memory refund store.
#[derive(Debug, Default)]
pub struct RefundStore {
    refunds: Mutex<HashMap<String, Refund>>,
}

impl RefundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a refund; completion is estimated five days out.
    pub async fn initiate(&self, order_id: &str, amount: f64, reason: &str) -> Refund {
        let today = Utc::now().date_naive();
        let refund = Refund {
            refund_id: format!("REF{}", &Uuid::new_v4().simple().to_string()[..8]),
            order_id: order_id.to_string(),
            amount,
            reason: reason.to_string(),
            status: "pending".to_string(),
            initiated_date: today,
            estimated_completion: today + Duration::days(5),
        };
        self.refunds
            .lock()
            .await
            .insert(refund.refund_id.clone(), refund.clone());
        refund
    }

    pub async fn get(&self, refund_id: &str) -> Option<Refund> {
        self.refunds.lock().await.get(refund_id).cloned()
    }
}

/// Initiate a refund against an order.
pub struct InitiateRefundTool {
    store: Arc<RefundStore>,
}

impl InitiateRefundTool {
    pub fn new(store: Arc<RefundStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for InitiateRefundTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "initiate_refund".to_string(),
            description: "Initiate a refund for a customer order".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "amount": { "type": "number", "exclusiveMinimum": 0 },
                    "reason": { "type": "string" }
                },
                "required": ["order_id", "amount"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let order_id = arguments["order_id"].as_str().unwrap_or_default();
        let amount = arguments["amount"].as_f64().unwrap_or_default();
        let reason = arguments["reason"].as_str().unwrap_or("customer request");

        let refund = self.store.initiate(order_id, amount, reason).await;
        Ok(json!({
            "refund_id": refund.refund_id,
            "order_id": refund.order_id,
            "amount": refund.amount,
            "status": refund.status,
            "initiated_date": refund.initiated_date,
            "estimated_completion": refund.estimated_completion,
        }))
    }
}

/// Look up an existing refund by id.
pub struct CheckRefundStatusTool {
    store: Arc<RefundStore>,
}

impl CheckRefundStatusTool {
    pub fn new(store: Arc<RefundStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckRefundStatusTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "check_refund_status".to_string(),
            description: "Check the status of an existing refund".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "refund_id": { "type": "string" }
                },
                "required": ["refund_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let refund_id = arguments["refund_id"].as_str().unwrap_or_default();
        let refund = self
            .store
            .get(refund_id)
            .await
            .ok_or_else(|| ToolError::NotFound(format!("refund {refund_id} not found")))?;

        Ok(json!({
            "refund_id": refund.refund_id,
            "order_id": refund.order_id,
            "amount": refund.amount,
            "status": refund.status,
            "initiated_date": refund.initiated_date,
            "estimated_completion": refund.estimated_completion,
        }))
    }
}
