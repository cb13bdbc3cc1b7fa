//! Order backend and the state-mutating tools over it.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::tools::{Tool, ToolDescription, ToolError};

/// Lifecycle of an order in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub items: Vec<String>,
    pub total: f64,
    pub created_date: NaiveDate,
    pub shipped_date: Option<NaiveDate>,
    pub shipping_address: Option<String>,
}

/// In-memory order store shared by the order tools.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: Mutex<HashMap<String, Order>>,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    // Seed dates are compile-time constants; out-of-range is unreachable.
    NaiveDate::from_ymd_opt(y, m, d).expect("valid seed date")
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a handful of representative orders.
    pub fn with_seed_data() -> Self {
        let seeds = [
            Order {
                order_id: "12345".to_string(),
                customer_id: "CUST001".to_string(),
                status: OrderStatus::Shipped,
                items: vec!["Laptop".to_string(), "Mouse".to_string()],
                total: 1299.99,
                created_date: date(2024, 11, 20),
                shipped_date: Some(date(2024, 11, 22)),
                shipping_address: None,
            },
            Order {
                order_id: "67890".to_string(),
                customer_id: "CUST002".to_string(),
                status: OrderStatus::Processing,
                items: vec!["Phone Case".to_string()],
                total: 29.99,
                created_date: date(2024, 11, 28),
                shipped_date: None,
                shipping_address: None,
            },
            Order {
                order_id: "9001".to_string(),
                customer_id: "CUST001".to_string(),
                status: OrderStatus::Processing,
                items: vec!["Wireless Headphones".to_string()],
                total: 89.99,
                created_date: date(2024, 12, 1),
                shipped_date: None,
                shipping_address: None,
            },
            Order {
                order_id: "55555".to_string(),
                customer_id: "CUST002".to_string(),
                status: OrderStatus::Delivered,
                items: vec!["USB Cable".to_string()],
                total: 12.99,
                created_date: date(2024, 10, 2),
                shipped_date: Some(date(2024, 10, 4)),
                shipping_address: None,
            },
        ];

        let orders = seeds
            .into_iter()
            .map(|order| (order.order_id.clone(), order))
            .collect();
        Self {
            orders: Mutex::new(orders),
        }
    }

    pub async fn insert(&self, order: Order) {
        self.orders.lock().await.insert(order.order_id.clone(), order);
    }

    pub async fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.lock().await.get(order_id).cloned()
    }

    /// Cancel an order. Delivered and already-cancelled orders cannot be
    /// cancelled.
    pub async fn cancel(&self, order_id: &str, reason: &str) -> Result<Value, ToolError> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| ToolError::NotFound(format!("order {order_id} not found")))?;

        match order.status {
            OrderStatus::Delivered => Err(ToolError::InvalidState(format!(
                "order {order_id} was already delivered; request a return instead"
            ))),
            OrderStatus::Cancelled => Err(ToolError::InvalidState(format!(
                "order {order_id} is already cancelled"
            ))),
            _ => {
                order.status = OrderStatus::Cancelled;
                Ok(json!({
                    "order_id": order.order_id,
                    "status": order.status.as_str(),
                    "refund_amount": order.total,
                    "reason": reason,
                }))
            }
        }
    }

    /// Apply changes to an order still in pending or processing state.
    pub async fn modify(
        &self,
        order_id: &str,
        new_address: Option<&str>,
    ) -> Result<Value, ToolError> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| ToolError::NotFound(format!("order {order_id} not found")))?;

        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Processing) {
            return Err(ToolError::InvalidState(format!(
                "cannot modify order {order_id} with status {}",
                order.status.as_str()
            )));
        }

        if let Some(address) = new_address {
            order.shipping_address = Some(address.to_string());
        }

        Ok(json!({
            "order_id": order.order_id,
            "status": order.status.as_str(),
            "shipping_address": order.shipping_address,
        }))
    }
}

/// Look up the current status of an order.
pub struct CheckOrderStatusTool {
    store: Arc<OrderStore>,
}

impl CheckOrderStatusTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckOrderStatusTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "check_order_status".to_string(),
            description: "Check the current status of a customer order".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" }
                },
                "required": ["order_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let order_id = arguments["order_id"].as_str().unwrap_or_default();
        let order = self
            .store
            .get(order_id)
            .await
            .ok_or_else(|| ToolError::NotFound(format!("order {order_id} not found")))?;

        Ok(json!({
            "order_id": order.order_id,
            "status": order.status.as_str(),
            "items": order.items,
            "total": order.total,
            "created_date": order.created_date,
            "shipped_date": order.shipped_date,
        }))
    }
}

/// Cancel an order that has not yet been delivered.
pub struct CancelOrderTool {
    store: Arc<OrderStore>,
}

impl CancelOrderTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelOrderTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "cancel_order".to_string(),
            description: "Cancel a customer order that has not been delivered".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "reason": { "type": "string" }
                },
                "required": ["order_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let order_id = arguments["order_id"].as_str().unwrap_or_default();
        let reason = arguments["reason"].as_str().unwrap_or("customer request");
        self.store.cancel(order_id, reason).await
    }
}

/// Change the shipping address on a not-yet-shipped order.
pub struct ModifyOrderTool {
    store: Arc<OrderStore>,
}

impl ModifyOrderTool {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ModifyOrderTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "modify_order".to_string(),
            description: "Modify a pending or processing order (shipping address)".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "new_address": { "type": "string" }
                },
                "required": ["order_id", "new_address"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let order_id = arguments["order_id"].as_str().unwrap_or_default();
        let new_address = arguments["new_address"].as_str();
        self.store.modify(order_id, new_address).await
    }
}
