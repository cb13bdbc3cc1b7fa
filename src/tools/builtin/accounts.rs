//! Account backend and tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::tools::{Tool, ToolDescription, ToolError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub address: String,
}

/// In-memory account store.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed_data() -> Self {
        let seeds = [
            Account {
                customer_id: "CUST001".to_string(),
                name: "Jordan Reyes".to_string(),
                email: "jordan.reyes@example.com".to_string(),
                address: "42 Cedar Lane, Springfield".to_string(),
            },
            Account {
                customer_id: "CUST002".to_string(),
                name: "Sam Okafor".to_string(),
                email: "sam.okafor@example.com".to_string(),
                address: "7 Birch Road, Riverton".to_string(),
            },
        ];
        let accounts = seeds
            .into_iter()
            .map(|account| (account.customer_id.clone(), account))
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    pub async fn get(&self, customer_id: &str) -> Option<Account> {
        self.accounts.lock().await.get(customer_id).cloned()
    }

    pub async fn update_address(
        &self,
        customer_id: &str,
        new_address: &str,
    ) -> Result<Account, ToolError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(customer_id)
            .ok_or_else(|| ToolError::NotFound(format!("customer {customer_id} not found")))?;
        account.address = new_address.to_string();
        Ok(account.clone())
    }
}

/// Update a customer's default shipping address.
pub struct UpdateAddressTool {
    store: Arc<AccountStore>,
}

impl UpdateAddressTool {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateAddressTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "update_address".to_string(),
            description: "Update a customer's default shipping address".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "customer_id": { "type": "string" },
                    "new_address": { "type": "string" }
                },
                "required": ["customer_id", "new_address"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let customer_id = arguments["customer_id"].as_str().unwrap_or_default();
        let new_address = arguments["new_address"].as_str().unwrap_or_default();

        let account = self.store.update_address(customer_id, new_address).await?;
        Ok(json!({
            "customer_id": account.customer_id,
            "new_address": account.address,
        }))
    }
}

/// Send a password reset link to the customer's email on file.
pub struct ResetPasswordTool {
    store: Arc<AccountStore>,
}

impl ResetPasswordTool {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ResetPasswordTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "reset_password".to_string(),
            description: "Send a password reset link to the customer's email".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "customer_id": { "type": "string" }
                },
                "required": ["customer_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let customer_id = arguments["customer_id"].as_str().unwrap_or_default();
        let account = self
            .store
            .get(customer_id)
            .await
            .ok_or_else(|| ToolError::NotFound(format!("customer {customer_id} not found")))?;

        Ok(json!({
            "customer_id": account.customer_id,
            "message": format!("password reset link sent to {}", account.email),
        }))
    }
}

/// Retrieve customer account details.
pub struct GetAccountInfoTool {
    store: Arc<AccountStore>,
}

impl GetAccountInfoTool {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetAccountInfoTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_account_info".to_string(),
            description: "Retrieve customer account information".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "customer_id": { "type": "string" }
                },
                "required": ["customer_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let customer_id = arguments["customer_id"].as_str().unwrap_or_default();
        let account = self
            .store
            .get(customer_id)
            .await
            .ok_or_else(|| ToolError::NotFound(format!("customer {customer_id} not found")))?;

        Ok(json!({
            "customer_id": account.customer_id,
            "name": account.name,
            "email": account.email,
            "address": account.address,
        }))
    }
}
