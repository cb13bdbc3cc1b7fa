//! Builtin tool implementations over in-memory backends.
//!
//! Each backend owns its own data; tools are thin, schema-described
//! adapters over a shared `Arc` handle. The standard registry wires up the
//! full set the Action and Knowledge steps expect.

use std::sync::Arc;

use super::{ToolError, ToolRegistry};

pub mod accounts;
pub mod company;
pub mod orders;
pub mod refunds;

pub use accounts::{Account, AccountStore, GetAccountInfoTool, ResetPasswordTool, UpdateAddressTool};
pub use company::CompanyInfoTool;
pub use orders::{
    CancelOrderTool, CheckOrderStatusTool, ModifyOrderTool, Order, OrderStatus, OrderStore,
};
pub use refunds::{CheckRefundStatusTool, InitiateRefundTool, Refund, RefundStore};

/// Shared handles to the builtin backends.
///
/// Kept by callers that need to inspect or reseed backend state (tests,
/// the evaluation harness); the registry holds its own clones.
#[derive(Clone)]
pub struct BuiltinBackends {
    pub orders: Arc<OrderStore>,
    pub refunds: Arc<RefundStore>,
    pub accounts: Arc<AccountStore>,
}

impl BuiltinBackends {
    pub fn seeded() -> Self {
        Self {
            orders: Arc::new(OrderStore::with_seed_data()),
            refunds: Arc::new(RefundStore::new()),
            accounts: Arc::new(AccountStore::with_seed_data()),
        }
    }
}

/// Build the standard tool registry over the given backends.
pub fn standard_registry(backends: &BuiltinBackends) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CheckOrderStatusTool::new(backends.orders.clone())))?;
    registry.register(Box::new(CancelOrderTool::new(backends.orders.clone())))?;
    registry.register(Box::new(ModifyOrderTool::new(backends.orders.clone())))?;
    registry.register(Box::new(InitiateRefundTool::new(backends.refunds.clone())))?;
    registry.register(Box::new(CheckRefundStatusTool::new(backends.refunds.clone())))?;
    registry.register(Box::new(UpdateAddressTool::new(backends.accounts.clone())))?;
    registry.register(Box::new(ResetPasswordTool::new(backends.accounts.clone())))?;
    registry.register(Box::new(GetAccountInfoTool::new(backends.accounts.clone())))?;
    registry.register(Box::new(CompanyInfoTool::new()))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_contents() {
        let registry = standard_registry(&BuiltinBackends::seeded()).unwrap();
        for name in [
            "check_order_status",
            "cancel_order",
            "modify_order",
            "initiate_refund",
            "check_refund_status",
            "update_address",
            "reset_password",
            "get_account_info",
            "company_info",
        ] {
            assert!(registry.contains(name), "missing tool: {name}");
        }
    }
}
