//! Tool registry and invocation protocol.
//!
//! A tool is a named operation with a declared JSON-Schema argument shape
//! and an execute function returning a success payload or a typed failure.
//! Steps look tools up by name through the [`ToolRegistry`]; they never
//! hold a backend directly, which keeps step logic decoupled from backend
//! specifics.
//!
//! The invocation contract:
//! 1. arguments are validated against the declared schema before execution;
//!    a mismatch is [`ToolError::InvalidArguments`] and never reaches the
//!    backend;
//! 2. execution may mutate backend state, so callers invoke each resolved
//!    action at most once per turn;
//! 3. every invocation, success or failure, is appended to the turn's
//!    `tool_results` audit trail.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::conversation::{ConversationState, ToolInvocation, ToolOutcome};

pub mod builtin;

/// Tool interface: a described, schema-validated operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, human description, and JSON-Schema argument declaration.
    fn describe(&self) -> ToolDescription;

    /// Execute with arguments already validated against the schema.
    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError>;
}

/// Tool metadata and argument schema.
#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub arguments: Value,
}

/// Tool protocol errors.
///
/// `InvalidArguments` is raised by the registry before the backend ever
/// sees the call; the remaining variants are typed backend failures.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Registry mapping tool name to implementation.
///
/// Registration compiles each tool's schema, so a malformed declaration
/// fails at startup rather than on first use.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool under the name it describes itself with.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let description = tool.describe();
        jsonschema::validator_for(&description.arguments)
            .map_err(|e| ToolError::SchemaError(format!("schema compilation error: {e}")))?;

        debug!(tool = %description.name, "registered tool");
        self.tools.insert(description.name, tool);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn describe(&self, name: &str) -> Option<ToolDescription> {
        self.tools.get(name).map(|tool| tool.describe())
    }

    /// Names of all registered tools.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke a tool and append the outcome to the turn's audit trail.
    ///
    /// Validation failures, unknown tools, and backend failures are all
    /// recorded; callers never need a second bookkeeping path.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        state: &mut ConversationState,
    ) -> Result<Value, ToolError> {
        let result = self.dispatch(name, &arguments).await;

        let outcome = match &result {
            Ok(payload) => ToolOutcome::Success {
                payload: payload.clone(),
            },
            Err(error) => {
                warn!(tool = name, error = %error, "tool invocation failed");
                ToolOutcome::Failure {
                    reason: error.to_string(),
                }
            }
        };
        state.record_tool_invocation(ToolInvocation {
            tool_name: name.to_string(),
            arguments,
            outcome,
            recorded_at: Utc::now(),
        });

        result
    }

    async fn dispatch(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        self.validate_arguments(tool.as_ref(), arguments)?;
        tool.execute(arguments).await
    }

    /// Validate arguments against the tool's declared schema.
    fn validate_arguments(&self, tool: &dyn Tool, arguments: &Value) -> Result<(), ToolError> {
        let description = tool.describe();
        let validator = jsonschema::validator_for(&description.arguments)
            .map_err(|e| ToolError::SchemaError(format!("schema compilation error: {e}")))?;

        validator.validate(arguments).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("at '{}': {}", e.instance_path, e))
                .collect();
            ToolError::InvalidArguments(error_messages.join("; "))
        })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo back the message".to_string(),
                arguments: json!({
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" }
                    },
                    "required": ["message"],
                    "additionalProperties": false
                }),
            }
        }

        async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
            Ok(json!({ "echoed": arguments["message"] }))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_invoke_success_is_audited() {
        let registry = registry();
        let mut state = ConversationState::new("test", vec![]);

        let payload = registry
            .invoke("echo", json!({"message": "hi"}), &mut state)
            .await
            .unwrap();

        assert_eq!(payload, json!({"echoed": "hi"}));
        assert_eq!(state.tool_results.len(), 1);
        assert!(state.tool_results[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_rejected_and_audited() {
        let registry = registry();
        let mut state = ConversationState::new("test", vec![]);

        let result = registry
            .invoke("echo", json!({"message": 42}), &mut state)
            .await;

        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
        // The failed attempt still lands in the audit trail.
        assert_eq!(state.tool_results.len(), 1);
        assert!(!state.tool_results[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry();
        let mut state = ConversationState::new("test", vec![]);

        let result = registry.invoke("nope", json!({}), &mut state).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
        assert_eq!(state.tool_results.len(), 1);
    }

    #[tokio::test]
    async fn test_extra_argument_rejected() {
        let registry = registry();
        let mut state = ConversationState::new("test", vec![]);

        let result = registry
            .invoke("echo", json!({"message": "hi", "extra": true}), &mut state)
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn test_names_sorted() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo".to_string()]);
        assert!(registry.contains("echo"));
        assert!(!registry.contains("missing"));
    }
}
