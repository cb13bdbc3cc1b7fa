//! Lookup-only company information tool, consumed by the Knowledge step.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolDescription, ToolError};

const TOPICS: &[(&str, &str)] = &[
    (
        "shipping",
        "Standard shipping takes 3-5 business days; orders over $50 ship free. Express and overnight options are available at checkout.",
    ),
    (
        "returns",
        "Items can be returned within 30 days of delivery for a full refund. All products carry a one-year limited warranty.",
    ),
    (
        "contact",
        "Support is available Monday through Friday, 9 AM to 6 PM, by phone or email. Most issues are resolved within 24-48 hours.",
    ),
    (
        "payments",
        "We accept all major credit and debit cards and store credit. Cards are charged when the order ships.",
    ),
];

/// Read-only lookup of company policy topics.
#[derive(Debug, Default)]
pub struct CompanyInfoTool;

impl CompanyInfoTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CompanyInfoTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "company_info".to_string(),
            description: "Look up company policy information by topic".to_string(),
            arguments: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "enum": ["shipping", "returns", "contact", "payments"]
                    }
                },
                "required": ["topic"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let topic = arguments["topic"].as_str().unwrap_or_default();
        let info = TOPICS
            .iter()
            .find(|(name, _)| *name == topic)
            .map(|(_, text)| *text)
            .ok_or_else(|| ToolError::NotFound(format!("no information on topic {topic}")))?;

        Ok(json!({ "topic": topic, "info": info }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_topic() {
        let tool = CompanyInfoTool::new();
        let payload = tool.execute(&json!({"topic": "shipping"})).await.unwrap();
        assert!(payload["info"].as_str().unwrap().contains("3-5 business days"));
    }
}
