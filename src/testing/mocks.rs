//! Mock implementations for testing.
//!
//! Scripted classifier/retriever/tool stand-ins so the engine can be
//! exercised without any real backend, plus conversation-state builders for
//! step-level tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::classify::{Classifier, ClassifierError};
use crate::conversation::{
    Classification, ConversationState, Entity, HistoryTurn, Intent, Sentiment, Urgency,
};
use crate::retrieve::{Retriever, RetrieverError, ScoredDocument};
use crate::tools::{Tool, ToolDescription, ToolError};

/// State with a neutral classification already set, as if triage ran.
pub fn test_state_with_classification(query: &str, intent: Intent) -> ConversationState {
    test_state_with_entities(query, intent, Vec::new())
}

/// State with a classification carrying the given entities.
pub fn test_state_with_entities(
    query: &str,
    intent: Intent,
    entities: Vec<Entity>,
) -> ConversationState {
    let mut state = ConversationState::new(query, Vec::<HistoryTurn>::new());
    state.set_classification(Classification {
        intent,
        entities,
        sentiment: Sentiment::Neutral,
        urgency: Urgency::Medium,
    });
    state
}

/// Classifier returning a fixed classification per exact query text,
/// falling back to a default for unscripted queries.
pub struct ScriptedClassifier {
    responses: HashMap<String, Classification>,
    default: Classification,
}

impl ScriptedClassifier {
    pub fn new(default: Classification) -> Self {
        Self {
            responses: HashMap::new(),
            default,
        }
    }

    pub fn with_response<S: Into<String>>(mut self, query: S, classification: Classification) -> Self {
        self.responses.insert(query.into(), classification);
        self
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        query: &str,
        _history: &[HistoryTurn],
    ) -> Result<Classification, ClassifierError> {
        Ok(self
            .responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Classifier whose backend is always down.
pub struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(
        &self,
        _query: &str,
        _history: &[HistoryTurn],
    ) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::Unavailable("mock classifier failure".to_string()))
    }
}

/// Classifier that never answers within any reasonable timeout.
pub struct SlowClassifier {
    delay: Duration,
}

impl SlowClassifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(
        &self,
        _query: &str,
        _history: &[HistoryTurn],
    ) -> Result<Classification, ClassifierError> {
        tokio::time::sleep(self.delay).await;
        Err(ClassifierError::Unavailable("too slow".to_string()))
    }
}

/// Retriever returning a fixed document list for every query.
pub struct ScriptedRetriever {
    documents: Vec<ScoredDocument>,
}

impl ScriptedRetriever {
    pub fn new(documents: Vec<ScoredDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrieverError> {
        Ok(self.documents.iter().take(top_k).cloned().collect())
    }
}

/// Retriever whose backend is always down.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RetrieverError> {
        Err(RetrieverError::Unavailable("mock retriever failure".to_string()))
    }
}

/// Tool that records every invocation and returns a scripted outcome.
pub struct RecordingTool {
    name: String,
    outcome: Result<Value, String>,
    pub invocations: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    /// A tool named `name` that always succeeds with `payload`.
    pub fn succeeding<S: Into<String>>(name: S, payload: Value) -> Self {
        Self {
            name: name.into(),
            outcome: Ok(payload),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A tool named `name` that always fails with a `NotFound` error.
    pub fn failing<S: Into<String>, M: Into<String>>(name: S, message: M) -> Self {
        Self {
            name: name.into(),
            outcome: Err(message.into()),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocation_handle(&self) -> Arc<Mutex<Vec<Value>>> {
        self.invocations.clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: format!("recording mock for {}", self.name),
            arguments: json!({ "type": "object" }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        self.invocations.lock().await.push(arguments.clone());
        match &self.outcome {
            Ok(payload) => Ok(payload.clone()),
            Err(message) => Err(ToolError::NotFound(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_classifier_falls_back_to_default() {
        let default = Classification {
            intent: Intent::InformationRequest,
            entities: vec![],
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Low,
        };
        let scripted = Classification {
            intent: Intent::ActionRequest,
            entities: vec![Entity::new("order_id", "1", 1.0)],
            sentiment: Sentiment::Negative,
            urgency: Urgency::High,
        };
        let classifier =
            ScriptedClassifier::new(default).with_response("cancel order 1", scripted);

        let hit = classifier.classify("cancel order 1", &[]).await.unwrap();
        assert_eq!(hit.intent, Intent::ActionRequest);

        let miss = classifier.classify("anything else", &[]).await.unwrap();
        assert_eq!(miss.intent, Intent::InformationRequest);
    }

    #[tokio::test]
    async fn test_recording_tool_records() {
        let tool = RecordingTool::succeeding("probe", json!({"ok": true}));
        let handle = tool.invocation_handle();

        tool.execute(&json!({"x": 1})).await.unwrap();
        assert_eq!(handle.lock().await.len(), 1);
    }
}
