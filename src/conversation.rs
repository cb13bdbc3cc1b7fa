//! Conversation state threaded through one orchestrated turn.
//!
//! A `ConversationState` is owned by the orchestrator for the duration of a
//! turn. Steps receive it by value, mutate their slice of it, and hand it
//! back; no step retains a reference across turns. The audit-sensitive parts
//! (original query, classification, escalation flag, tool trail) are kept
//! behind methods so their invariants hold no matter which step is running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::steps::StepId;

/// Who authored a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Assistant,
}

/// One prior exchange in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

impl HistoryTurn {
    pub fn customer<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Customer,
            text: text.into(),
        }
    }

    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Classified intent of a customer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    InformationRequest,
    ActionRequest,
    Complaint,
    /// Classifier could not resolve the intent; routed to escalation.
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::InformationRequest => "information_request",
            Intent::ActionRequest => "action_request",
            Intent::Complaint => "complaint",
            Intent::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "information_request" => Ok(Intent::InformationRequest),
            "action_request" => Ok(Intent::ActionRequest),
            "complaint" => Ok(Intent::Complaint),
            "unknown" => Ok(Intent::Unknown),
            other => Err(format!("unrecognized intent: {other}")),
        }
    }
}

/// Customer sentiment as assessed by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

/// Urgency level assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// A named value extracted from the query, with classifier confidence.
///
/// Downstream steps treat entities below their configured confidence
/// threshold as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub value: String,
    pub confidence: f64,
}

impl Entity {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V, confidence: f64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            confidence,
        }
    }
}

/// Triage output: set once per turn, read by every downstream step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub entities: Vec<Entity>,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
}

impl Classification {
    /// Look up an entity by name, ignoring extractions below `min_confidence`.
    pub fn entity(&self, name: &str, min_confidence: f64) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.name == name && e.confidence >= min_confidence)
            .map(|e| e.value.as_str())
    }
}

/// Result of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: Value },
    Failure { reason: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }
}

/// Audit record for one tool invocation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Value,
    pub outcome: ToolOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// How the turn ended, from the customer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    /// An action was attempted but did not fully succeed.
    Partial,
    Escalated,
    #[default]
    Unresolved,
}

/// The unit of work passed between steps for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    turn_id: Uuid,
    query: String,
    classification: Option<Classification>,
    terminal_response: Option<String>,
    escalated: bool,
    /// Ordered prior turns; append-only.
    pub history: Vec<HistoryTurn>,
    /// Audit trail of every tool invocation this turn; append-only.
    pub tool_results: Vec<ToolInvocation>,
    visited_steps: Vec<StepId>,
    /// Set by a step that hit an unrecoverable condition; the orchestrator
    /// reroutes to escalation instead of follow-up.
    pub needs_escalation: bool,
    pub escalation_reason: Option<String>,
    pub resolution: ResolutionStatus,
}

impl ConversationState {
    pub fn new<S: Into<String>>(query: S, history: Vec<HistoryTurn>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            query: query.into(),
            classification: None,
            terminal_response: None,
            escalated: false,
            history,
            tool_results: Vec::new(),
            visited_steps: Vec::new(),
            needs_escalation: false,
            escalation_reason: None,
            resolution: ResolutionStatus::Unresolved,
        }
    }

    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    /// The original customer query. Immutable after creation.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    /// Record the triage classification. Set at most once per turn; a second
    /// attempt is ignored.
    pub fn set_classification(&mut self, classification: Classification) {
        if self.classification.is_some() {
            warn!(turn_id = %self.turn_id, "classification already set; ignoring overwrite");
            return;
        }
        self.classification = Some(classification);
    }

    pub fn terminal_response(&self) -> Option<&str> {
        self.terminal_response.as_deref()
    }

    /// Set the customer-facing response for this turn.
    pub fn respond<S: Into<String>>(&mut self, text: S) {
        self.terminal_response = Some(text.into());
    }

    /// Append to the existing response (follow-up remarks). Sets the
    /// response if none exists yet.
    pub fn append_response(&mut self, text: &str) {
        match &mut self.terminal_response {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            None => self.terminal_response = Some(text.to_string()),
        }
    }

    pub fn escalated(&self) -> bool {
        self.escalated
    }

    /// Mark the conversation escalated. Permanent: there is no way back.
    pub fn mark_escalated<S: Into<String>>(&mut self, reason: S) {
        self.escalated = true;
        self.resolution = ResolutionStatus::Escalated;
        if self.escalation_reason.is_none() {
            self.escalation_reason = Some(reason.into());
        }
    }

    /// Step identifiers already executed this turn, in dispatch order.
    ///
    /// This is the loop-prevention record. Only the orchestrator appends
    /// to it; the field is not writable from step implementations.
    pub fn visited_steps(&self) -> &[StepId] {
        &self.visited_steps
    }

    pub(crate) fn record_visit(&mut self, step: StepId) {
        self.visited_steps.push(step);
    }

    /// Append one invocation record to the audit trail.
    pub fn record_tool_invocation(&mut self, record: ToolInvocation) {
        self.tool_results.push(record);
    }

    /// Whether any tool call this turn succeeded.
    pub fn any_tool_success(&self) -> bool {
        self.tool_results.iter().any(|r| r.outcome.is_success())
    }

    /// The most recent failed tool invocation, if any.
    pub fn last_tool_failure(&self) -> Option<&ToolInvocation> {
        self.tool_results
            .iter()
            .rev()
            .find(|r| !r.outcome.is_success())
    }

    pub fn steps_taken(&self) -> usize {
        self.visited_steps.len()
    }
}
