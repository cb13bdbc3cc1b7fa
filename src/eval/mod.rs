//! Ablation study harness.
//!
//! Replays a fixed query set through orchestrators built from named
//! configurations (a step subset plus an explicit routing-table override)
//! and aggregates comparable metrics per configuration. Same query set,
//! same metric definitions; only step composition varies.

use serde::{Deserialize, Serialize};

use crate::routing::RoutingTable;
use crate::steps::StepId;

pub mod dataset;
pub mod harness;

pub use dataset::{builtin_queries, load_queries, DatasetError, EvalQuery};
pub use harness::AblationHarness;

/// A named step subset with its routing-table override.
///
/// The fallback for every excluded step is part of the table itself, not
/// inferred at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AblationConfig {
    pub name: String,
    pub routing: RoutingTable,
}

impl AblationConfig {
    pub fn new<S: Into<String>>(name: S, routing: RoutingTable) -> Self {
        Self {
            name: name.into(),
            routing,
        }
    }

    /// All five steps with the production routing.
    pub fn full_system() -> Self {
        Self::new("full_system", RoutingTable::standard())
    }

    /// Follow-up excluded; primary handlers answer and the turn ends.
    pub fn no_followup() -> Self {
        Self::new(
            "no_followup",
            RoutingTable {
                followup: None,
                ..RoutingTable::standard()
            },
        )
    }

    /// Knowledge and follow-up excluded. Information requests have no
    /// handler and fall back to escalation.
    pub fn action_only() -> Self {
        Self::new(
            "action_only",
            RoutingTable {
                information_handler: None,
                followup: None,
                ..RoutingTable::standard()
            },
        )
    }

    /// Bare triage-and-handle routing: no follow-up, and no urgency-based
    /// escalation; triage routes purely on intent.
    pub fn minimal() -> Self {
        Self::new(
            "minimal",
            RoutingTable {
                followup: None,
                escalate_on_urgency: false,
                ..RoutingTable::standard()
            },
        )
    }

    /// The builtin study: the four configurations compared by default.
    pub fn builtin_suite() -> Vec<Self> {
        vec![
            Self::full_system(),
            Self::no_followup(),
            Self::action_only(),
            Self::minimal(),
        ]
    }
}

/// One measurement per evaluated query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub query_id: String,
    pub resolved: bool,
    pub escalated: bool,
    pub steps_taken: usize,
    pub latency_ms: f64,
    pub intent_correct: bool,
    /// Step sequence for the turn; diagnostic, not aggregated.
    pub step_sequence: Vec<StepId>,
}

/// Aggregated metrics for one configuration. Ratios are in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub configuration: String,
    pub total_queries: usize,
    /// Resolved without escalation / total.
    pub first_contact_resolution: f64,
    /// Escalated / total.
    pub escalation_rate: f64,
    /// Correctly classified intent / total.
    pub intent_accuracy: f64,
    /// Mean turn latency in milliseconds.
    pub avg_response_time_ms: f64,
}

impl MetricsSummary {
    /// Aggregate samples; mutates nothing, the samples remain the record.
    pub fn aggregate(configuration: &str, samples: &[MetricSample]) -> Self {
        let total = samples.len();
        if total == 0 {
            return Self {
                configuration: configuration.to_string(),
                total_queries: 0,
                first_contact_resolution: 0.0,
                escalation_rate: 0.0,
                intent_accuracy: 0.0,
                avg_response_time_ms: 0.0,
            };
        }

        let n = total as f64;
        let resolved = samples.iter().filter(|s| s.resolved && !s.escalated).count() as f64;
        let escalated = samples.iter().filter(|s| s.escalated).count() as f64;
        let correct = samples.iter().filter(|s| s.intent_correct).count() as f64;
        let latency: f64 = samples.iter().map(|s| s.latency_ms).sum();

        Self {
            configuration: configuration.to_string(),
            total_queries: total,
            first_contact_resolution: resolved / n,
            escalation_rate: escalated / n,
            intent_accuracy: correct / n,
            avg_response_time_ms: latency / n,
        }
    }
}

/// Comparable results for every configuration in a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AblationReport {
    pub configurations: Vec<MetricsSummary>,
}

impl AblationReport {
    /// Render the comparison table printed by the CLI.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<16} {:>8} {:>8} {:>10} {:>12} {:>12}\n",
            "configuration", "queries", "fcr", "escalation", "intent_acc", "avg_ms"
        ));
        out.push_str(&"-".repeat(70));
        out.push('\n');
        for summary in &self.configurations {
            out.push_str(&format!(
                "{:<16} {:>8} {:>7.1}% {:>9.1}% {:>11.1}% {:>12.1}\n",
                summary.configuration,
                summary.total_queries,
                summary.first_contact_resolution * 100.0,
                summary.escalation_rate * 100.0,
                summary.intent_accuracy * 100.0,
                summary.avg_response_time_ms,
            ));
        }
        out
    }
}
