//! deskpilot - customer-support orchestration engine
//!
//! Routes customer-support queries through role-differentiated processing
//! steps and scores the results. The crate provides:
//! - the routing state machine that sequences Triage, Knowledge, Action,
//!   Follow-Up, and Escalation over one conversation turn;
//! - a schema-validated, audited tool invocation protocol;
//! - an ablation harness that replays a fixed query set through
//!   configurable step subsets and aggregates comparable metrics.
//!
//! Classification, retrieval, and tool execution are external
//! collaborators behind traits; the engine works with any implementation
//! that honors the contracts.
//!
//! # Quick start
//!
//! ```rust
//! use deskpilot::classify::KeywordClassifier;
//! use deskpilot::config::EngineConfig;
//! use deskpilot::orchestrator::Orchestrator;
//! use deskpilot::retrieve::KeywordRetriever;
//! use deskpilot::routing::RoutingTable;
//! use deskpilot::steps::standard_steps;
//! use deskpilot::tools::builtin::{standard_registry, BuiltinBackends};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let registry = standard_registry(&BuiltinBackends::seeded())?;
//! let steps = standard_steps(
//!     &config,
//!     Arc::new(KeywordClassifier::new()),
//!     Arc::new(KeywordRetriever::with_default_knowledge_base()),
//!     Arc::new(registry),
//! );
//! let orchestrator = Orchestrator::new(steps, RoutingTable::standard(), &config)?;
//!
//! let state = orchestrator.process_turn("cancel order 9001", vec![]).await?;
//! assert!(state.terminal_response().is_some());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod conversation;
pub mod error;
pub mod eval;
pub mod observability;
pub mod orchestrator;
pub mod retrieve;
pub mod routing;
pub mod steps;
pub mod testing;
pub mod tools;

pub use config::EngineConfig;
pub use conversation::{Classification, ConversationState, HistoryTurn, Intent};
pub use error::{EngineError, EngineResult};
pub use orchestrator::Orchestrator;
pub use routing::{RouteDecision, RoutingTable};
pub use steps::{Step, StepId};
pub use tools::{Tool, ToolDescription, ToolError, ToolRegistry};
