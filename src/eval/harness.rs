//! Harness runner: replay queries through configured orchestrators.

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::{AblationConfig, AblationReport, EvalQuery, MetricSample, MetricsSummary};
use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::conversation::ConversationState;
use crate::error::EngineResult;
use crate::orchestrator::Orchestrator;
use crate::retrieve::Retriever;
use crate::steps::standard_steps;
use crate::tools::ToolRegistry;

/// Builds a fresh tool registry for each configuration run.
///
/// Tool backends mutate under the queries (cancelled orders stay
/// cancelled), so sharing one registry across configurations would let an
/// earlier configuration's side effects leak into a later one's metrics.
pub type RegistryFactory = dyn Fn() -> EngineResult<Arc<ToolRegistry>> + Send + Sync;

/// Replays a query set through each configuration and aggregates metrics.
///
/// Queries within one configuration run concurrently (turns share no
/// mutable state) while configurations run serially, each over freshly
/// seeded backends, with isolated sample buffers merged only into the
/// final report. With deterministic collaborators the harness adds no
/// randomness of its own: samples are ordered by query position regardless
/// of completion order.
pub struct AblationHarness {
    config: EngineConfig,
    classifier: Arc<dyn Classifier>,
    retriever: Arc<dyn Retriever>,
    registry_factory: Box<RegistryFactory>,
}

impl AblationHarness {
    pub fn new(
        config: EngineConfig,
        classifier: Arc<dyn Classifier>,
        retriever: Arc<dyn Retriever>,
        registry_factory: Box<RegistryFactory>,
    ) -> Self {
        Self {
            config,
            classifier,
            retriever,
            registry_factory,
        }
    }

    /// Harness over the standard builtin tools, reseeded per configuration.
    pub fn with_standard_tools(
        config: EngineConfig,
        classifier: Arc<dyn Classifier>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        use crate::tools::builtin::{standard_registry, BuiltinBackends};
        Self::new(
            config,
            classifier,
            retriever,
            Box::new(|| {
                let registry = standard_registry(&BuiltinBackends::seeded())?;
                Ok(Arc::new(registry))
            }),
        )
    }

    /// Run the full study: every configuration over the same query set.
    pub async fn run(
        &self,
        configurations: &[AblationConfig],
        queries: &[EvalQuery],
    ) -> EngineResult<AblationReport> {
        let sample_size = self
            .config
            .evaluation
            .sample_size
            .unwrap_or(queries.len())
            .min(queries.len());
        let queries = &queries[..sample_size];

        let mut summaries = Vec::with_capacity(configurations.len());
        for configuration in configurations {
            info!(
                configuration = %configuration.name,
                queries = queries.len(),
                "evaluating configuration"
            );
            let samples = self.evaluate_configuration(configuration, queries).await?;
            summaries.push(MetricsSummary::aggregate(&configuration.name, &samples));
        }

        Ok(AblationReport {
            configurations: summaries,
        })
    }

    /// Run one configuration over the query set, one sample per query.
    async fn evaluate_configuration(
        &self,
        configuration: &AblationConfig,
        queries: &[EvalQuery],
    ) -> EngineResult<Vec<MetricSample>> {
        let tools = (self.registry_factory)()?;
        let steps = standard_steps(
            &self.config,
            self.classifier.clone(),
            self.retriever.clone(),
            tools,
        );
        let orchestrator = Arc::new(Orchestrator::new(
            steps,
            configuration.routing.clone(),
            &self.config,
        )?);

        let mut join_set = JoinSet::new();
        for (index, query) in queries.iter().enumerate() {
            let orchestrator = orchestrator.clone();
            let query = query.clone();
            join_set.spawn(async move {
                let sample = run_query(&orchestrator, &query).await;
                (index, sample)
            });
        }

        // Collect in completion order, then restore query order so results
        // are deterministic regardless of scheduling.
        let mut indexed: Vec<(usize, MetricSample)> = Vec::with_capacity(queries.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => indexed.push(entry),
                Err(e) => error!(error = %e, "evaluation task panicked"),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, sample)| sample).collect())
    }
}

/// Process one query and derive its metric sample.
async fn run_query(orchestrator: &Orchestrator, query: &EvalQuery) -> MetricSample {
    let started = Instant::now();
    let outcome = orchestrator.process_turn(&query.text, Vec::new()).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(state) => sample_from_state(query, &state, latency_ms),
        Err(e) => {
            // A turn-level failure counts against the configuration: the
            // query was neither resolved nor handed to a human.
            error!(query_id = %query.query_id, error = %e, "turn failed during evaluation");
            MetricSample {
                query_id: query.query_id.clone(),
                resolved: false,
                escalated: false,
                steps_taken: 0,
                latency_ms,
                intent_correct: false,
                step_sequence: Vec::new(),
            }
        }
    }
}

fn sample_from_state(query: &EvalQuery, state: &ConversationState, latency_ms: f64) -> MetricSample {
    use crate::conversation::ResolutionStatus;

    let resolved = matches!(
        state.resolution,
        ResolutionStatus::Resolved | ResolutionStatus::Partial
    ) && !state.escalated();
    let intent_correct = state
        .classification()
        .map(|c| c.intent == query.ground_truth_intent)
        .unwrap_or(false);

    MetricSample {
        query_id: query.query_id.clone(),
        resolved,
        escalated: state.escalated(),
        steps_taken: state.steps_taken(),
        latency_ms,
        intent_correct,
        step_sequence: state.visited_steps().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KeywordClassifier;
    use crate::eval::dataset::builtin_queries;
    use crate::retrieve::KeywordRetriever;
    use crate::steps::StepId;

    fn harness() -> AblationHarness {
        AblationHarness::with_standard_tools(
            EngineConfig::default(),
            Arc::new(KeywordClassifier::new()),
            Arc::new(KeywordRetriever::with_default_knowledge_base()),
        )
    }

    #[tokio::test]
    async fn test_full_suite_produces_comparable_summaries() {
        let harness = harness();
        let queries = builtin_queries();
        let report = harness
            .run(&AblationConfig::builtin_suite(), &queries)
            .await
            .unwrap();

        assert_eq!(report.configurations.len(), 4);
        for summary in &report.configurations {
            assert_eq!(summary.total_queries, queries.len());
        }
    }

    #[tokio::test]
    async fn test_sample_order_matches_query_order() {
        let harness = harness();
        let queries = builtin_queries();
        let samples = harness
            .evaluate_configuration(&AblationConfig::full_system(), &queries)
            .await
            .unwrap();

        let sampled: Vec<&str> = samples.iter().map(|s| s.query_id.as_str()).collect();
        let expected: Vec<&str> = queries.iter().map(|q| q.query_id.as_str()).collect();
        assert_eq!(sampled, expected);
    }

    #[tokio::test]
    async fn test_no_followup_configuration_never_runs_followup() {
        let harness = harness();
        let samples = harness
            .evaluate_configuration(&AblationConfig::no_followup(), &builtin_queries())
            .await
            .unwrap();

        for sample in samples {
            assert!(
                !sample.step_sequence.contains(&StepId::FollowUp),
                "follow-up ran for {}",
                sample.query_id
            );
        }
    }

    #[tokio::test]
    async fn test_sample_size_caps_queries() {
        let mut config = EngineConfig::default();
        config.evaluation.sample_size = Some(3);
        let harness = AblationHarness::with_standard_tools(
            config,
            Arc::new(KeywordClassifier::new()),
            Arc::new(KeywordRetriever::with_default_knowledge_base()),
        );

        let report = harness
            .run(&[AblationConfig::full_system()], &builtin_queries())
            .await
            .unwrap();
        assert_eq!(report.configurations[0].total_queries, 3);
    }
}
