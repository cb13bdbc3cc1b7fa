//! deskpilot command-line entry point.
//!
//! Three subcommands: `run` a single query through a configuration,
//! `evaluate` the ablation suite over a query set, and `config` to
//! inspect the effective configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use deskpilot::classify::KeywordClassifier;
use deskpilot::config::EngineConfig;
use deskpilot::eval::{builtin_queries, load_queries, AblationConfig, AblationHarness};
use deskpilot::observability::init_default_logging;
use deskpilot::orchestrator::Orchestrator;
use deskpilot::retrieve::KeywordRetriever;
use deskpilot::routing::RoutingTable;
use deskpilot::steps::standard_steps;
use deskpilot::tools::builtin::{standard_registry, BuiltinBackends};

/// Customer-support orchestration engine
#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(about = "Customer-support orchestration engine")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one query through a named configuration
    Run {
        /// The customer query to process
        query: String,
        /// Ablation configuration name (full_system, no_followup,
        /// action_only, minimal)
        #[arg(long, default_value = "full_system")]
        configuration: String,
    },
    /// Replay the query set through every ablation configuration
    Evaluate {
        /// JSON dataset path; falls back to config, then builtin queries
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Write the JSON report here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            query,
            configuration,
        } => run_query(config, &query, &configuration).await,
        Commands::Evaluate { dataset, output } => run_evaluation(config, dataset, output).await,
        Commands::Config { show } => show_config(config, show),
    };

    if let Err(e) = result {
        error!("command failed: {e}");
        process::exit(1);
    }
}

fn load_configuration(path: &Option<PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Ok(EngineConfig::load_from_file(path)?)
        }
        None => {
            for candidate in ["deskpilot.toml", "config/deskpilot.toml"] {
                let candidate = PathBuf::from(candidate);
                if candidate.exists() {
                    info!("loading configuration from {}", candidate.display());
                    return Ok(EngineConfig::load_from_file(&candidate)?);
                }
            }
            Ok(EngineConfig::default())
        }
    }
}

fn routing_for(name: &str) -> Option<RoutingTable> {
    AblationConfig::builtin_suite()
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.routing)
}

async fn run_query(
    config: EngineConfig,
    query: &str,
    configuration: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = routing_for(configuration)
        .ok_or_else(|| format!("unknown configuration: {configuration}"))?;

    let registry = standard_registry(&BuiltinBackends::seeded())?;
    let steps = standard_steps(
        &config,
        Arc::new(KeywordClassifier::new()),
        Arc::new(KeywordRetriever::with_default_knowledge_base()),
        Arc::new(registry),
    );
    let orchestrator = Orchestrator::new(steps, table, &config)?;

    let state = orchestrator.process_turn(query, vec![]).await?;

    println!("steps: {:?}", state.visited_steps());
    println!("escalated: {}", state.escalated());
    println!("resolution: {:?}", state.resolution);
    println!();
    println!(
        "{}",
        state.terminal_response().unwrap_or("(no response produced)")
    );
    Ok(())
}

async fn run_evaluation(
    config: EngineConfig,
    dataset: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let queries = match dataset.or_else(|| config.evaluation.dataset_path.clone().map(Into::into)) {
        Some(path) => {
            info!("loading query set from {}", path.display());
            load_queries(&path)?
        }
        None => {
            info!("no dataset configured; using builtin query set");
            builtin_queries()
        }
    };

    let harness = AblationHarness::with_standard_tools(
        config.clone(),
        Arc::new(KeywordClassifier::new()),
        Arc::new(KeywordRetriever::with_default_knowledge_base()),
    );

    let report = harness
        .run(&AblationConfig::builtin_suite(), &queries)
        .await?;

    println!("{}", report.render_table());

    let report_path = output.or_else(|| config.evaluation.report_path.clone().map(Into::into));
    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        info!("report written to {}", path.display());
    }
    Ok(())
}

fn show_config(config: EngineConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }
    info!("configuration is valid");
    Ok(())
}
