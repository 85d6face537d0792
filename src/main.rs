//! Goalkeeper CLI entry point: boots the orchestrator against the in-memory
//! reference adapters and null collaborators, wired from `EngineConfig`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goalkeeper::adapters::{InMemoryGoalRepository, InMemorySkillRepository};
use goalkeeper::domain::models::GoalType;
use goalkeeper::domain::ports::{NullActionExecutor, NullLlmService, NullMemorySearcher};
use goalkeeper::infrastructure::config::ConfigLoader;
use goalkeeper::infrastructure::logging;
use goalkeeper::services::orchestrator::OrchestratorConfig;
use goalkeeper::GoalOrchestrator;
use tracing::info;

#[derive(Parser)]
#[command(name = "goalkeeper", about = "Autonomous goal lifecycle orchestrator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose a new user goal, then run a single cycle.
    Propose {
        title: String,
        description: String,
        #[arg(long, default_value = "5.0")]
        time_score: f64,
    },
    /// Run cycles on a fixed interval until interrupted.
    Run {
        #[arg(long)]
        cycles: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    logging::init(&config.logging).context("failed to initialize logging")?;

    let cli = Cli::parse();

    let goals = Arc::new(InMemoryGoalRepository::new());
    let skills = Arc::new(InMemorySkillRepository::new());
    let orchestrator = GoalOrchestrator::new(
        goals,
        skills,
        Arc::new(NullMemorySearcher),
        Arc::new(NullLlmService),
        None,
        Arc::new(NullActionExecutor),
        OrchestratorConfig {
            listener_queue_capacity: config.listener_queue_capacity,
            stagnation_threshold: config.stagnation_threshold,
            derivation_interval: config.derivation_interval,
            freshness_decay_interval: config.freshness_decay_interval,
            priority: config.priority_config(),
        },
    );

    match cli.command {
        Commands::Propose { title, description, time_score } => {
            let id = orchestrator
                .propose_user_goal(title, description, GoalType::Achievable, time_score, Vec::new())
                .await?;
            info!(%id, "goal proposed");
            let report = orchestrator.run_cycle("cli propose").await?;
            println!("{report:?}");
        }
        Commands::Run { cycles } => {
            let interval = Duration::from_millis(config.cycle_interval_ms);
            let mut n = 0u32;
            loop {
                let report = orchestrator.run_cycle("scheduled cycle").await?;
                info!(?report, cycle = n, "cycle complete");
                n += 1;
                if cycles.is_some_and(|max| n >= max) {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }
    }

    Ok(())
}
