// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! # Veer Pipeline Server
//!
//! The `veer` binary serves all five pipeline stages (Detect, Mutate,
//! Release, Update, Trigger) on one axum server. The stages stay fully
//! decoupled — every hop between them goes through the configured HTTP
//! endpoint, so the same binary also runs a single stage behind a different
//! base URL if the deployment splits the pipeline across hosts.
//!
//! ## Commands
//!
//! - `veer serve` (default) — run the stage server
//! - `veer config show` — print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use veer_pipeline_core::application::{
    ActivatorService, DetectorService, PersisterService, ReleaserService, ResolverService,
};
use veer_pipeline_core::domain::repository::TrajectoryRepository;
use veer_pipeline_core::domain::{AbilityTable, PipelineConfig};
use veer_pipeline_core::infrastructure::{
    HttpStageClient, InMemoryTrajectoryRepository, MqttReleasePublisher,
    PostgresTrajectoryRepository, ReportIngester,
};
use veer_pipeline_core::presentation::{app, AppState};

/// Veer — distributed UAV trajectory deconfliction
#[derive(Parser)]
#[command(name = "veer")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the pipeline configuration file
    #[arg(short, long, global = true, env = "VEER_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the ability profile table (JSON)
    #[arg(long, global = true, env = "VEER_ABILITIES_PATH", value_name = "FILE")]
    abilities: Option<PathBuf>,

    /// HTTP API host
    #[arg(long, global = true, env = "VEER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP API port
    #[arg(long, global = true, env = "VEER_PORT", default_value = "8000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "VEER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stage server
    Serve,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as YAML
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.host, cli.port, config, cli.abilities).await,
        Commands::Config { command: ConfigCommand::Show } => {
            println!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

async fn serve(
    host: &str,
    port: u16,
    config: PipelineConfig,
    abilities_path: Option<PathBuf>,
) -> Result<()> {
    let abilities = Arc::new(match abilities_path {
        Some(path) => AbilityTable::load(path)?,
        None => {
            warn!("no ability table configured, heading changes use the default authority");
            AbilityTable::default()
        }
    });

    let repository: Arc<dyn TrajectoryRepository> = match config.store.backend.as_str() {
        "postgres" => {
            let pool = PgPoolOptions::new()
                .max_connections(8)
                .connect(&config.store.url)
                .await
                .context("failed to connect to PostgreSQL")?;
            let repo = PostgresTrajectoryRepository::new(pool);
            repo.ensure_schema().await?;
            info!("using PostgreSQL trajectory store");
            Arc::new(repo)
        }
        "in_memory" => {
            info!("using in-memory trajectory store");
            Arc::new(InMemoryTrajectoryRepository::new())
        }
        other => anyhow::bail!("unknown store backend `{other}`"),
    };

    let stages = Arc::new(HttpStageClient::new(config.stages.clone()));
    let publisher = Arc::new(MqttReleasePublisher::connect(&config.mqtt));

    let state = Arc::new(AppState {
        detector: Arc::new(DetectorService::new(config.detection.clone(), stages.clone())),
        resolver: Arc::new(ResolverService::new(
            abilities,
            config.resolution.clone(),
            config.detection.clone(),
            stages.clone(),
        )),
        releaser: Arc::new(ReleaserService::new(publisher, stages.clone())),
        persister: Arc::new(PersisterService::new(repository.clone(), stages.clone())),
        activator: Arc::new(ActivatorService::new(
            repository,
            stages.clone(),
            Duration::seconds(config.store.freshness_window_secs),
        )),
    });

    if config.mqtt.ingest_reports {
        let ingester = ReportIngester::new(stages);
        let mqtt = config.mqtt.clone();
        tokio::spawn(async move {
            if let Err(e) = ingester.run(&mqtt).await {
                warn!(error = %e, "report ingester stopped");
            }
        });
    }

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(host, port, "serving pipeline stages");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
