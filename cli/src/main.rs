// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # mastrace
//!
//! Operator CLI for trace collection and failure analysis across the agents
//! of a multi-agent pipeline.
//!
//! ## Commands
//!
//! - `mastrace serve` - Host a trace store over HTTP, with the live monitor
//! - `mastrace collect` - Pull records from configured agent endpoints
//! - `mastrace analyze` - Analyse a saved table, or compare two around a patch
//! - `mastrace monitor` - Watch remote agents and print new failures
//! - `mastrace demo` - Replay the simulated four-agent pipeline

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use mas_trace::commands::{self, AnalyzeArgs, CollectArgs, DemoArgs, MonitorArgs, ServeArgs};
use mas_trace_core::domain::config::CollectorConfig;
use mas_trace_core::infrastructure::{TraceLayer, TraceStore};

/// Trace collection and failure analysis for multi-agent pipelines
#[derive(Parser)]
#[command(name = "mastrace")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "MAS_TRACE_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MAS_TRACE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a trace store over HTTP
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Collect records from remote agent endpoints
    #[command(name = "collect")]
    Collect(CollectArgs),

    /// Analyse a saved trace table
    #[command(name = "analyze")]
    Analyze(AnalyzeArgs),

    /// Watch remote agents for new failures
    #[command(name = "monitor")]
    Monitor(MonitorArgs),

    /// Run the simulated pipeline scenarios
    #[command(name = "demo")]
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The demo's simulated agents log through `tracing`; capture them.
    let demo_store = TraceStore::new();
    let capture = matches!(cli.command, Some(Commands::Demo(_))).then(|| demo_store.clone());

    init_logging(&cli.log_level, capture)?;

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    let config = CollectorConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    match command {
        Commands::Serve(args) => commands::serve::handle_command(args, config).await,
        Commands::Collect(args) => commands::collect::handle_command(args, config).await,
        Commands::Analyze(args) => commands::analyze::handle_command(args, config).await,
        Commands::Monitor(args) => commands::monitor::handle_command(args, config).await,
        Commands::Demo(args) => commands::demo::handle_command(args, config, demo_store).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, capture: Option<TraceStore>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console)
        .with(capture.map(TraceLayer::new))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
