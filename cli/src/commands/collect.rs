// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One collection pass over the configured agent endpoints: pull, export the
//! table, print the report.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use mas_trace_core::application::AnalysisRunner;
use mas_trace_core::domain::config::CollectorConfig;
use mas_trace_core::infrastructure::RemoteCollector;

use super::print_report;

#[derive(Args)]
pub struct CollectArgs {
    /// Table to write (default: spec.export.table_path)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip writing the table
    #[arg(long)]
    pub no_export: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: CollectArgs, config: CollectorConfig) -> Result<()> {
    if config.spec.endpoints.is_empty() {
        bail!("No endpoints configured; add spec.endpoints to the configuration file");
    }

    let collector =
        RemoteCollector::from_config(&config).context("Failed to create remote collector")?;
    // table categories and the report share the configured rules
    let runner = AnalysisRunner::new(collector.classifier().clone());

    if !args.json {
        println!(
            "Collecting from {} endpoint(s)...",
            collector.endpoints().len()
        );
    }

    let result = collector.collect_logs().await;

    if !args.json {
        for diagnostic in &result.diagnostics {
            println!(
                "  {} {} ({}): {}",
                "✗".red(),
                diagnostic.agent_id.as_str().bold(),
                diagnostic.endpoint,
                diagnostic.error
            );
        }
    }

    let report = runner.analyze_collection(&result);

    if !args.no_export {
        let path = args
            .output
            .unwrap_or_else(|| config.spec.export.table_path.clone());
        let records = result.into_chronological();
        collector
            .save_as_table(&records, &path)
            .with_context(|| format!("Failed to write table to {:?}", path))?;
        if !args.json {
            println!(
                "{}",
                format!("✓ Saved {} records to {}", records.len(), path.display()).green()
            );
        }
    }

    print_report(&report, args.json)
}
