// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Offline analysis of saved trace tables
//!
//! With one table: the failure report. With `--after`: the per-agent
//! effect of a patch, comparing the table taken before it with the one taken
//! after.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::{Path, PathBuf};

use mas_trace_core::application::{AnalysisRunner, PatchEvaluator, PatchVerdict};
use mas_trace_core::domain::config::CollectorConfig;
use mas_trace_core::infrastructure::table_export::load_table;
use mas_trace_core::TraceRecord;

use super::print_report;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Table written by `collect` or `demo` (default: spec.export.table_path)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Table taken after a patch; compares it against the input table
    #[arg(long, value_name = "FILE")]
    pub after: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_command(args: AnalyzeArgs, config: CollectorConfig) -> Result<()> {
    let classifier = config
        .classifier()
        .context("Failed to build failure classifier")?;
    let input = args
        .input
        .unwrap_or_else(|| config.spec.export.table_path.clone());
    let before = read_table(&input)?;

    let Some(after_path) = args.after else {
        let report = AnalysisRunner::new(classifier).analyze(&before);
        return print_report(&report, args.json);
    };

    let after = read_table(&after_path)?;
    let evaluator = PatchEvaluator::with_classifier(before, after, classifier);
    let verdicts = evaluator.evaluate_effectiveness();
    let details = evaluator.detailed_report();
    let diff = evaluator.propagation_diff();

    if args.json {
        let rendered = serde_json::to_string_pretty(&json!({
            "effectiveness": verdicts,
            "details": details,
            "propagation_diff": diff,
        }))
        .context("Failed to serialize patch evaluation")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{}", "Patch effectiveness:".bold());
    for (agent, verdict) in &verdicts {
        let line = verdict.to_string();
        let line = match verdict {
            PatchVerdict::NoFailures | PatchVerdict::AllResolved { .. } => line.green(),
            PatchVerdict::Reduced { .. } => line.yellow(),
            _ => line.red(),
        };
        println!("  {}: {}", agent.as_str().bold(), line);

        if let Some(detail) = details.get(agent) {
            if let Some(ms) = detail.time_to_recovery_ms {
                println!("    Time to recovery: {} ms", ms);
            }
        }
        if let Some(messages) = diff.get(agent) {
            for message in &messages.fully_fixed {
                println!("    {} {}", "fixed".green(), message);
            }
            for message in &messages.still_present {
                println!("    {} {}", "still present".yellow(), message);
            }
            for message in &messages.newly_introduced {
                println!("    {} {}", "new".red(), message);
            }
        }
    }

    Ok(())
}

fn read_table(path: &Path) -> Result<Vec<TraceRecord>> {
    load_table(path).with_context(|| format!("Failed to read trace table {:?}", path))
}
