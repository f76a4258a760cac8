// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the mastrace CLI

pub mod analyze;
pub mod collect;
pub mod demo;
pub mod monitor;
pub mod serve;

pub use self::analyze::AnalyzeArgs;
pub use self::collect::CollectArgs;
pub use self::demo::DemoArgs;
pub use self::monitor::MonitorArgs;
pub use self::serve::ServeArgs;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::signal;
use tracing::{info, warn};

use mas_trace_core::domain::report::{FailureReport, ReportOutcome};
use mas_trace_core::domain::trace::wire_timestamp;
use mas_trace_core::infrastructure::event_bus::{EventBusError, FailureAlertReceiver};
use mas_trace_core::FailureAlert;

/// Print a report as pretty JSON or as the text summary.
pub(crate) fn print_report(report: &FailureReport, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{}", rendered);
        return Ok(());
    }

    let outcome = report.outcome();
    let line = outcome.to_string();
    match outcome {
        ReportOutcome::NoFailures => println!("{}", line.green()),
        ReportOutcome::FailuresObserved { .. } => println!("{}", line.red()),
        ReportOutcome::Incomplete { .. } => println!("{}", line.yellow()),
    }
    println!("{}", report.details());
    Ok(())
}

pub(crate) fn print_alert(alert: &FailureAlert) {
    println!(
        "{} {} {} [{}] {}",
        "⚠".yellow(),
        wire_timestamp::format(&alert.timestamp).dimmed(),
        alert.agent_id.as_str().bold(),
        alert.category.label().red(),
        alert.message
    );
}

/// Print every queued alert without waiting for more. Returns how many were
/// printed.
pub(crate) fn drain_alerts(alerts: &mut FailureAlertReceiver) -> usize {
    let mut printed = 0;
    loop {
        match alerts.try_recv() {
            Ok(alert) => {
                print_alert(&alert);
                printed += 1;
            }
            Err(EventBusError::Lagged(n)) => warn!("Dropped {} failure alerts", n),
            Err(_) => return printed,
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
