// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Live monitoring of remote agents
//!
//! Polls the configured endpoints on the monitor interval and prints every
//! failure not seen by an earlier scan. Runs until Ctrl+C, or for a single
//! scan with `--once`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use mas_trace_core::application::{LiveMonitor, LiveMonitorConfig};
use mas_trace_core::domain::config::CollectorConfig;
use mas_trace_core::infrastructure::event_bus::EventBusError;
use mas_trace_core::infrastructure::{EventBus, RemoteCollector};

use super::{drain_alerts, print_alert, shutdown_signal};

#[derive(Args)]
pub struct MonitorArgs {
    /// Scan interval, e.g. "2s" (default: spec.monitor.interval)
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Run a single scan and exit
    #[arg(long)]
    pub once: bool,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be non-zero".to_string());
    }
    Ok(interval)
}

pub async fn handle_command(args: MonitorArgs, config: CollectorConfig) -> Result<()> {
    if config.spec.endpoints.is_empty() {
        bail!("No endpoints configured; add spec.endpoints to the configuration file");
    }

    let event_bus = EventBus::with_default_capacity();
    let collector = RemoteCollector::from_config(&config)
        .context("Failed to create remote collector")?
        .with_event_bus(event_bus.clone());
    let agent_count = collector.endpoints().len();

    let mut monitor_config = LiveMonitorConfig::from(&config.spec.monitor);
    monitor_config.enabled = true;
    if let Some(interval) = args.interval {
        monitor_config.interval = interval;
    }
    let interval = monitor_config.interval;

    let monitor = Arc::new(
        LiveMonitor::new(Arc::new(collector), event_bus.clone(), monitor_config).with_classifier(
            config
                .classifier()
                .context("Failed to build failure classifier")?,
        ),
    );

    if args.once {
        let alerts = monitor.tick().await.context("Monitor scan failed")?;
        if alerts.is_empty() {
            println!("{}", "No failures detected".green());
        }
        for alert in &alerts {
            print_alert(alert);
        }
        return Ok(());
    }

    let mut alerts = event_bus.subscribe_failures();
    let token = monitor.shutdown_token();
    let handle = monitor.clone().start();

    println!(
        "Monitoring {} agent(s) every {}. Press Ctrl+C to stop.",
        agent_count,
        humantime_serde::re::humantime::format_duration(interval)
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = alerts.recv() => match received {
                Ok(alert) => print_alert(&alert),
                Err(EventBusError::Lagged(n)) => warn!("Dropped {} failure alerts", n),
                Err(_) => break,
            },
        }
    }

    token.cancel();
    handle.await.context("Live monitor task failed")?;
    drain_alerts(&mut alerts);
    println!("Monitor stopped after {} scan(s)", monitor.ticks());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("500ms").unwrap(), Duration::from_millis(500));
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("soon").is_err());
    }
}
