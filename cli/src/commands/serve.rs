// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trace server
//!
//! Hosts a trace store over HTTP so agents in other processes can append to
//! it and collectors can pull from it. The live monitor scans the same store
//! and prints each new failure.

use anyhow::{Context, Result};
use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use mas_trace_core::application::{LiveMonitor, LiveMonitorConfig};
use mas_trace_core::domain::config::CollectorConfig;
use mas_trace_core::infrastructure::event_bus::EventBusError;
use mas_trace_core::infrastructure::{EventBus, TraceStore};
use mas_trace_core::presentation::api::app;

use super::{drain_alerts, print_alert, shutdown_signal};

#[derive(Args)]
pub struct ServeArgs {
    /// Bind host (default: spec.server.host)
    #[arg(long, env = "MAS_TRACE_HOST")]
    pub host: Option<String>,

    /// Bind port (default: spec.server.port)
    #[arg(long, env = "MAS_TRACE_PORT")]
    pub port: Option<u16>,

    /// Expose Prometheus metrics on this port
    #[arg(long, value_name = "PORT")]
    pub metrics_port: Option<u16>,

    /// Do not run the live monitor
    #[arg(long)]
    pub no_monitor: bool,
}

pub async fn handle_command(args: ServeArgs, config: CollectorConfig) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.spec.server.host.clone());
    let port = args.port.unwrap_or(config.spec.server.port);

    if let Some(metrics_port) = args.metrics_port {
        install_metrics_exporter(&host, metrics_port)?;
    }

    let store = TraceStore::new();
    let event_bus = EventBus::with_default_capacity();
    let classifier = config
        .classifier()
        .context("Failed to build failure classifier")?;

    let mut monitor_config = LiveMonitorConfig::from(&config.spec.monitor);
    if args.no_monitor {
        monitor_config.enabled = false;
    }
    let monitor = Arc::new(
        LiveMonitor::new(Arc::new(store.clone()), event_bus.clone(), monitor_config)
            .with_classifier(classifier),
    );
    let monitor_token = monitor.shutdown_token();
    let (stop_printer, mut printer_stopped) = oneshot::channel::<()>();
    let alert_printer = tokio::spawn({
        let mut alerts = event_bus.subscribe_failures();
        async move {
            loop {
                tokio::select! {
                    _ = &mut printer_stopped => break,
                    received = alerts.recv() => match received {
                        Ok(alert) => print_alert(&alert),
                        Err(EventBusError::Lagged(n)) => warn!("Dropped {} failure alerts", n),
                        Err(_) => return,
                    },
                }
            }
            drain_alerts(&mut alerts);
        }
    });
    let monitor_handle = monitor.clone().start();

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Trace server listening on {}", addr);

    axum::serve(listener, app(store.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    monitor_token.cancel();
    if let Err(e) = monitor_handle.await {
        warn!("Live monitor task failed: {}", e);
    }
    // the final scan has published; print whatever it queued
    let _ = stop_printer.send(());
    if let Err(e) = alert_printer.await {
        warn!("Alert printer task failed: {}", e);
    }
    store.dispose();

    info!("Trace server stopped");
    Ok(())
}

fn install_metrics_exporter(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid metrics address {}:{}", host, port))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}
