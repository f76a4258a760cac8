// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Live Monitor - Background task that surfaces new failures while a run is
//! in progress
//!
//! Each tick snapshots the trace source, keeps only failure-indicating
//! records, and alerts on those not seen by an earlier tick. Identity is
//! (agent, timestamp, message). Alerts go out on the event bus and are also
//! returned from [`LiveMonitor::tick`].
//!
//! Stopping is cooperative: a cancelled monitor finishes the tick it is in,
//! publishes the whole alert batch, and only then exits.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Periodic failure scan over any `TraceSource`

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::classification::FailureClassifier;
use crate::domain::config::MonitorSettings;
use crate::domain::events::{FailureAlert, FailureKey, TraceEvent};
use crate::domain::source::{SourceError, TraceSource};
use crate::infrastructure::event_bus::EventBus;

/// Configuration for the live monitor
#[derive(Debug, Clone)]
pub struct LiveMonitorConfig {
    /// Time between scans
    pub interval: Duration,

    /// Whether monitoring is enabled
    pub enabled: bool,
}

impl Default for LiveMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            enabled: true,
        }
    }
}

impl From<&MonitorSettings> for LiveMonitorConfig {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            interval: settings.interval,
            enabled: settings.enabled,
        }
    }
}

pub struct LiveMonitor {
    source: Arc<dyn TraceSource>,
    event_bus: EventBus,
    classifier: FailureClassifier,
    config: LiveMonitorConfig,
    seen: Mutex<HashSet<FailureKey>>,
    ticks: AtomicU64,
    shutdown_token: CancellationToken,
}

impl LiveMonitor {
    pub fn new(source: Arc<dyn TraceSource>, event_bus: EventBus, config: LiveMonitorConfig) -> Self {
        Self {
            source,
            event_bus,
            classifier: FailureClassifier::default(),
            config,
            seen: Mutex::new(HashSet::new()),
            ticks: AtomicU64::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Start the monitor background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Live monitor is disabled");
            return;
        }

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting live monitor background task"
        );

        let mut ticker = interval(self.config.interval);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping live monitor");
                    break;
                }
                _ = ticker.tick() => {
                    // runs to completion even if shutdown arrives meanwhile
                    match self.tick().await {
                        Ok(alerts) if !alerts.is_empty() => {
                            info!(new_failures = alerts.len(), "Live monitor detected failures");
                        }
                        Ok(_) => debug!("Live monitor tick found nothing new"),
                        Err(e) => warn!("Live monitor tick failed: {}", e),
                    }
                }
            }
        }

        let failures_seen = self.seen.lock().await.len();
        self.event_bus.publish(TraceEvent::MonitorStopped {
            ticks: self.ticks(),
            failures_seen,
            stopped_at: Utc::now(),
        });
        info!("Live monitor background task stopped");
    }

    /// One scan: alert on every failure not seen before, in snapshot order.
    pub async fn tick(&self) -> Result<Vec<FailureAlert>, SourceError> {
        // held for the whole tick so concurrent ticks cannot double-alert
        let mut seen = self.seen.lock().await;
        let snapshot = self.source.all_logs().await?;
        self.ticks.fetch_add(1, Ordering::SeqCst);

        let detected_at = Utc::now();
        let alerts: Vec<FailureAlert> = snapshot
            .iter()
            .filter(|record| self.classifier.is_failure(record))
            .filter(|record| seen.insert(FailureKey::from(*record)))
            .map(|record| FailureAlert {
                agent_id: record.agent_id().clone(),
                timestamp: record.timestamp(),
                level: record.level(),
                category: self.classifier.classify(record.message()),
                message: record.message().to_string(),
                detected_at,
            })
            .collect();

        for alert in &alerts {
            metrics::counter!("mas_trace_failures_detected_total").increment(1);
            self.event_bus.publish_failure(alert.clone());
        }

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::{AgentId, LogLevel, TraceRecord};
    use crate::infrastructure::trace_store::TraceStore;
    use tokio::time::timeout;

    fn monitor_over(store: &TraceStore, interval: Duration) -> LiveMonitor {
        LiveMonitor::new(
            Arc::new(store.clone()),
            EventBus::new(64),
            LiveMonitorConfig {
                interval,
                enabled: true,
            },
        )
    }

    fn emit(store: &TraceStore, agent: &str, level: LogLevel, message: &str) {
        store
            .emit(agent, TraceRecord::now(AgentId::new(agent).unwrap(), level, message))
            .unwrap();
    }

    #[tokio::test]
    async fn test_tick_alerts_only_on_new_failures() {
        let store = TraceStore::new();
        let monitor = monitor_over(&store, Duration::from_secs(60));

        emit(&store, "pm", LogLevel::Info, "Starting requirements analysis");
        emit(&store, "architect", LogLevel::Error, "System too complex - timeout");

        let first = monitor.tick().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].agent_id.as_str(), "architect");

        assert!(monitor.tick().await.unwrap().is_empty());

        emit(&store, "engineer", LogLevel::Error, "Cannot implement due to architecture timeout");
        let third = monitor.tick().await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].agent_id.as_str(), "engineer");
        assert_eq!(monitor.ticks(), 3);
    }

    #[tokio::test]
    async fn test_alerts_are_published() {
        let store = TraceStore::new();
        let monitor = monitor_over(&store, Duration::from_secs(60));
        let mut alerts = monitor.event_bus.subscribe_failures();

        emit(&store, "qa_engineer", LogLevel::Info, "Integration test failed - timeout");
        monitor.tick().await.unwrap();

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.agent_id.as_str(), "qa_engineer");
    }

    #[tokio::test]
    async fn test_background_task_stops_gracefully() {
        let store = TraceStore::new();
        let monitor = Arc::new(monitor_over(&store, Duration::from_millis(20)));
        let mut events = monitor.event_bus.subscribe();
        let token = monitor.shutdown_token();

        let handle = monitor.clone().start();
        emit(&store, "architect", LogLevel::Error, "design failed");

        let alert = timeout(Duration::from_secs(2), async {
            loop {
                if let TraceEvent::FailureDetected(alert) = events.recv().await.unwrap() {
                    return alert;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(alert.agent_id.as_str(), "architect");

        token.cancel();
        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        let stopped = timeout(Duration::from_secs(2), async {
            loop {
                if let TraceEvent::MonitorStopped { failures_seen, .. } = events.recv().await.unwrap() {
                    return failures_seen;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(stopped, 1);
    }

    #[tokio::test]
    async fn test_disabled_monitor_exits() {
        let store = TraceStore::new();
        let mut monitor = monitor_over(&store, Duration::from_millis(10));
        monitor.config.enabled = false;

        let handle = Arc::new(monitor).start();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
