// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote Collector
//!
//! Pulls trace records from agents running in other processes or hosts, one
//! HTTP GET per configured endpoint. Requests fan out concurrently and each
//! carries its own timeout, so one stalled agent never holds up the rest.
//! A failed endpoint becomes a [`CollectionDiagnostic`] on the result; a
//! collection pass itself never fails.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** HTTP pull implementation of `TraceSource`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::classification::FailureClassifier;
use crate::domain::collection::{CollectionDiagnostic, CollectionError, CollectionResult};
use crate::domain::config::{CollectorConfig, ConfigError};
use crate::domain::events::TraceEvent;
use crate::domain::source::{IngestError, SourceError, TraceSource};
use crate::domain::trace::{wire_timestamp, AgentId, LogLevel, TraceRecord};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::table_export::{self, ExportError};

/// One agent and the URL that serves its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoint {
    pub agent_id: AgentId,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorSetupError {
    #[error("Invalid endpoint agent id: {0}")]
    InvalidAgentId(#[from] IngestError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to build failure classifier: {0}")]
    Classifier(#[from] ConfigError),
}

/// Record as served by an agent endpoint.
///
/// `agent_id` is ignored: the configured endpoint key is authoritative.
/// `level` may be absent for producers that only report time and text.
#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    #[allow(dead_code)]
    agent_id: Option<String>,
    #[serde(with = "wire_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    message: String,
}

impl WireRecord {
    fn into_record(self, agent_id: &AgentId) -> Result<TraceRecord, CollectionError> {
        let level = match self.level.as_deref() {
            None | Some("") => LogLevel::Info,
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|e| CollectionError::MalformedPayload(e.to_string()))?,
        };
        Ok(TraceRecord::new(agent_id.clone(), self.timestamp, level, self.message))
    }
}

/// Decode an endpoint body into records attributed to `agent_id`.
fn decode_payload(agent_id: &AgentId, body: &[u8]) -> Result<Vec<TraceRecord>, CollectionError> {
    let wire: Vec<WireRecord> = serde_json::from_slice(body)
        .map_err(|e| CollectionError::MalformedPayload(e.to_string()))?;
    wire.into_iter().map(|w| w.into_record(agent_id)).collect()
}

pub struct RemoteCollector {
    client: reqwest::Client,
    endpoints: Vec<AgentEndpoint>,
    timeout: Duration,
    classifier: FailureClassifier,
    event_bus: Option<EventBus>,
}

impl RemoteCollector {
    /// Endpoints are visited in sorted agent-id order.
    pub fn new(
        endpoints: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, CollectorSetupError> {
        let endpoints = endpoints
            .into_iter()
            .map(|(agent_id, url)| {
                Ok(AgentEndpoint {
                    agent_id: AgentId::new(agent_id)?,
                    url,
                })
            })
            .collect::<Result<Vec<_>, IngestError>>()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoints,
            timeout,
            classifier: FailureClassifier::default(),
            event_bus: None,
        })
    }

    /// Endpoints, timeout and classifier rules from the manifest.
    pub fn from_config(config: &CollectorConfig) -> Result<Self, CollectorSetupError> {
        Ok(Self::new(config.spec.endpoints.clone(), config.spec.collector.timeout)?
            .with_classifier(config.classifier()?))
    }

    /// Classifier used for the table's `category` column.
    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &FailureClassifier {
        &self.classifier
    }

    /// Publish a `CollectionCompleted` event after every pass.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn endpoints(&self) -> &[AgentEndpoint] {
        &self.endpoints
    }

    /// One request per endpoint, concurrently. Reachable agents' records are
    /// merged in endpoint order; failures become diagnostics.
    pub async fn collect_logs(&self) -> CollectionResult {
        let outcomes = join_all(self.endpoints.iter().map(|endpoint| async move {
            (endpoint, self.fetch(endpoint).await)
        }))
        .await;

        let mut result = CollectionResult::default();
        for (endpoint, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    debug!(agent_id = %endpoint.agent_id, count = records.len(), "Collected agent logs");
                    result.records.extend(records);
                }
                Err(error) => {
                    warn!(
                        agent_id = %endpoint.agent_id,
                        endpoint = %endpoint.url,
                        error = %error,
                        "Failed to collect logs"
                    );
                    metrics::counter!(
                        "mas_trace_collection_errors_total",
                        "agent" => endpoint.agent_id.to_string()
                    )
                    .increment(1);
                    result.diagnostics.push(CollectionDiagnostic {
                        agent_id: endpoint.agent_id.clone(),
                        endpoint: endpoint.url.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            records = result.records.len(),
            unreachable = result.diagnostics.len(),
            "Collection pass finished"
        );

        if let Some(bus) = &self.event_bus {
            bus.publish(TraceEvent::CollectionCompleted {
                record_count: result.records.len(),
                unreachable_agents: result.unreachable_agents(),
                completed_at: Utc::now(),
            });
        }

        result
    }

    /// Write records as a flat table, categorised with this collector's
    /// classifier. See [`table_export::save_as_table_with`].
    pub fn save_as_table(&self, records: &[TraceRecord], path: &Path) -> Result<(), ExportError> {
        table_export::save_as_table_with(records, path, &self.classifier)
    }

    async fn fetch(&self, endpoint: &AgentEndpoint) -> Result<Vec<TraceRecord>, CollectionError> {
        let response = self
            .client
            .get(&endpoint.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectionError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        decode_payload(&endpoint.agent_id, &body)
    }

    fn map_error(&self, error: reqwest::Error) -> CollectionError {
        if error.is_timeout() {
            CollectionError::Timeout(self.timeout.as_millis() as u64)
        } else if error.is_decode() {
            CollectionError::MalformedPayload(error.to_string())
        } else {
            CollectionError::Connection(error.to_string())
        }
    }
}

#[async_trait]
impl TraceSource for RemoteCollector {
    async fn agent_logs(&self, agent_id: &AgentId) -> Result<Vec<TraceRecord>, SourceError> {
        let Some(endpoint) = self.endpoints.iter().find(|e| &e.agent_id == agent_id) else {
            return Ok(Vec::new());
        };
        self.fetch(endpoint)
            .await
            .map_err(|source| SourceError::Collection {
                agent_id: agent_id.clone(),
                source,
            })
    }

    /// Partial results are returned as-is; unreachable agents are logged by
    /// `collect_logs`.
    async fn all_logs(&self) -> Result<Vec<TraceRecord>, SourceError> {
        Ok(self.collect_logs().await.into_chronological())
    }

    async fn registered_agents(&self) -> Result<Vec<AgentId>, SourceError> {
        Ok(self.endpoints.iter().map(|e| e.agent_id.clone()).collect())
    }

    async fn snapshot(&self) -> Result<CollectionResult, SourceError> {
        Ok(self.collect_logs().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm() -> AgentId {
        AgentId::new("product_manager").unwrap()
    }

    #[test]
    fn test_decode_attributes_to_configured_agent() {
        let body = br#"[
            {"agent_id": "someone_else", "timestamp": "2026-01-01T00:00:01Z", "level": "ERROR", "message": "boom"},
            {"timestamp": "2026-01-01T00:00:02.500000", "message": "naive timestamp, no level"}
        ]"#;

        let records = decode_payload(&pm(), body).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.agent_id() == &pm()));
        assert_eq!(records[0].level(), LogLevel::Error);
        assert_eq!(records[1].level(), LogLevel::Info);
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        assert!(matches!(
            decode_payload(&pm(), b"{\"not\": \"a list\"}"),
            Err(CollectionError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_payload(&pm(), br#"[{"timestamp": "yesterday", "message": "x"}]"#),
            Err(CollectionError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode_payload(&pm(), br#"[{"timestamp": "2026-01-01T00:00:00Z", "level": "LOUD", "message": "x"}]"#),
            Err(CollectionError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_rejects_blank_agent_key() {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(" ".to_string(), "http://127.0.0.1:1/logs".to_string());
        assert!(matches!(
            RemoteCollector::new(endpoints, Duration::from_secs(1)),
            Err(CollectorSetupError::InvalidAgentId(_))
        ));
    }

    #[tokio::test]
    async fn test_no_endpoints_is_complete_and_empty() {
        let collector = RemoteCollector::new(BTreeMap::new(), Duration::from_secs(1)).unwrap();
        let result = collector.collect_logs().await;
        assert!(result.is_complete());
        assert!(result.records.is_empty());
    }
}
