// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

use crate::domain::trace::{AgentId, TraceRecord};

/// Why one endpoint could not be collected.
///
/// Always scoped to a single endpoint; never aborts a collection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CollectionError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed response payload: {0}")]
    MalformedPayload(String),
}

/// Per-agent collection failure attached to a [`CollectionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDiagnostic {
    pub agent_id: AgentId,
    pub endpoint: String,
    pub error: CollectionError,
}

/// Merged output of one collection pass.
///
/// `records` holds every reachable agent's records, agent by agent in
/// endpoint order, each agent's records in the order it reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub records: Vec<TraceRecord>,
    pub diagnostics: Vec<CollectionDiagnostic>,
}

impl CollectionResult {
    /// True when every configured endpoint answered with a valid payload.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn unreachable_agents(&self) -> Vec<AgentId> {
        self.diagnostics.iter().map(|d| d.agent_id.clone()).collect()
    }

    /// Records re-sorted into global timestamp order. The sort is stable, so
    /// ties keep endpoint order, then each agent's reported order.
    pub fn into_chronological(self) -> Vec<TraceRecord> {
        let mut records = self.records;
        records.sort_by_key(|r| r.timestamp());
        records
    }
}
