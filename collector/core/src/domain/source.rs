// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Trace Source and Sink Interfaces
//!
//! Two capabilities shared by every ingestion path:
//!
//! | Trait | Capability | Implementations |
//! |-------|------------|-----------------|
//! | `TraceSink` | append trace records for an agent | `TraceStore` |
//! | `TraceSource` | list trace records for an agent / all agents | `TraceStore`, `RemoteCollector` |
//!
//! The analysis runner and the live monitor depend only on `TraceSource`, so
//! they work the same whether records were captured in-process or pulled
//! over HTTP from agents running elsewhere.

use async_trait::async_trait;

use crate::domain::collection::CollectionResult;
use crate::domain::trace::{AgentId, TraceRecord};

/// Append side of a trace store.
///
/// Synchronous: it is called from inside agents' logging paths.
pub trait TraceSink: Send + Sync {
    /// Make `agent_id` known without emitting anything. Idempotent.
    fn register(&self, agent_id: &AgentId) -> Result<(), IngestError>;

    /// Append `record` to the sequence of `agent_id`.
    fn append(&self, agent_id: &AgentId, record: TraceRecord) -> Result<(), IngestError>;
}

/// Read side of a trace store.
#[async_trait]
pub trait TraceSource: Send + Sync {
    /// Records for one agent in emission order. Unknown agents yield nothing.
    async fn agent_logs(&self, agent_id: &AgentId) -> Result<Vec<TraceRecord>, SourceError>;

    /// Records across all agents in global timestamp order.
    async fn all_logs(&self) -> Result<Vec<TraceRecord>, SourceError>;

    /// Known agent ids.
    async fn registered_agents(&self) -> Result<Vec<AgentId>, SourceError>;

    /// All records plus any agents that could not be read. In-process
    /// sources are always complete.
    async fn snapshot(&self) -> Result<CollectionResult, SourceError> {
        Ok(CollectionResult {
            records: self.all_logs().await?,
            diagnostics: Vec::new(),
        })
    }
}

/// Errors on the append path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("Agent id must not be empty")]
    EmptyAgentId,

    #[error("Record belongs to agent '{record}' but was emitted for '{target}'")]
    AgentMismatch { target: String, record: String },

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Trace store has been disposed")]
    StoreDisposed,
}

/// Errors on the read path. Only remote sources produce them.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Trace source unavailable: {0}")]
    Unavailable(String),

    #[error("Collection failed for agent '{agent_id}': {source}")]
    Collection {
        agent_id: AgentId,
        #[source]
        source: crate::domain::collection::CollectionError,
    },
}
