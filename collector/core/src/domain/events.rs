// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::classification::FailureCategory;
use crate::domain::trace::{AgentId, LogLevel, TraceRecord};

/// Identity of a failure across monitor ticks: agent, time, and text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureKey {
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl From<&TraceRecord> for FailureKey {
    fn from(record: &TraceRecord) -> Self {
        Self {
            agent_id: record.agent_id().clone(),
            timestamp: record.timestamp(),
            message: record.message().to_string(),
        }
    }
}

/// A failure seen for the first time by the live monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureAlert {
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: FailureCategory,
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

/// Events published on the trace event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    FailureDetected(FailureAlert),
    CollectionCompleted {
        record_count: usize,
        unreachable_agents: Vec<AgentId>,
        completed_at: DateTime<Utc>,
    },
    MonitorStopped {
        ticks: u64,
        failures_seen: usize,
        stopped_at: DateTime<Utc>,
    },
}
