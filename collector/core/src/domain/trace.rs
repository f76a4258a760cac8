// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trace Record
//!
//! The normalized unit of collected log data: which agent produced it, when,
//! at what severity, and what it said. Records are immutable once built; the
//! failure category is derived from the message on demand and never stored.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Trace record value types and the wire timestamp format

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::classification::{FailureCategory, FailureClassifier};
use crate::domain::source::IngestError;

/// Stable identifier of one logical producer (agent) in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Build an agent id, rejecting empty or whitespace-only names.
    pub fn new(id: impl Into<String>) -> Result<Self, IngestError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IngestError::EmptyAgentId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AgentId {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AgentId {
    type Error = IngestError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Severity of the underlying event. Independent of the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Levels that mark a record as failure-indicating regardless of its text.
    pub fn is_failure(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" | "information" | "notice" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" | "err" => Ok(LogLevel::Error),
            "critical" | "fatal" | "crit" => Ok(LogLevel::Critical),
            other => Err(IngestError::UnknownLevel(other.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, IngestError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// One normalized log event.
///
/// Fields are private: a record is never mutated after construction, and
/// every copy handed out by the store is an independent clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    agent_id: AgentId,
    #[serde(with = "wire_timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    level: LogLevel,
    message: String,
}

impl TraceRecord {
    pub fn new(
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            timestamp,
            level,
            message: message.into(),
        }
    }

    /// Record stamped with the current wall-clock time.
    pub fn now(agent_id: AgentId, level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(agent_id, Utc::now(), level, message)
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Category under the built-in taxonomy.
    pub fn category(&self) -> FailureCategory {
        FailureClassifier::default().classify(&self.message)
    }
}

/// ISO-8601 timestamps on the wire.
///
/// Serializes as RFC 3339 (UTC, microseconds). Deserializes RFC 3339 or a
/// naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` string, which is taken as UTC.
pub mod wire_timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
                return Ok(naive.and_utc());
            }
        }
        Err(format!("invalid ISO-8601 timestamp: '{}'", raw))
    }
}
