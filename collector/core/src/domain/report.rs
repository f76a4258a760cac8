// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Failure Report
//!
//! Output of the analysis runner. Serializes to JSON for machines and renders
//! as plain text through `Display` for operators.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Report value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::classification::FailureCategory;
use crate::domain::collection::CollectionDiagnostic;
use crate::domain::trace::{AgentId, LogLevel};

/// One step of the chronological failure trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureTrailEntry {
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: FailureCategory,
    pub message: String,
}

/// A failure in one agent directly followed by a failure in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationStep {
    pub source_agent: AgentId,
    pub target_agent: AgentId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// The agent that first produced a given failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureIntroduction {
    pub message: String,
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
}

/// Whether the analysed snapshot covers every agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectionStatus {
    Complete,
    Incomplete { diagnostics: Vec<CollectionDiagnostic> },
}

/// Headline verdict. "No failures" and "could not look everywhere" are
/// different states and stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportOutcome {
    NoFailures,
    FailuresObserved { failures: usize },
    Incomplete { failures: usize, unreachable_agents: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub total_records: usize,
    /// Failure counts per category; every category is present.
    pub category_counts: BTreeMap<FailureCategory, usize>,
    /// Failure counts per agent; every agent in the input is present.
    pub agent_failure_counts: BTreeMap<AgentId, usize>,
    pub failure_trail: Vec<FailureTrailEntry>,
    pub propagation: Vec<PropagationStep>,
    pub introductions: Vec<FailureIntroduction>,
    pub collection: CollectionStatus,
    pub generated_at: DateTime<Utc>,
}

impl FailureReport {
    pub fn failure_count(&self) -> usize {
        self.failure_trail.len()
    }

    pub fn first_failing_agent(&self) -> Option<&AgentId> {
        self.failure_trail.first().map(|entry| &entry.agent_id)
    }

    pub fn outcome(&self) -> ReportOutcome {
        let failures = self.failure_count();
        match &self.collection {
            CollectionStatus::Incomplete { diagnostics } => ReportOutcome::Incomplete {
                failures,
                unreachable_agents: diagnostics.len(),
            },
            CollectionStatus::Complete if failures == 0 => ReportOutcome::NoFailures,
            CollectionStatus::Complete => ReportOutcome::FailuresObserved { failures },
        }
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::NoFailures => write!(f, "No failures observed"),
            ReportOutcome::FailuresObserved { failures } => {
                write!(f, "{} failure(s) observed", failures)
            }
            ReportOutcome::Incomplete {
                failures,
                unreachable_agents,
            } => write!(
                f,
                "Collection incomplete: {} unreachable agent(s); {} failure(s) observed in collected records",
                unreachable_agents, failures
            ),
        }
    }
}

impl FailureReport {
    /// Text summary without the leading outcome line, for callers that
    /// render the outcome themselves.
    pub fn details(&self) -> ReportDetails<'_> {
        ReportDetails(self)
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.outcome())?;
        write!(f, "{}", self.details())
    }
}

/// Helper returned by [`FailureReport::details`].
pub struct ReportDetails<'a>(&'a FailureReport);

impl fmt::Display for ReportDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "Total records: {}", report.total_records)?;

        if let CollectionStatus::Incomplete { diagnostics } = &report.collection {
            writeln!(f, "\nUnreachable agents:")?;
            for d in diagnostics {
                writeln!(f, "  {} at {}: {}", d.agent_id, d.endpoint, d.error)?;
            }
        }

        writeln!(f, "\nFailures by category:")?;
        for (category, count) in &report.category_counts {
            writeln!(f, "  {:<30} {}", category.label(), count)?;
        }

        writeln!(f, "\nFailures by agent:")?;
        for (agent, count) in &report.agent_failure_counts {
            writeln!(f, "  {:<30} {}", agent.as_str(), count)?;
        }

        if !report.failure_trail.is_empty() {
            writeln!(f, "\nFailure trail:")?;
            for entry in &report.failure_trail {
                writeln!(
                    f,
                    "  [{}] {} {}: {} (Category: {})",
                    entry.timestamp.to_rfc3339(),
                    entry.agent_id,
                    entry.level,
                    entry.message,
                    entry.category
                )?;
            }
        }

        if report.propagation.is_empty() {
            writeln!(f, "\nNo failure propagation detected across agents.")?;
        } else {
            writeln!(f, "\nFailure propagation:")?;
            for step in &report.propagation {
                writeln!(
                    f,
                    "  {} -> {} at {}: {}",
                    step.source_agent,
                    step.target_agent,
                    step.timestamp.to_rfc3339(),
                    step.message
                )?;
            }
        }

        if !report.introductions.is_empty() {
            writeln!(f, "\nFailure introduction:")?;
            for intro in &report.introductions {
                writeln!(f, "  '{}' introduced by {}", intro.message, intro.agent_id)?;
            }
        }

        Ok(())
    }
}
