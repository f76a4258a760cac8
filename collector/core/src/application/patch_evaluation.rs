// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Patch Evaluation
//!
//! Compares two trace snapshots of the same pipeline, one taken before a fix
//! and one after, and reports per agent whether failures went away, shrank,
//! persisted, or appeared.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Before/after failure comparison

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::classification::{FailureCategory, FailureClassifier};
use crate::domain::trace::{AgentId, TraceRecord};

/// Per-agent effect of a patch on the failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum PatchVerdict {
    NoFailures,
    AllResolved { before: usize },
    NewFailures { after: usize },
    Reduced { before: usize, after: usize },
    Unchanged { count: usize },
    Increased { before: usize, after: usize },
}

impl PatchVerdict {
    fn from_counts(before: usize, after: usize) -> Self {
        match (before, after) {
            (0, 0) => PatchVerdict::NoFailures,
            (b, 0) => PatchVerdict::AllResolved { before: b },
            (0, a) => PatchVerdict::NewFailures { after: a },
            (b, a) if a < b => PatchVerdict::Reduced { before: b, after: a },
            (b, a) if a == b => PatchVerdict::Unchanged { count: b },
            (b, a) => PatchVerdict::Increased { before: b, after: a },
        }
    }
}

impl fmt::Display for PatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchVerdict::NoFailures => write!(f, "No failures before or after patch."),
            PatchVerdict::AllResolved { before } => {
                write!(f, "All failures resolved (before: {}, after: 0).", before)
            }
            PatchVerdict::NewFailures { after } => {
                write!(f, "New failures introduced (before: 0, after: {}).", after)
            }
            PatchVerdict::Reduced { before, after } => {
                write!(f, "Failures reduced (before: {}, after: {}).", before, after)
            }
            PatchVerdict::Unchanged { count } => {
                write!(f, "No change in failures (before: {}, after: {}).", count, count)
            }
            PatchVerdict::Increased { before, after } => {
                write!(f, "Failures increased (before: {}, after: {}).", before, after)
            }
        }
    }
}

/// Detailed before/after breakdown for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPatchDetail {
    pub categories_before: BTreeMap<FailureCategory, usize>,
    pub categories_after: BTreeMap<FailureCategory, usize>,
    pub unique_messages_before: usize,
    pub unique_messages_after: usize,
    /// From the last pre-patch failure to the first later non-failure record
    /// in the post-patch snapshot.
    pub time_to_recovery_ms: Option<i64>,
}

/// Which failure messages a patch removed, left behind, or introduced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMessageDiff {
    pub fully_fixed: BTreeSet<String>,
    pub still_present: BTreeSet<String>,
    pub newly_introduced: BTreeSet<String>,
}

pub struct PatchEvaluator {
    before: Vec<TraceRecord>,
    after: Vec<TraceRecord>,
    classifier: FailureClassifier,
}

impl PatchEvaluator {
    pub fn new(before: Vec<TraceRecord>, after: Vec<TraceRecord>) -> Self {
        Self::with_classifier(before, after, FailureClassifier::default())
    }

    pub fn with_classifier(
        before: Vec<TraceRecord>,
        after: Vec<TraceRecord>,
        classifier: FailureClassifier,
    ) -> Self {
        Self {
            before,
            after,
            classifier,
        }
    }

    /// Verdict for every agent seen in either snapshot.
    pub fn evaluate_effectiveness(&self) -> BTreeMap<AgentId, PatchVerdict> {
        let before = self.failure_counts(&self.before);
        let after = self.failure_counts(&self.after);

        self.agents()
            .into_iter()
            .map(|agent| {
                let b = before.get(&agent).copied().unwrap_or(0);
                let a = after.get(&agent).copied().unwrap_or(0);
                (agent, PatchVerdict::from_counts(b, a))
            })
            .collect()
    }

    pub fn detailed_report(&self) -> BTreeMap<AgentId, AgentPatchDetail> {
        self.agents()
            .into_iter()
            .map(|agent| {
                let before: Vec<&TraceRecord> = self.for_agent(&self.before, &agent).collect();
                let after: Vec<&TraceRecord> = self.for_agent(&self.after, &agent).collect();

                let last_failure = before
                    .iter()
                    .filter(|r| self.classifier.is_failure(r))
                    .map(|r| r.timestamp())
                    .max();
                let first_success = last_failure.and_then(|last| {
                    after
                        .iter()
                        .filter(|r| !self.classifier.is_failure(r) && r.timestamp() > last)
                        .map(|r| r.timestamp())
                        .min()
                });
                let time_to_recovery_ms = match (last_failure, first_success) {
                    (Some(fail), Some(ok)) => Some(recovery_millis(fail, ok)),
                    _ => None,
                };

                let detail = AgentPatchDetail {
                    categories_before: self.category_breakdown(&before),
                    categories_after: self.category_breakdown(&after),
                    unique_messages_before: self.failure_messages(&before).len(),
                    unique_messages_after: self.failure_messages(&after).len(),
                    time_to_recovery_ms,
                };
                (agent, detail)
            })
            .collect()
    }

    pub fn propagation_diff(&self) -> BTreeMap<AgentId, FailureMessageDiff> {
        self.agents()
            .into_iter()
            .map(|agent| {
                let before: Vec<&TraceRecord> = self.for_agent(&self.before, &agent).collect();
                let after: Vec<&TraceRecord> = self.for_agent(&self.after, &agent).collect();
                let before = self.failure_messages(&before);
                let after = self.failure_messages(&after);

                let diff = FailureMessageDiff {
                    fully_fixed: before.difference(&after).cloned().collect(),
                    still_present: before.intersection(&after).cloned().collect(),
                    newly_introduced: after.difference(&before).cloned().collect(),
                };
                (agent, diff)
            })
            .collect()
    }

    fn agents(&self) -> BTreeSet<AgentId> {
        self.before
            .iter()
            .chain(self.after.iter())
            .map(|r| r.agent_id().clone())
            .collect()
    }

    fn for_agent<'a>(
        &self,
        records: &'a [TraceRecord],
        agent: &'a AgentId,
    ) -> impl Iterator<Item = &'a TraceRecord> + 'a {
        records.iter().filter(move |r| r.agent_id() == agent)
    }

    fn failure_counts(&self, records: &[TraceRecord]) -> BTreeMap<AgentId, usize> {
        let mut counts = BTreeMap::new();
        for record in records.iter().filter(|r| self.classifier.is_failure(r)) {
            *counts.entry(record.agent_id().clone()).or_insert(0) += 1;
        }
        counts
    }

    fn category_breakdown(&self, records: &[&TraceRecord]) -> BTreeMap<FailureCategory, usize> {
        let mut counts = BTreeMap::new();
        for record in records.iter().filter(|r| self.classifier.is_failure(r)) {
            *counts.entry(self.classifier.classify(record.message())).or_insert(0) += 1;
        }
        counts
    }

    fn failure_messages(&self, records: &[&TraceRecord]) -> BTreeSet<String> {
        records
            .iter()
            .filter(|r| self.classifier.is_failure(r))
            .map(|r| r.message().trim().to_string())
            .collect()
    }
}

fn recovery_millis(failed_at: DateTime<Utc>, recovered_at: DateTime<Utc>) -> i64 {
    (recovered_at - failed_at).num_milliseconds()
}
