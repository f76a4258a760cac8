// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Analysis Runner
//!
//! Turns a trace snapshot into a [`FailureReport`]: failure counts by
//! category and by agent, the chronological failure trail, cross-agent
//! propagation steps, and which agent introduced each failure.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Post-run failure summary over any `TraceSource`

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;

use crate::application::propagation::{failure_introductions, propagation_steps};
use crate::domain::classification::{FailureCategory, FailureClassifier};
use crate::domain::collection::CollectionResult;
use crate::domain::report::{CollectionStatus, FailureReport, FailureTrailEntry};
use crate::domain::source::{SourceError, TraceSource};
use crate::domain::trace::TraceRecord;

#[derive(Debug, Clone, Default)]
pub struct AnalysisRunner {
    classifier: FailureClassifier,
}

impl AnalysisRunner {
    pub fn new(classifier: FailureClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &FailureClassifier {
        &self.classifier
    }

    /// Analyse a complete snapshot.
    pub fn analyze(&self, records: &[TraceRecord]) -> FailureReport {
        self.build(records, CollectionStatus::Complete)
    }

    /// Analyse a remote collection pass; unreachable agents mark the report
    /// incomplete.
    pub fn analyze_collection(&self, result: &CollectionResult) -> FailureReport {
        let status = if result.is_complete() {
            CollectionStatus::Complete
        } else {
            CollectionStatus::Incomplete {
                diagnostics: result.diagnostics.clone(),
            }
        };
        self.build(&result.records, status)
    }

    /// Snapshot `source` and analyse it. Agents the source could not reach
    /// mark the report incomplete.
    pub async fn analyze_source(&self, source: &dyn TraceSource) -> Result<FailureReport, SourceError> {
        let snapshot = source.snapshot().await?;
        Ok(self.analyze_collection(&snapshot))
    }

    fn build(&self, records: &[TraceRecord], collection: CollectionStatus) -> FailureReport {
        let mut category_counts: BTreeMap<FailureCategory, usize> =
            FailureCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut agent_failure_counts = BTreeMap::new();
        let mut failure_trail = Vec::new();

        for record in records {
            let agent_count = agent_failure_counts
                .entry(record.agent_id().clone())
                .or_insert(0usize);

            if !self.classifier.is_failure(record) {
                continue;
            }

            let category = self.classifier.classify(record.message());
            *agent_count += 1;
            *category_counts.entry(category).or_insert(0) += 1;
            failure_trail.push(FailureTrailEntry {
                agent_id: record.agent_id().clone(),
                timestamp: record.timestamp(),
                level: record.level(),
                category,
                message: record.message().to_string(),
            });
        }

        // stable: same-instant failures keep snapshot order
        failure_trail.sort_by_key(|entry| entry.timestamp);

        let propagation = propagation_steps(&failure_trail);
        let introductions = failure_introductions(&failure_trail);

        info!(
            records = records.len(),
            failures = failure_trail.len(),
            "Trace analysis complete"
        );

        FailureReport {
            total_records: records.len(),
            category_counts,
            agent_failure_counts,
            failure_trail,
            propagation,
            introductions,
            collection,
            generated_at: Utc::now(),
        }
    }
}

/// Analyse with the built-in taxonomy.
pub fn analyze(records: &[TraceRecord]) -> FailureReport {
    AnalysisRunner::default().analyze(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collection::{CollectionDiagnostic, CollectionError};
    use crate::domain::report::ReportOutcome;
    use crate::domain::trace::{AgentId, LogLevel};
    use chrono::{TimeZone, Utc};

    fn record(agent: &str, second: u32, level: LogLevel, message: &str) -> TraceRecord {
        TraceRecord::new(
            AgentId::new(agent).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, second).unwrap(),
            level,
            message,
        )
    }

    #[test]
    fn test_all_categories_present_at_zero() {
        let report = analyze(&[record("pm", 1, LogLevel::Info, "all good")]);

        assert_eq!(report.category_counts.len(), FailureCategory::ALL.len());
        assert!(report.category_counts.values().all(|c| *c == 0));
        assert_eq!(report.agent_failure_counts[&AgentId::new("pm").unwrap()], 0);
        assert_eq!(report.outcome(), ReportOutcome::NoFailures);
    }

    #[test]
    fn test_failure_trail_is_chronological() {
        let records = vec![
            record("engineer", 9, LogLevel::Error, "Cannot implement due to architecture timeout"),
            record("architect", 3, LogLevel::Error, "System too complex - timeout error"),
            record("pm", 1, LogLevel::Info, "Starting requirements analysis"),
            record("qa_engineer", 12, LogLevel::Info, "Integration test failed - timeout"),
        ];

        let report = analyze(&records);

        let agents: Vec<_> = report.failure_trail.iter().map(|e| e.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["architect", "engineer", "qa_engineer"]);
        assert_eq!(report.first_failing_agent().unwrap().as_str(), "architect");
        assert_eq!(
            report.category_counts[&FailureCategory::ArchitectureDesignError],
            2
        );
        assert_eq!(report.outcome(), ReportOutcome::FailuresObserved { failures: 3 });
    }

    #[test]
    fn test_incomplete_collection_is_distinct_from_clean() {
        let result = CollectionResult {
            records: vec![record("pm", 1, LogLevel::Info, "fine")],
            diagnostics: vec![CollectionDiagnostic {
                agent_id: AgentId::new("architect").unwrap(),
                endpoint: "http://127.0.0.1:9/logs".to_string(),
                error: CollectionError::Timeout(500),
            }],
        };

        let report = AnalysisRunner::default().analyze_collection(&result);

        assert_eq!(report.failure_count(), 0);
        assert_eq!(
            report.outcome(),
            ReportOutcome::Incomplete {
                failures: 0,
                unreachable_agents: 1
            }
        );
        assert!(report.to_string().contains("Collection incomplete"));
    }

    #[test]
    fn test_text_summary_states_outcome_once() {
        let report = analyze(&[record("architect", 2, LogLevel::Error, "System too complex - timeout")]);

        let full = report.to_string();
        assert!(full.starts_with("1 failure(s) observed\n"));
        assert_eq!(full.matches("failure(s) observed").count(), 1);

        let details = report.details().to_string();
        assert!(!details.contains("failure(s) observed"));
        assert!(details.starts_with("Total records: 1"));
    }

    #[test]
    fn test_custom_classifier_is_used() {
        let runner = AnalysisRunner::new(
            FailureClassifier::with_custom_rules(vec![
                crate::domain::classification::ClassificationRule::new(
                    FailureCategory::LlmHallucination,
                    ["invented"],
                ),
            ])
            .with_failure_keywords(["invented"]),
        );

        let report = runner.analyze(&[record("pm", 1, LogLevel::Info, "invented a requirement")]);
        assert_eq!(report.failure_trail[0].category, FailureCategory::LlmHallucination);
    }

    #[test]
    fn test_report_serializes_category_labels() {
        let report = analyze(&[record("architect", 1, LogLevel::Error, "design failed")]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["category_counts"]["Architecture Design Error"], 1);
        assert_eq!(json["agent_failure_counts"]["architect"], 1);
        assert_eq!(json["collection"]["state"], "complete");
    }
}
