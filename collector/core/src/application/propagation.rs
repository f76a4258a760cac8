// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Failure propagation over a chronological failure trail.

use std::collections::HashSet;

use crate::domain::report::{FailureIntroduction, FailureTrailEntry, PropagationStep};

/// Each failure that directly follows a failure from a different agent is
/// read as propagation from the earlier agent to the later one.
pub fn propagation_steps(trail: &[FailureTrailEntry]) -> Vec<PropagationStep> {
    trail
        .windows(2)
        .filter(|pair| pair[0].agent_id != pair[1].agent_id)
        .map(|pair| PropagationStep {
            source_agent: pair[0].agent_id.clone(),
            target_agent: pair[1].agent_id.clone(),
            timestamp: pair[1].timestamp,
            message: pair[1].message.clone(),
        })
        .collect()
}

/// First agent to produce each distinct failure message (compared trimmed).
pub fn failure_introductions(trail: &[FailureTrailEntry]) -> Vec<FailureIntroduction> {
    let mut seen = HashSet::new();
    trail
        .iter()
        .filter(|entry| seen.insert(entry.message.trim().to_string()))
        .map(|entry| FailureIntroduction {
            message: entry.message.trim().to_string(),
            agent_id: entry.agent_id.clone(),
            timestamp: entry.timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classification::FailureCategory;
    use crate::domain::trace::{AgentId, LogLevel};
    use chrono::{TimeZone, Utc};

    fn entry(agent: &str, second: u32, message: &str) -> FailureTrailEntry {
        FailureTrailEntry {
            agent_id: AgentId::new(agent).unwrap(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, second).unwrap(),
            level: LogLevel::Error,
            category: FailureCategory::Other,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_steps_only_between_different_agents() {
        let trail = vec![
            entry("architect", 1, "design timeout"),
            entry("architect", 2, "design failed"),
            entry("engineer", 3, "blocked by architecture failure"),
            entry("qa_engineer", 4, "testing blocked"),
        ];

        let steps = propagation_steps(&trail);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].source_agent.as_str(), "architect");
        assert_eq!(steps[0].target_agent.as_str(), "engineer");
        assert_eq!(steps[1].source_agent.as_str(), "engineer");
        assert_eq!(steps[1].target_agent.as_str(), "qa_engineer");
        assert_eq!(steps[1].message, "testing blocked");
    }

    #[test]
    fn test_single_agent_has_no_propagation() {
        assert!(propagation_steps(&[entry("pm", 1, "x"), entry("pm", 2, "y")]).is_empty());
        assert!(propagation_steps(&[]).is_empty());
    }

    #[test]
    fn test_introductions_keep_first_agent() {
        let trail = vec![
            entry("architect", 1, "timeout error "),
            entry("engineer", 2, "timeout error"),
            entry("engineer", 3, "cannot implement"),
        ];

        let intros = failure_introductions(&trail);

        assert_eq!(intros.len(), 2);
        assert_eq!(intros[0].message, "timeout error");
        assert_eq!(intros[0].agent_id.as_str(), "architect");
        assert_eq!(intros[1].agent_id.as_str(), "engineer");
    }
}
