// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Property tests: global ordering of the store and totality of
//! classification.

use chrono::{TimeZone, Utc};
use mas_trace_core::infrastructure::TraceStore;
use mas_trace_core::{AgentId, FailureCategory, FailureClassifier, LogLevel, TraceRecord};
use proptest::prelude::*;

const AGENTS: [&str; 3] = ["product_manager", "architect", "engineer"];

fn emission() -> impl Strategy<Value = (usize, i64)> {
    (0..AGENTS.len(), 0i64..20)
}

proptest! {
    #[test]
    fn prop_all_logs_sorted_with_stable_ties(emissions in prop::collection::vec(emission(), 0..60)) {
        let store = TraceStore::new();
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        for (seq, (agent_index, offset)) in emissions.iter().enumerate() {
            let agent = AGENTS[*agent_index];
            let record = TraceRecord::new(
                AgentId::new(agent).unwrap(),
                base + chrono::Duration::seconds(*offset),
                LogLevel::Info,
                seq.to_string(),
            );
            store.emit(agent, record).unwrap();
        }

        let all = store.get_all_logs();
        prop_assert_eq!(all.len(), emissions.len());

        let registration: Vec<AgentId> = store.get_registered_agents();
        let rank = |r: &TraceRecord| registration.iter().position(|a| a == r.agent_id()).unwrap();
        for pair in all.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.timestamp() <= b.timestamp());
            if a.timestamp() == b.timestamp() {
                prop_assert!(rank(a) <= rank(b));
                if rank(a) == rank(b) {
                    let (sa, sb): (usize, usize) = (a.message().parse().unwrap(), b.message().parse().unwrap());
                    prop_assert!(sa < sb);
                }
            }
        }
    }

    #[test]
    fn prop_classification_is_total(message in ".*") {
        let category = FailureClassifier::default().classify(&message);
        prop_assert!(FailureCategory::ALL.contains(&category));
    }

    #[test]
    fn prop_classification_ignores_case(message in "[a-zA-Z ]{0,40}") {
        let classifier = FailureClassifier::default();
        prop_assert_eq!(
            classifier.classify(&message.to_uppercase()),
            classifier.classify(&message.to_lowercase())
        );
    }
}
