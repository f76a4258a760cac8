// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trace Store
//!
//! The authoritative in-memory aggregation point for trace records across all
//! agents in a run. One explicitly constructed instance is shared by
//! producers and consumers; there is no process-wide global.
//!
//! Locking: the registry is a `DashMap` of per-agent logs, and each log guards
//! its own `Vec` with a `parking_lot::Mutex`. An append holds exactly one
//! agent's lock for the duration of a `push`; a read holds it for one clone.
//! Writers to different agents never contend, and no lock is ever held across
//! a registry shard lock.
//!
//! Lifecycle:
//! - `reset()` un-registers every agent. Handles and sinks created earlier
//!   stay usable; their next emission re-registers the agent.
//! - `dispose()` resets and then rejects every further write.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Concurrency-safe `TraceSink` + `TraceSource` implementation

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::domain::source::{IngestError, SourceError, TraceSink, TraceSource};
use crate::domain::trace::{AgentId, TraceRecord};
use crate::infrastructure::log_sink::AgentLogSink;

/// One agent's registration: its position in registration order and its
/// append-only record sequence.
struct AgentLog {
    registration: u64,
    records: Mutex<Vec<TraceRecord>>,
}

pub(crate) struct StoreInner {
    agents: DashMap<AgentId, Arc<AgentLog>>,
    sinks: DashMap<AgentId, AgentLogSink>,
    next_registration: AtomicU64,
    disposed: AtomicBool,
}

impl StoreInner {
    fn log_for(&self, agent_id: &AgentId) -> Arc<AgentLog> {
        if let Some(existing) = self.agents.get(agent_id) {
            return existing.value().clone();
        }
        self.agents
            .entry(agent_id.clone())
            .or_insert_with(|| {
                debug!(agent_id = %agent_id, "Registering agent");
                Arc::new(AgentLog {
                    registration: self.next_registration.fetch_add(1, Ordering::SeqCst),
                    records: Mutex::new(Vec::new()),
                })
            })
            .value()
            .clone()
    }

    fn existing_log(&self, agent_id: &str) -> Option<Arc<AgentLog>> {
        let agent_id = AgentId::new(agent_id).ok()?;
        self.agents.get(&agent_id).map(|entry| entry.value().clone())
    }

    /// Registered logs in registration order.
    fn logs_in_registration_order(&self) -> Vec<(AgentId, Arc<AgentLog>)> {
        let mut logs: Vec<(AgentId, Arc<AgentLog>)> = self
            .agents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        logs.sort_by_key(|(_, log)| log.registration);
        logs
    }

    fn ensure_open(&self) -> Result<(), IngestError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(IngestError::StoreDisposed);
        }
        Ok(())
    }

    /// Undo a write that raced `dispose()`.
    ///
    /// `dispose` sets the flag before clearing the registry, so a writer that
    /// still sees the store open here had its entry inserted before the clear.
    fn settle_after_write(&self, agent_id: &AgentId) -> Result<(), IngestError> {
        if self.disposed.load(Ordering::SeqCst) {
            self.agents.remove(agent_id);
            return Err(IngestError::StoreDisposed);
        }
        Ok(())
    }
}

impl TraceSink for StoreInner {
    fn register(&self, agent_id: &AgentId) -> Result<(), IngestError> {
        self.ensure_open()?;
        self.log_for(agent_id);
        self.settle_after_write(agent_id)
    }

    fn append(&self, agent_id: &AgentId, record: TraceRecord) -> Result<(), IngestError> {
        self.ensure_open()?;
        if record.agent_id() != agent_id {
            return Err(IngestError::AgentMismatch {
                target: agent_id.to_string(),
                record: record.agent_id().to_string(),
            });
        }

        let log = self.log_for(agent_id);
        log.records.lock().push(record);
        self.settle_after_write(agent_id)?;

        metrics::counter!("mas_trace_records_ingested_total", "agent" => agent_id.to_string())
            .increment(1);
        Ok(())
    }
}

/// Concurrency-safe registry of agent id → ordered trace records.
///
/// Cloning is cheap and every clone refers to the same store.
#[derive(Clone)]
pub struct TraceStore {
    inner: Arc<StoreInner>,
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                agents: DashMap::new(),
                sinks: DashMap::new(),
                next_registration: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register `agent_id` (idempotent) and return a handle bound to it.
    ///
    /// Every handle for the same id appends to the same sequence.
    pub fn register(&self, agent_id: &str) -> Result<SinkHandle, IngestError> {
        let agent_id = AgentId::new(agent_id)?;
        self.inner.register(&agent_id)?;
        Ok(SinkHandle {
            agent_id,
            store: Arc::downgrade(&self.inner),
        })
    }

    /// Append `record` to `agent_id`'s sequence, registering the agent on
    /// first write. Fails only for malformed input or a disposed store.
    pub fn emit(&self, agent_id: &str, record: TraceRecord) -> Result<(), IngestError> {
        let agent_id = AgentId::new(agent_id)?;
        self.inner.append(&agent_id, record)
    }

    /// Snapshot of one agent's records in insertion order. Unknown agents
    /// yield an empty sequence.
    pub fn get_agent_logs(&self, agent_id: &str) -> Vec<TraceRecord> {
        self.inner
            .existing_log(agent_id)
            .map(|log| log.records.lock().clone())
            .unwrap_or_default()
    }

    /// Every record across all agents, ordered by timestamp ascending. Ties
    /// break on agent registration order, then insertion order.
    pub fn get_all_logs(&self) -> Vec<TraceRecord> {
        let mut all = Vec::new();
        for (_, log) in self.inner.logs_in_registration_order() {
            all.extend(log.records.lock().iter().cloned());
        }
        // stable: equal timestamps keep (registration, insertion) order
        all.sort_by_key(|record| record.timestamp());
        all
    }

    /// Registered agent ids in registration order.
    pub fn get_registered_agents(&self) -> Vec<AgentId> {
        self.inner
            .logs_in_registration_order()
            .into_iter()
            .map(|(agent_id, _)| agent_id)
            .collect()
    }

    /// Drop every record of one agent. The agent stays registered.
    pub fn clear_agent_logs(&self, agent_id: &str) {
        if let Some(log) = self.inner.existing_log(agent_id) {
            log.records.lock().clear();
            debug!(agent_id, "Cleared agent logs");
        }
    }

    /// Un-register every agent and drop all records.
    pub fn reset(&self) {
        self.inner.agents.clear();
        debug!("Trace store reset");
    }

    /// Reset and refuse every further write.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.agents.clear();
        self.inner.sinks.clear();
        debug!("Trace store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn record_count(&self) -> usize {
        self.inner
            .agents
            .iter()
            .map(|entry| entry.value().records.lock().len())
            .sum()
    }

    /// Write side of this store as a shareable trait object.
    pub fn as_sink(&self) -> Arc<dyn TraceSink> {
        self.inner.clone()
    }

    pub(crate) fn downgrade_sink(&self) -> Weak<dyn TraceSink> {
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        weak
    }

    pub(crate) fn sink_cache(&self) -> &DashMap<AgentId, AgentLogSink> {
        &self.inner.sinks
    }
}

impl TraceSink for TraceStore {
    fn register(&self, agent_id: &AgentId) -> Result<(), IngestError> {
        self.inner.register(agent_id)
    }

    fn append(&self, agent_id: &AgentId, record: TraceRecord) -> Result<(), IngestError> {
        self.inner.append(agent_id, record)
    }
}

#[async_trait]
impl TraceSource for TraceStore {
    async fn agent_logs(&self, agent_id: &AgentId) -> Result<Vec<TraceRecord>, SourceError> {
        Ok(self.get_agent_logs(agent_id.as_str()))
    }

    async fn all_logs(&self) -> Result<Vec<TraceRecord>, SourceError> {
        Ok(self.get_all_logs())
    }

    async fn registered_agents(&self) -> Result<Vec<AgentId>, SourceError> {
        Ok(self.get_registered_agents())
    }
}

/// Handle returned by [`TraceStore::register`].
///
/// Holds a weak reference: a handle never keeps a store alive.
#[derive(Clone)]
pub struct SinkHandle {
    agent_id: AgentId,
    store: Weak<StoreInner>,
}

impl SinkHandle {
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn emit(&self, record: TraceRecord) -> Result<(), IngestError> {
        let store = self.store.upgrade().ok_or(IngestError::StoreDisposed)?;
        store.append(&self.agent_id, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trace::LogLevel;
    use chrono::{TimeZone, Utc};

    fn at(agent: &str, second: u32, message: &str) -> TraceRecord {
        TraceRecord::new(
            AgentId::new(agent).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, second).unwrap(),
            LogLevel::Info,
            message,
        )
    }

    #[test]
    fn test_register_is_idempotent() {
        let store = TraceStore::new();
        let first = store.register("architect").unwrap();
        let second = store.register("architect").unwrap();

        first.emit(at("architect", 1, "one")).unwrap();
        second.emit(at("architect", 2, "two")).unwrap();

        assert_eq!(store.get_registered_agents().len(), 1);
        let logs = store.get_agent_logs("architect");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message(), "one");
        assert_eq!(logs[1].message(), "two");
    }

    #[test]
    fn test_unknown_agent_reads_empty() {
        let store = TraceStore::new();
        assert!(store.get_agent_logs("ghost").is_empty());
        assert!(store.get_agent_logs("").is_empty());
        store.clear_agent_logs("ghost");
    }

    #[test]
    fn test_emit_registers_implicitly() {
        let store = TraceStore::new();
        store.emit("engineer", at("engineer", 1, "hello")).unwrap();
        assert_eq!(store.get_registered_agents(), vec![AgentId::new("engineer").unwrap()]);
    }

    #[test]
    fn test_emit_rejects_malformed_input() {
        let store = TraceStore::new();
        assert_eq!(
            store.emit("", at("engineer", 1, "x")),
            Err(IngestError::EmptyAgentId)
        );
        assert!(matches!(
            store.emit("architect", at("engineer", 1, "x")),
            Err(IngestError::AgentMismatch { .. })
        ));
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_all_logs_sorted_with_registration_tie_break() {
        let store = TraceStore::new();
        store.register("b_first").unwrap();
        store.register("a_second").unwrap();

        store.emit("a_second", at("a_second", 5, "a-5")).unwrap();
        store.emit("a_second", at("a_second", 1, "a-1")).unwrap();
        store.emit("b_first", at("b_first", 5, "b-5")).unwrap();
        store.emit("b_first", at("b_first", 5, "b-5-again")).unwrap();

        let messages: Vec<_> = store
            .get_all_logs()
            .iter()
            .map(|r| r.message().to_string())
            .collect();
        assert_eq!(messages, vec!["a-1", "b-5", "b-5-again", "a-5"]);
    }

    #[test]
    fn test_clear_is_scoped_to_one_agent() {
        let store = TraceStore::new();
        store.emit("pm", at("pm", 1, "pm")).unwrap();
        store.emit("qa", at("qa", 2, "qa")).unwrap();

        store.clear_agent_logs("pm");

        assert!(store.get_agent_logs("pm").is_empty());
        assert_eq!(store.get_agent_logs("qa").len(), 1);
        assert_eq!(store.get_registered_agents().len(), 2);
    }

    #[test]
    fn test_reset_unregisters_but_handles_survive() {
        let store = TraceStore::new();
        let handle = store.register("pm").unwrap();
        store.emit("qa", at("qa", 1, "qa")).unwrap();
        handle.emit(at("pm", 2, "before")).unwrap();

        store.reset();
        assert!(store.get_registered_agents().is_empty());
        assert!(store.get_all_logs().is_empty());

        handle.emit(at("pm", 3, "after")).unwrap();
        assert_eq!(store.get_registered_agents(), vec![AgentId::new("pm").unwrap()]);
        assert_eq!(store.get_agent_logs("pm")[0].message(), "after");
    }

    #[test]
    fn test_dispose_rejects_writes() {
        let store = TraceStore::new();
        let handle = store.register("pm").unwrap();
        store.dispose();

        assert_eq!(handle.emit(at("pm", 1, "x")), Err(IngestError::StoreDisposed));
        assert_eq!(store.emit("pm", at("pm", 1, "x")), Err(IngestError::StoreDisposed));
        assert!(store.get_all_logs().is_empty());
        assert!(store.is_disposed());
    }

    #[test]
    fn test_handle_does_not_keep_store_alive() {
        let handle = {
            let store = TraceStore::new();
            store.register("pm").unwrap()
        };
        assert_eq!(handle.emit(at("pm", 1, "x")), Err(IngestError::StoreDisposed));
    }

    #[test]
    fn test_returned_snapshots_are_copies() {
        let store = TraceStore::new();
        store.emit("pm", at("pm", 1, "x")).unwrap();
        let mut snapshot = store.get_agent_logs("pm");
        snapshot.clear();
        assert_eq!(store.get_agent_logs("pm").len(), 1);
    }

    #[tokio::test]
    async fn test_trace_source_view() {
        let store = TraceStore::new();
        store.emit("pm", at("pm", 1, "x")).unwrap();
        let source: Arc<dyn TraceSource> = Arc::new(store.clone());

        assert_eq!(source.all_logs().await.unwrap().len(), 1);
        assert_eq!(
            source.agent_logs(&AgentId::new("pm").unwrap()).await.unwrap().len(),
            1
        );
        assert_eq!(source.registered_agents().await.unwrap().len(), 1);
    }
}
