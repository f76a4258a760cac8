// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Log Sink
//!
//! Bridges an agent's logging calls into trace records without the agent
//! knowing the store's shape. Two entry points:
//!
//! - [`AgentLogSink`]: explicit `emit(level, message, timestamp)` calls.
//! - [`TraceLayer`]: a `tracing_subscriber::Layer`, so agents that already log
//!   through `tracing` are captured by adding a field `agent_id = "..."` to
//!   their events or to an enclosing span.
//!
//! Forwarding never fails toward the agent. When the store rejects a record
//! (disposed, mismatched) the sink reports it on the `mas_trace::fallback`
//! target and drops the record.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Adapter from native logging to `TraceSink`

use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};
use std::sync::{Arc, Weak};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{warn, Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::domain::source::{IngestError, TraceSink};
use crate::domain::trace::{AgentId, LogLevel, TraceRecord};
use crate::infrastructure::trace_store::TraceStore;

pub const FALLBACK_TARGET: &str = "mas_trace::fallback";

/// Events from this crate are never captured by [`TraceLayer`].
const INTERNAL_TARGET_PREFIX: &str = "mas_trace_core";

const AGENT_FIELD: &str = "agent_id";

/// Per-agent sink. Clones share the same binding.
#[derive(Clone)]
pub struct AgentLogSink {
    agent_id: AgentId,
    target: Weak<dyn TraceSink>,
}

impl fmt::Debug for AgentLogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentLogSink")
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

/// Attach a sink for `agent_id` to `store`.
///
/// Idempotent: attaching the same agent again returns the sink already bound
/// to it, so each emission is forwarded exactly once.
pub fn make_sink(agent_id: &str, store: &TraceStore) -> Result<AgentLogSink, IngestError> {
    let agent_id = AgentId::new(agent_id)?;
    TraceSink::register(store, &agent_id)?;

    let sink = store
        .sink_cache()
        .entry(agent_id.clone())
        .or_insert_with(|| AgentLogSink {
            agent_id,
            target: store.downgrade_sink(),
        })
        .value()
        .clone();
    Ok(sink)
}

impl TraceStore {
    /// See [`make_sink`].
    pub fn make_sink(&self, agent_id: &str) -> Result<AgentLogSink, IngestError> {
        make_sink(agent_id, self)
    }
}

impl AgentLogSink {
    /// Sink over any `TraceSink`. Holds it weakly.
    pub fn new(agent_id: AgentId, target: &Arc<dyn TraceSink>) -> Self {
        Self {
            agent_id,
            target: Arc::downgrade(target),
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Forward one event. Stamps the current time when `timestamp` is `None`.
    pub fn emit(&self, level: LogLevel, message: impl Into<String>, timestamp: Option<DateTime<Utc>>) {
        let record = TraceRecord::new(
            self.agent_id.clone(),
            timestamp.unwrap_or_else(Utc::now),
            level,
            message,
        );

        let result = match self.target.upgrade() {
            Some(target) => target.append(&self.agent_id, record),
            None => Err(IngestError::StoreDisposed),
        };

        if let Err(e) = result {
            metrics::counter!("mas_trace_forward_failures_total").increment(1);
            warn!(
                target: FALLBACK_TARGET,
                agent_id = %self.agent_id,
                error = %e,
                "Dropping trace record"
            );
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message, None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message, None);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.emit(LogLevel::Critical, message, None);
    }
}

/// `tracing` layer that routes agent-scoped events into a [`TraceStore`].
///
/// The agent is taken from an `agent_id` field on the event itself, or from
/// the nearest enclosing span that declares one. Events without an agent are
/// ignored.
pub struct TraceLayer {
    store: TraceStore,
}

impl TraceLayer {
    pub fn new(store: TraceStore) -> Self {
        Self { store }
    }
}

/// Agent scope remembered in span extensions.
struct AgentScope(String);

#[derive(Default)]
struct EventVisitor {
    agent_id: Option<String>,
    message: Option<String>,
    fields: String,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            AGENT_FIELD => self.agent_id = Some(value.to_string()),
            "message" => self.message = Some(value.to_string()),
            name => {
                let _ = write!(self.fields, " {}={}", name, value);
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            AGENT_FIELD => self.agent_id = Some(format!("{:?}", value).trim_matches('"').to_string()),
            "message" => self.message = Some(format!("{:?}", value)),
            name => {
                let _ = write!(self.fields, " {}={:?}", name, value);
            }
        }
    }
}

impl EventVisitor {
    fn into_message(self) -> String {
        let mut message = self.message.unwrap_or_default();
        if !self.fields.is_empty() {
            message.push_str(&self.fields);
        }
        message
    }
}

impl<S> Layer<S> for TraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(agent_id), Some(span)) = (visitor.agent_id, ctx.span(id)) {
            span.extensions_mut().insert(AgentScope(agent_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if target.starts_with(INTERNAL_TARGET_PREFIX) || target == FALLBACK_TARGET {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let agent_id = visitor.agent_id.take().or_else(|| {
            ctx.event_scope(event).and_then(|mut scope| {
                scope.find_map(|span| {
                    let extensions = span.extensions();
                    let agent = extensions.get::<AgentScope>().map(|s| s.0.clone());
                    agent
                })
            })
        });
        let Some(agent_id) = agent_id else {
            return;
        };

        let level = LogLevel::from(event.metadata().level());
        match self.store.make_sink(&agent_id) {
            Ok(sink) => sink.emit(level, visitor.into_message(), None),
            Err(e) => warn!(
                target: FALLBACK_TARGET,
                agent_id = %agent_id,
                error = %e,
                "Dropping trace record"
            ),
        }
    }
}
