// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Concrete ingestion paths (in-process store, HTTP pull), the logging
//! adapters that feed them, table export, and the event bus.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements the domain's source and sink contracts

pub mod event_bus;
pub mod log_sink;
pub mod remote_collector;
pub mod table_export;
pub mod trace_store;

pub use event_bus::EventBus;
pub use log_sink::{make_sink, AgentLogSink, TraceLayer};
pub use remote_collector::RemoteCollector;
pub use trace_store::{SinkHandle, TraceStore};
