// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Trace records, the failure taxonomy, source/sink contracts, and the value
//! types produced by analysis.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and pure rules with no I/O

pub mod classification;
pub mod collection;
pub mod config;
pub mod events;
pub mod report;
pub mod source;
pub mod trace;

pub use classification::{ClassificationRule, FailureCategory, FailureClassifier};
pub use collection::{CollectionDiagnostic, CollectionError, CollectionResult};
pub use events::{FailureAlert, FailureKey, TraceEvent};
pub use report::{FailureReport, FailureTrailEntry, ReportOutcome};
pub use source::{IngestError, SourceError, TraceSink, TraceSource};
pub use trace::{AgentId, LogLevel, TraceRecord};
