// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Trace collection and failure classification for multi-agent pipelines.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Aggregates per-agent trace records, classifies failures,
//!   and reports which agent failed first and why

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
