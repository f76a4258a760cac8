// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`mas-trace-core`)
//!
//! HTTP surface over the trace store. Handlers only translate requests into
//! store calls; the per-agent GET route speaks the same record schema the
//! remote collector pulls, so a served store is itself a collection target.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | Discovery, per-agent and store-wide record endpoints |

pub mod api;
