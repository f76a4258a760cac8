// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod analysis;
pub mod live_monitor;
pub mod patch_evaluation;
pub mod propagation;

pub use analysis::{analyze, AnalysisRunner};
pub use live_monitor::{LiveMonitor, LiveMonitorConfig};
pub use patch_evaluation::{AgentPatchDetail, FailureMessageDiff, PatchEvaluator, PatchVerdict};
