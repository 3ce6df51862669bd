//! Sync orchestration across policies
//!
//! This module provides:
//! - **engine**: the [`SyncEngine`], a bounded worker pool that drives each
//!   policy through capture, diff, label building and reconciliation
//! - **outcome**: per-policy [`SyncOutcome`]s and the aggregated [`SyncReport`]

mod engine;
mod outcome;

pub use engine::{SyncEngine, SyncOptions};
pub use outcome::{PolicyPhase, ReportTotals, RunKind, SyncOutcome, SyncReport};
