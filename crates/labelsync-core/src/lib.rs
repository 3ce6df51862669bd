//! Version diffing and label reconciliation for catalog policy rules
//!
//! This crate implements the engine behind `labelsync`:
//!
//! - **Key derivation**: a stable semantic key per rule, independent of the
//!   platform-assigned rule identifier
//! - **Rule registry**: the persisted, append-only record of the first rule
//!   identifier observed for every (policy, key) pair
//! - **Version diff**: which rules of the latest policy version are not yet
//!   known to the registry
//! - **Label reconciliation**: which labels to add or remove so the server
//!   carries `{derived key -> original rule id}` for every rule
//! - **SyncEngine**: bounded-concurrency orchestration of the above across
//!   policies, with per-policy failure isolation
//!
//! # Architecture
//!
//! ```text
//!              labelsync-cli
//!                    |
//!   labelsync-client | (LabelPlatform impl)
//!                \   |
//!            labelsync-core
//!                    |
//!              labelsync-fs
//! ```
//!
//! Remote access goes through the [`LabelPlatform`] trait, so the engine
//! runs unchanged against the HTTP client or an in-memory fake.

pub mod config;
pub mod diff;
pub mod error;
pub mod key;
pub mod labels;
pub mod model;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod sync;
pub mod warning;

pub use config::{
    PlatformSettings, PolicyFilter, PolicyType, RetrySettings, Settings, SyncSettings,
};
pub use diff::{DiffOutcome, dedupe_rules, diff};
pub use error::{Error, Result};
pub use key::{KeyError, derive_key, key_rules, normalize_expression};
pub use labels::build_label_set;
pub use model::{
    DEFAULT_RECON_TYPE, Label, LabelSet, Policy, PolicyKind, PolicySummary, RuleAttributes,
    RuleDefinition, RuleKind, RuleRecord,
};
pub use platform::{LabelPlatform, LabelWrite, RuleVersion};
pub use reconcile::{LabelPlan, ReconcileMode, reconcile};
pub use registry::{RegistryEntry, RuleRegistry};
pub use sync::{
    PolicyPhase, ReportTotals, RunKind, SyncEngine, SyncOptions, SyncOutcome, SyncReport,
};
pub use warning::SyncWarning;
