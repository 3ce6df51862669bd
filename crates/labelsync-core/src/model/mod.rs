//! Domain model: policies, rules and labels
//!
//! Policies and their rules are read from the platform and never modified
//! by the engine, apart from the labels attached to each rule.

mod label;
mod policy;
mod rule;

pub use label::{Label, LabelSet};
pub use policy::{Policy, PolicyKind, PolicySummary};
pub use rule::{DEFAULT_RECON_TYPE, RuleAttributes, RuleDefinition, RuleKind, RuleRecord};
