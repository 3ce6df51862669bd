//! Per-policy outcomes and run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::model::Policy;
use crate::reconcile::ReconcileMode;
use crate::warning::SyncWarning;

/// How far a policy got through a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPhase {
    /// Not started
    Pending,
    /// Version 1 recorded in the registry (final phase of a capture run)
    Captured,
    /// Latest version diffed and additions recorded
    Diffed,
    /// Target label set computed
    LabelsBuilt,
    /// Label plan applied (final phase of a successful sync)
    Reconciled,
    /// An error stopped the policy
    Failed,
    /// The run was aborted before the policy started
    Abandoned,
}

impl fmt::Display for PolicyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Captured => "captured",
            Self::Diffed => "diffed",
            Self::LabelsBuilt => "labels built",
            Self::Reconciled => "reconciled",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Result of processing one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub policy_id: String,
    pub policy_name: String,
    pub phase: PolicyPhase,
    /// Last phase reached before a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_after: Option<PolicyPhase>,
    /// Whether version 1 was captured during this run
    #[serde(default)]
    pub baseline_captured: bool,
    /// New registry entries (would-be entries in a dry run)
    pub added_count: usize,
    pub labels_applied: usize,
    pub labels_removed: usize,
    pub labels_skipped: usize,
    #[serde(default)]
    pub warnings: Vec<SyncWarning>,
    /// Human-readable actions taken, prefixed with `[dry-run]` when simulated
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    /// A fresh outcome in the `Pending` phase
    pub fn pending(policy: &Policy) -> Self {
        Self {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            phase: PolicyPhase::Pending,
            failed_after: None,
            baseline_captured: false,
            added_count: 0,
            labels_applied: 0,
            labels_removed: 0,
            labels_skipped: 0,
            warnings: Vec::new(),
            actions: Vec::new(),
            error: None,
        }
    }

    /// An outcome for a policy the run never started
    pub fn abandoned(policy: &Policy) -> Self {
        Self {
            phase: PolicyPhase::Abandoned,
            ..Self::pending(policy)
        }
    }

    /// Move to the `Failed` phase, keeping counts gathered so far
    pub fn fail(&mut self, reason: impl fmt::Display) {
        self.failed_after = Some(self.phase);
        self.phase = PolicyPhase::Failed;
        self.error = Some(reason.to_string());
    }

    pub fn is_failed(&self) -> bool {
        self.phase == PolicyPhase::Failed
    }

    pub fn is_abandoned(&self) -> bool {
        self.phase == PolicyPhase::Abandoned
    }
}

/// Which operation produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Baseline capture only
    Capture,
    /// Diff and label reconciliation
    Sync,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => f.write_str("capture"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

/// Aggregated counts across a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub policies: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub registry_entries_added: usize,
    pub labels_applied: usize,
    pub labels_removed: usize,
    pub labels_skipped: usize,
    pub warnings: usize,
}

impl ReportTotals {
    fn from_outcomes(outcomes: &[SyncOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                policies: outcomes.len(),
                ..Self::default()
            },
            |mut totals, outcome| {
                match outcome.phase {
                    PolicyPhase::Failed => totals.failed += 1,
                    PolicyPhase::Abandoned => totals.abandoned += 1,
                    _ => totals.succeeded += 1,
                }
                totals.registry_entries_added += outcome.added_count;
                totals.labels_applied += outcome.labels_applied;
                totals.labels_removed += outcome.labels_removed;
                totals.labels_skipped += outcome.labels_skipped;
                totals.warnings += outcome.warnings.len();
                totals
            },
        )
    }
}

/// Report of a capture or sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mode: ReconcileMode,
    pub dry_run: bool,
    pub totals: ReportTotals,
    /// Per-policy outcomes, ordered by policy id
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    /// Finish a run started at `started_at`
    pub fn finish(
        kind: RunKind,
        started_at: DateTime<Utc>,
        mode: ReconcileMode,
        dry_run: bool,
        mut outcomes: Vec<SyncOutcome>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.policy_id.cmp(&b.policy_id));
        Self {
            run_id: Uuid::new_v4(),
            kind,
            started_at,
            finished_at: Utc::now(),
            mode,
            dry_run,
            totals: ReportTotals::from_outcomes(&outcomes),
            outcomes,
        }
    }

    /// Outcomes of policies that failed
    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Whether the run was cut short by an abort
    pub fn was_aborted(&self) -> bool {
        self.totals.abandoned > 0
    }

    /// True when no policy failed
    pub fn is_success(&self) -> bool {
        self.totals.failed == 0
    }

    pub fn outcome(&self, policy_id: &str) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.policy_id == policy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PolicyKind;
    use pretty_assertions::assert_eq;

    fn policy(id: &str) -> Policy {
        Policy::new(id, format!("policy {id}"), PolicyKind::DataQuality)
    }

    #[test]
    fn fail_records_last_phase() {
        let mut outcome = SyncOutcome::pending(&policy("1"));
        outcome.phase = PolicyPhase::Diffed;
        outcome.fail("boom");

        assert_eq!(outcome.phase, PolicyPhase::Failed);
        assert_eq!(outcome.failed_after, Some(PolicyPhase::Diffed));
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn report_sorts_and_totals_outcomes() {
        let mut ok = SyncOutcome::pending(&policy("b"));
        ok.phase = PolicyPhase::Reconciled;
        ok.added_count = 2;
        ok.labels_applied = 3;
        ok.labels_skipped = 1;

        let mut failed = SyncOutcome::pending(&policy("a"));
        failed.fail("timeout");

        let abandoned = SyncOutcome::abandoned(&policy("c"));

        let report = SyncReport::finish(
            RunKind::Sync,
            Utc::now(),
            ReconcileMode::Idempotent,
            false,
            vec![ok, failed, abandoned],
        );

        let ids: Vec<_> = report.outcomes.iter().map(|o| o.policy_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(report.totals.succeeded, 1);
        assert_eq!(report.totals.failed, 1);
        assert_eq!(report.totals.abandoned, 1);
        assert_eq!(report.totals.registry_entries_added, 2);
        assert_eq!(report.totals.labels_applied, 3);
        assert!(!report.is_success());
        assert!(report.was_aborted());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn report_serializes_phase_in_snake_case() {
        let mut outcome = SyncOutcome::pending(&policy("1"));
        outcome.phase = PolicyPhase::LabelsBuilt;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["phase"], "labels_built");
        assert!(json.get("error").is_none());
    }
}
