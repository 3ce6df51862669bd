//! SyncEngine implementation
//!
//! The SyncEngine drives every selected policy through
//! `Pending -> Diffed -> LabelsBuilt -> Reconciled` using a bounded pool of
//! workers that pull policies from a shared queue. A policy that fails ends
//! in `Failed` without affecting its siblings.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{PolicyFilter, Settings};
use crate::diff::{DiffOutcome, dedupe_rules, diff};
use crate::key::key_rules;
use crate::labels::build_label_set;
use crate::model::{Policy, PolicySummary, RuleRecord};
use crate::platform::{LabelPlatform, RuleVersion};
use crate::reconcile::{LabelPlan, ReconcileMode, reconcile};
use crate::registry::{RegistryEntry, RuleRegistry};
use crate::warning::SyncWarning;
use crate::{Error, Result};

use super::outcome::{PolicyPhase, RunKind, SyncOutcome, SyncReport};

type PolicyQueue = Arc<Mutex<VecDeque<PolicySummary>>>;

/// Options for capture and sync runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub mode: ReconcileMode,
    /// Maximum number of policies in flight
    pub concurrency: usize,
    /// If true, compute plans without writing labels or the registry.
    /// Actions are prefixed with "[dry-run] Would ..."
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: ReconcileMode::Idempotent,
            concurrency: 4,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: settings.mode(),
            concurrency: settings.sync.concurrency,
            dry_run: settings.sync.dry_run,
        }
    }
}

/// Engine for capturing baselines and reconciling labels across policies
///
/// Cloning is cheap; clones share the platform, the registry and the abort
/// flag.
#[derive(Clone)]
pub struct SyncEngine {
    platform: Arc<dyn LabelPlatform>,
    /// Shared registry; the lock is never held across an await
    registry: Arc<Mutex<RuleRegistry>>,
    filter: Arc<PolicyFilter>,
    options: SyncOptions,
    abort: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Create a new SyncEngine
    ///
    /// # Arguments
    ///
    /// * `platform` - Remote access to policies, rules and labels
    /// * `registry` - The loaded rule registry; persisted after each policy
    /// * `filter` - Which policies `discover` selects
    /// * `options` - Reconciliation mode, concurrency and dry-run flag
    pub fn new(
        platform: Arc<dyn LabelPlatform>,
        registry: RuleRegistry,
        filter: PolicyFilter,
        options: SyncOptions,
    ) -> Self {
        Self {
            platform,
            registry: Arc::new(Mutex::new(registry)),
            filter: Arc::new(filter),
            options,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a SyncEngine using the filter and options from `settings`
    pub fn from_settings(
        platform: Arc<dyn LabelPlatform>,
        registry: RuleRegistry,
        settings: &Settings,
    ) -> Self {
        Self::new(
            platform,
            registry,
            settings.filters.clone(),
            SyncOptions::from_settings(settings),
        )
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Flag that stops workers from starting further policies once set
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Request an abort; in-flight policies still finish
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Registry entries recorded for one policy
    pub fn registry_entries(&self, policy_id: &str) -> Result<Vec<RegistryEntry>> {
        self.with_registry(|registry| {
            registry
                .policy_entries(policy_id)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    /// Enumerate policies and keep the supported kinds selected by the filter
    pub async fn discover(&self) -> Result<Vec<PolicySummary>> {
        let listed = self.platform.list_policies(&self.filter).await?;
        let total = listed.len();

        let selected: Vec<PolicySummary> = listed
            .into_iter()
            .filter(|summary| {
                let kind = &summary.policy.kind;
                let keep = kind.is_supported() && self.filter.accepts(kind);
                if !keep {
                    debug!(policy_id = %summary.policy.id, kind = %kind, "policy not selected");
                }
                keep
            })
            .collect();

        info!(listed = total, selected = selected.len(), "discovered policies");
        Ok(selected)
    }

    /// Discover policies and synchronize their labels
    ///
    /// # Errors
    ///
    /// Fails only when enumeration fails. Per-policy errors are reported as
    /// `Failed` outcomes in the returned report.
    pub async fn sync(&self) -> Result<SyncReport> {
        let policies = self.discover().await?;
        Ok(self.sync_policies(policies).await)
    }

    /// Discover policies and record their version 1 rules in the registry
    pub async fn capture(&self) -> Result<SyncReport> {
        let policies = self.discover().await?;
        Ok(self.capture_policies(policies).await)
    }

    pub async fn sync_policies(&self, policies: Vec<PolicySummary>) -> SyncReport {
        self.run(RunKind::Sync, policies).await
    }

    pub async fn capture_policies(&self, policies: Vec<PolicySummary>) -> SyncReport {
        self.run(RunKind::Capture, policies).await
    }

    /// Synchronize one policy, converting any error into a `Failed` outcome
    pub async fn sync_policy(&self, summary: &PolicySummary) -> SyncOutcome {
        let mut outcome = SyncOutcome::pending(&summary.policy);
        match self.try_sync(summary, &mut outcome).await {
            Ok(()) => info!(
                policy_id = %summary.policy.id,
                added = outcome.added_count,
                applied = outcome.labels_applied,
                removed = outcome.labels_removed,
                "policy reconciled"
            ),
            Err(e) => {
                warn!(
                    policy_id = %summary.policy.id,
                    phase = %outcome.phase,
                    error = %e,
                    "policy failed"
                );
                outcome.fail(e);
            }
        }
        outcome
    }

    /// Capture version 1 of one policy, converting any error into a
    /// `Failed` outcome
    pub async fn capture_policy(&self, summary: &PolicySummary) -> SyncOutcome {
        let mut outcome = SyncOutcome::pending(&summary.policy);
        if let Err(e) = self.try_capture(&summary.policy, &mut outcome).await {
            warn!(policy_id = %summary.policy.id, error = %e, "baseline capture failed");
            outcome.fail(e);
        }
        outcome
    }

    async fn run(&self, kind: RunKind, policies: Vec<PolicySummary>) -> SyncReport {
        let started_at = Utc::now();
        let workers = self.options.concurrency.max(1).min(policies.len());
        info!(
            %kind,
            policies = policies.len(),
            workers,
            dry_run = self.options.dry_run,
            "starting run"
        );

        let queue: PolicyQueue = Arc::new(Mutex::new(policies.iter().cloned().collect()));
        let mut set = JoinSet::new();
        for worker in 0..workers {
            let engine = self.clone();
            let queue = Arc::clone(&queue);
            set.spawn(engine.work(worker, kind, queue));
        }

        let mut outcomes = Vec::with_capacity(policies.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(batch) => outcomes.extend(batch),
                Err(e) => warn!(error = %e, "sync worker terminated"),
            }
        }

        let queued: HashSet<String> = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|summary| summary.policy.id.clone())
            .collect();
        let reported: HashSet<String> = outcomes.iter().map(|o| o.policy_id.clone()).collect();

        for summary in &policies {
            if reported.contains(&summary.policy.id) {
                continue;
            }
            if queued.contains(&summary.policy.id) {
                outcomes.push(SyncOutcome::abandoned(&summary.policy));
            } else {
                let mut outcome = SyncOutcome::pending(&summary.policy);
                outcome.fail("worker terminated before reporting");
                outcomes.push(outcome);
            }
        }

        SyncReport::finish(
            kind,
            started_at,
            self.options.mode,
            self.options.dry_run,
            outcomes,
        )
    }

    async fn work(self, worker: usize, kind: RunKind, queue: PolicyQueue) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        loop {
            if self.is_aborted() {
                debug!(worker, "abort requested; worker stopping");
                break;
            }
            let Some(summary) = next_policy(&queue) else {
                break;
            };
            debug!(worker, policy_id = %summary.policy.id, "picked up policy");
            let outcome = match kind {
                RunKind::Capture => self.capture_policy(&summary).await,
                RunKind::Sync => self.sync_policy(&summary).await,
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn try_capture(&self, policy: &Policy, outcome: &mut SyncOutcome) -> Result<()> {
        let baseline = self.fetch_baseline(policy, outcome).await?;
        outcome.added_count = self.record(policy, &baseline).await?;
        outcome.baseline_captured = true;
        outcome.phase = PolicyPhase::Captured;
        outcome.actions.push(self.describe(
            &format!("record {} baseline key(s)", outcome.added_count),
            &format!("Recorded {} baseline key(s)", outcome.added_count),
        ));
        info!(policy_id = %policy.id, recorded = outcome.added_count, "baseline captured");
        Ok(())
    }

    async fn try_sync(&self, summary: &PolicySummary, outcome: &mut SyncOutcome) -> Result<()> {
        let policy = &summary.policy;
        let mut new_rules: Vec<RuleRecord> = Vec::new();

        if !self.with_registry(|registry| registry.has_policy(&policy.id))? {
            info!(policy_id = %policy.id, "no registry entries; capturing baseline");
            new_rules = self.fetch_baseline(policy, outcome).await?;
            outcome.baseline_captured = true;
        }

        if summary.has_newer_versions() {
            // Diff the version enumeration reported, even if a newer one appeared since
            let version = RuleVersion::Exact(summary.latest_version);
            let current = self.fetch_keyed(policy, version, outcome).await?;
            let mut known = self.with_registry(|registry| registry.policy_keys(&policy.id))?;
            known.extend(new_rules.iter().map(|rule| rule.derived_key.clone()));

            let DiffOutcome {
                additions,
                collisions,
            } = diff(&known, current);
            outcome.warnings.extend(collisions);
            debug!(policy_id = %policy.id, additions = additions.len(), "diffed latest version");
            new_rules.extend(additions);
        }

        outcome.added_count = self.record(policy, &new_rules).await?;
        if outcome.added_count > 0 {
            outcome.actions.push(self.describe(
                &format!("record {} new key(s)", outcome.added_count),
                &format!("Recorded {} new key(s)", outcome.added_count),
            ));
        }
        outcome.phase = PolicyPhase::Diffed;

        let target = self.with_registry(|registry| {
            build_label_set(registry.policy_entries(&policy.id), &new_rules)
        })?;
        outcome.phase = PolicyPhase::LabelsBuilt;
        debug!(policy_id = %policy.id, labels = target.len(), "built target label set");

        let server = self.platform.fetch_labels(policy).await?;
        let plan = reconcile(&target, &server, self.options.mode);
        self.apply(policy, plan, outcome).await?;
        outcome.phase = PolicyPhase::Reconciled;
        Ok(())
    }

    /// Apply a label plan: removals are awaited before additions start
    async fn apply(
        &self,
        policy: &Policy,
        plan: LabelPlan,
        outcome: &mut SyncOutcome,
    ) -> Result<()> {
        let removal_keys = plan.removal_keys();
        let LabelPlan {
            to_add,
            skipped,
            mismatches,
            ..
        } = plan;

        outcome.labels_skipped += skipped.len();
        outcome.warnings.extend(mismatches);

        if !removal_keys.is_empty() {
            outcome.labels_removed = if self.options.dry_run {
                removal_keys.len()
            } else {
                let written = self.platform.remove_labels(policy, &removal_keys).await?;
                written.applied.len()
            };
            outcome.actions.push(self.describe(
                &format!("remove {} label(s)", outcome.labels_removed),
                &format!("Removed {} label(s)", outcome.labels_removed),
            ));
        }

        if !to_add.is_empty() {
            if self.options.dry_run {
                outcome.labels_applied = to_add.len();
            } else {
                let written = self.platform.add_labels(policy, &to_add).await?;
                outcome.labels_applied = written.applied.len();
                for key in written.unmatched {
                    warn!(
                        policy_id = %policy.id,
                        key = %key,
                        "no rule in latest version carries this key"
                    );
                    outcome.labels_skipped += 1;
                    outcome.warnings.push(SyncWarning::UnmatchedLabel { key });
                }
            }
            outcome.actions.push(self.describe(
                &format!("add {} label(s)", outcome.labels_applied),
                &format!("Added {} label(s)", outcome.labels_applied),
            ));
        }

        Ok(())
    }

    async fn fetch_baseline(
        &self,
        policy: &Policy,
        outcome: &mut SyncOutcome,
    ) -> Result<Vec<RuleRecord>> {
        let records = self.fetch_keyed(policy, RuleVersion::Baseline, outcome).await?;
        let (unique, collisions) = dedupe_rules(records);
        outcome.warnings.extend(collisions);
        Ok(unique)
    }

    async fn fetch_keyed(
        &self,
        policy: &Policy,
        version: RuleVersion,
        outcome: &mut SyncOutcome,
    ) -> Result<Vec<RuleRecord>> {
        let definitions = self.platform.fetch_rules(policy, version).await?;
        debug!(policy_id = %policy.id, %version, rules = definitions.len(), "fetched rules");
        let (records, warnings) = key_rules(policy, definitions);
        outcome.warnings.extend(warnings);
        Ok(records)
    }

    /// Record rules in the registry and persist it; returns the number of
    /// new entries. In a dry run nothing is written and the count is of
    /// entries that would be new.
    ///
    /// The file is written on the blocking pool with the registry mutex
    /// released, so other workers are not held up by disk I/O.
    async fn record(&self, policy: &Policy, rules: &[RuleRecord]) -> Result<usize> {
        if self.options.dry_run {
            return self.with_registry(|registry| {
                rules
                    .iter()
                    .filter(|rule| registry.get(&policy.id, &rule.derived_key).is_none())
                    .count()
            });
        }

        let (added, path, snapshot) = self.with_registry(|registry| {
            let added = rules
                .iter()
                .filter(|rule| registry.record_rule(policy, rule))
                .count();
            (added, registry.path().to_path_buf(), registry.entries().to_vec())
        })?;
        if added == 0 {
            return Ok(0);
        }

        let persisted = tokio::task::spawn_blocking(move || RuleRegistry::persist(&path, &snapshot))
            .await
            .map_err(|e| Error::Registry {
                message: format!("registry save task failed: {e}"),
            })??;
        self.with_registry(|registry| registry.absorb_persisted(persisted))?;
        Ok(added)
    }

    fn with_registry<T>(&self, f: impl FnOnce(&mut RuleRegistry) -> T) -> Result<T> {
        let mut registry = self.registry.lock().map_err(|_| Error::Registry {
            message: "registry lock poisoned".to_string(),
        })?;
        Ok(f(&mut registry))
    }

    fn describe(&self, would: &str, done: &str) -> String {
        if self.options.dry_run {
            format!("[dry-run] Would {}", would)
        } else {
            done.to_string()
        }
    }
}

fn next_policy(queue: &Mutex<VecDeque<PolicySummary>>) -> Option<PolicySummary> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}
