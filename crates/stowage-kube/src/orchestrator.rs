//! Hook orchestration
//!
//! Each entry point runs one whole flow for one hook invocation:
//!
//! 1. decide from release values whether there is anything to do
//! 2. build the custom resource and submit it
//! 3. wait for the controller to finish it
//! 4. update the release (or clean up the resource)
//!
//! The only state kept across invocations is the set of releases whose
//! first-revision backup was already triggered by this process.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use serde_json::json;
use stowage_core::operation::{BACKUP_ENABLED, RESTORE_ENABLED, SNAPSHOT_ENABLED};
use stowage_core::{
    BackupRequest, OperationKind, OperationResource, OperationSettings, Release, RestoreRequest,
    Values, build_backup, build_restore_for, build_snapshot, ensure_exclusive,
};
use tokio_util::sync::CancellationToken;

use crate::error::{KubeError, Result};
use crate::hooks::HookPhase;
use crate::mutator::ReleaseMutator;
use crate::poller::{StatusPoller, WaitSchedule, schedule};
use crate::reconciler::Reconciler;
use crate::store::{ObjectStore, ResourceKey};

/// Why an entry point did nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BackupDisabled,
    /// Backups are only taken on the first deploy
    NotFirstRevision { revision: u32 },
    /// This process already triggered the release's backup
    AlreadyTriggered,
    RestoreDisabled,
    SnapshotDisabled,
    /// The entry point does not act on this phase
    PhaseNotHandled { phase: HookPhase },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BackupDisabled => write!(f, "backup.enabled is not set"),
            SkipReason::NotFirstRevision { revision } => {
                write!(f, "revision {} is not the first revision", revision)
            }
            SkipReason::AlreadyTriggered => write!(f, "backup already triggered by this process"),
            SkipReason::RestoreDisabled => write!(f, "restore.enabled is not set"),
            SkipReason::SnapshotDisabled => write!(f, "snapshot.enabled is not set"),
            SkipReason::PhaseNotHandled { phase } => write!(f, "nothing to do on {}", phase),
        }
    }
}

/// Result of one entry point
#[derive(Debug, Clone)]
pub enum HookOutcome {
    Skipped(SkipReason),
    Completed {
        /// The resource as last observed (or as submitted, when not awaited)
        resource: OperationResource,
        /// The release after mutations, if any were applied
        release: Option<Release>,
    },
}

impl HookOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, HookOutcome::Skipped(_))
    }

    pub fn resource(&self) -> Option<&OperationResource> {
        match self {
            HookOutcome::Completed { resource, .. } => Some(resource),
            HookOutcome::Skipped(_) => None,
        }
    }
}

/// One step a hook would take, as reported by [`plan`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStep {
    /// Upgrade the release with this patch before submitting
    Patch(Values),
    Submit(OperationResource),
    /// Poll until a terminal phase, at most this long
    Wait(WaitSchedule),
    /// Upgrade the release with this patch after success
    Reconcile(Values),
    /// Remove the resource once it is terminal
    Delete(ResourceKey),
}

/// Drives backups, restores and snapshots for deployment hooks
pub struct Orchestrator<O: ObjectStore, M: ReleaseMutator> {
    store: O,
    mutator: M,
    settings: OperationSettings,
    triggered: Mutex<HashSet<String>>,
}

impl<O: ObjectStore, M: ReleaseMutator> Orchestrator<O, M> {
    pub fn new(store: O, mutator: M, settings: OperationSettings) -> Self {
        Self {
            store,
            mutator,
            settings,
            triggered: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    pub fn mutator(&self) -> &M {
        &self.mutator
    }

    pub fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    /// Has this process already triggered the release's backup?
    pub fn has_triggered(&self, release: &Release) -> bool {
        self.triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&release.qualified_name())
    }

    /// Claim the guard; false when another invocation holds it
    fn claim(&self, release: &Release) -> bool {
        self.triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(release.qualified_name())
    }

    fn release_claim(&self, release: &Release) {
        self.triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&release.qualified_name());
    }

    /// Dispatch a hook phase to the entry points that handle it
    pub async fn run(
        &self,
        phase: HookPhase,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<Vec<HookOutcome>> {
        tracing::info!(
            phase = %phase,
            release = %release.name,
            namespace = %release.namespace,
            revision = release.revision,
            "running hook"
        );

        let outcomes = if phase.is_post() {
            vec![
                self.on_post_deploy_backup(release, cancel).await?,
                self.on_post_deploy_restore(release, cancel).await?,
            ]
        } else {
            vec![self.on_pre_operation(phase, release, cancel).await?]
        };
        Ok(outcomes)
    }

    /// Take the first-revision backup of a release
    pub async fn on_post_deploy_backup(
        &self,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<HookOutcome> {
        self.backup(release, cancel)
            .await
            .inspect_err(|e| log_failure(release, OperationKind::Backup, e))
    }

    async fn backup(&self, release: &Release, cancel: &CancellationToken) -> Result<HookOutcome> {
        let values = &release.values;
        ensure_exclusive(values)?;

        if !values.flag(BACKUP_ENABLED)? {
            return Ok(skip(release, SkipReason::BackupDisabled));
        }
        if !release.is_first_revision() {
            return Ok(skip(
                release,
                SkipReason::NotFirstRevision {
                    revision: release.revision,
                },
            ));
        }

        let request = BackupRequest::from_values(values)?;
        if !self.claim(release) {
            return Ok(skip(release, SkipReason::AlreadyTriggered));
        }

        let resource = build_backup(release, &request, &self.settings);
        if let Err(e) = self.submit(&resource).await {
            self.release_claim(release);
            return Err(e);
        }

        let observed = self.wait(&resource, cancel).await?;
        let updated = Reconciler::new(&self.store, &self.mutator, &self.settings)
            .after_backup(release)
            .await?;

        Ok(HookOutcome::Completed {
            resource: observed,
            release: Some(updated),
        })
    }

    /// Restore the release from `restore.backupName`
    pub async fn on_post_deploy_restore(
        &self,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<HookOutcome> {
        self.restore(release, cancel)
            .await
            .inspect_err(|e| log_failure(release, OperationKind::Restore, e))
    }

    async fn restore(&self, release: &Release, cancel: &CancellationToken) -> Result<HookOutcome> {
        let values = &release.values;
        ensure_exclusive(values)?;

        if !values.flag(RESTORE_ENABLED)? {
            return Ok(skip(release, SkipReason::RestoreDisabled));
        }

        let request = RestoreRequest::from_values(values)?;
        let resource = build_restore_for(&request, &self.settings);

        let reconciler = Reconciler::new(&self.store, &self.mutator, &self.settings);
        let quiesced = reconciler.quiesce(release).await?;
        let current = quiesced.as_ref().unwrap_or(release);

        self.submit(&resource).await?;
        let observed = match self.wait(&resource, cancel).await {
            Ok(observed) => observed,
            Err(e @ KubeError::OperationFailed { .. }) => {
                reconciler.discard_failed_restore(&resource).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let cleared = reconciler.after_restore(current, &observed).await?;

        Ok(HookOutcome::Completed {
            resource: observed,
            release: cleared.or(quiesced),
        })
    }

    /// Snapshot the release before it is upgraded or deleted
    pub async fn on_pre_operation(
        &self,
        phase: HookPhase,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<HookOutcome> {
        self.snapshot(phase, release, cancel)
            .await
            .inspect_err(|e| log_failure(release, OperationKind::Backup, e))
    }

    async fn snapshot(
        &self,
        phase: HookPhase,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<HookOutcome> {
        if !phase.is_pre() {
            return Ok(skip(release, SkipReason::PhaseNotHandled { phase }));
        }
        ensure_exclusive(&release.values)?;
        if !release.values.flag(SNAPSHOT_ENABLED)? {
            return Ok(skip(release, SkipReason::SnapshotDisabled));
        }

        let resource = build_snapshot(release, phase.as_str(), &self.settings);
        let submitted = self.submit(&resource).await?;

        let resource = if self.settings.snapshot.wait_for_completion {
            self.wait(&resource, cancel).await?
        } else {
            submitted
        };

        Ok(HookOutcome::Completed {
            resource,
            release: None,
        })
    }

    async fn submit(&self, resource: &OperationResource) -> Result<OperationResource> {
        match self.store.create(resource).await {
            Ok(created) => {
                tracing::info!(
                    kind = %resource.kind,
                    resource = %resource.metadata.name,
                    namespace = %resource.metadata.namespace,
                    "submitted"
                );
                Ok(created)
            }
            Err(e) => {
                tracing::error!(
                    kind = %resource.kind,
                    resource = %resource.metadata.name,
                    namespace = %resource.metadata.namespace,
                    error = %e,
                    "submission rejected"
                );
                Err(KubeError::Submission {
                    resource: resource.display_name(),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn wait(
        &self,
        resource: &OperationResource,
        cancel: &CancellationToken,
    ) -> Result<OperationResource> {
        StatusPoller::new(&self.store, &self.settings.poll)
            .wait_for_completion(&ResourceKey::of(resource), cancel)
            .await
    }
}

fn skip(release: &Release, reason: SkipReason) -> HookOutcome {
    tracing::debug!(
        release = %release.name,
        namespace = %release.namespace,
        reason = %reason,
        "skipped"
    );
    HookOutcome::Skipped(reason)
}

fn log_failure(release: &Release, kind: OperationKind, error: &KubeError) {
    tracing::error!(
        release = %release.name,
        namespace = %release.namespace,
        kind = %kind,
        category = %error.category(),
        error = %error,
        "hook failed"
    );
}

/// What a hook would do for a release, without touching the cluster
///
/// Assumes a fresh process, so the backup guard is never held.
pub fn plan(
    phase: HookPhase,
    release: &Release,
    settings: &OperationSettings,
) -> Result<Vec<PlannedStep>> {
    let values = &release.values;
    let mut steps = Vec::new();
    ensure_exclusive(values)?;

    if phase.is_pre() {
        if values.flag(SNAPSHOT_ENABLED)? {
            steps.push(PlannedStep::Submit(build_snapshot(
                release,
                phase.as_str(),
                settings,
            )));
            if settings.snapshot.wait_for_completion {
                steps.push(PlannedStep::Wait(schedule(&settings.poll)));
            }
        }
        return Ok(steps);
    }

    if values.flag(BACKUP_ENABLED)? && release.is_first_revision() {
        let request = BackupRequest::from_values(values)?;
        steps.push(PlannedStep::Submit(build_backup(release, &request, settings)));
        steps.push(PlannedStep::Wait(schedule(&settings.poll)));
        steps.push(PlannedStep::Reconcile(Values::from_path(
            &settings.backup.clear_flag,
            json!(false),
        )?));
    }

    if values.flag(RESTORE_ENABLED)? {
        let request = RestoreRequest::from_values(values)?;
        let resource = build_restore_for(&request, settings);

        let mut quiesce = Values::new();
        for path in &settings.restore.disable_before_restore {
            if values.flag(path)? {
                quiesce.set(path, json!(false))?;
            }
        }
        if !quiesce.is_empty() {
            steps.push(PlannedStep::Patch(quiesce));
        }

        steps.push(PlannedStep::Submit(resource.clone()));
        steps.push(PlannedStep::Wait(schedule(&settings.poll)));
        steps.push(PlannedStep::Delete(ResourceKey::of(&resource)));
        if settings.restore.clear_flag_on_success {
            steps.push(PlannedStep::Reconcile(Values::from_path(
                RESTORE_ENABLED,
                json!(false),
            )?));
        }
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCategory;
    use crate::mutator::MockReleaseMutator;
    use crate::store::MockObjectStore;
    use stowage_core::{ChartRef, Phase};

    fn release(revision: u32, values: serde_json::Value) -> Release {
        let mut release = Release::new(
            "myapp",
            "default",
            ChartRef::new("matrix", semver::Version::new(1, 0, 0)),
            Values(values),
        );
        release.revision = revision;
        release
    }

    fn orchestrator(rel: &Release) -> Orchestrator<MockObjectStore, MockReleaseMutator> {
        Orchestrator::new(
            MockObjectStore::new(),
            MockReleaseMutator::with_release(rel.clone()),
            OperationSettings::default(),
        )
    }

    fn backup_key() -> ResourceKey {
        ResourceKey::new(OperationKind::Backup, "default", "matrix-backup-myapp-1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_skips() {
        let cancel = CancellationToken::new();
        let cases = [
            (1, json!({}), SkipReason::BackupDisabled),
            (1, json!({ "backup": { "enabled": false } }), SkipReason::BackupDisabled),
            (
                2,
                json!({ "backup": { "enabled": true } }),
                SkipReason::NotFirstRevision { revision: 2 },
            ),
        ];

        for (revision, values, expected) in cases {
            let rel = release(revision, values);
            let orch = orchestrator(&rel);
            let outcome = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap();

            assert!(matches!(outcome, HookOutcome::Skipped(ref r) if *r == expected));
            assert_eq!(orch.store().counts().creates, 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_type_flag_is_configuration_error() {
        let rel = release(1, json!({ "backup": { "enabled": "yes" } }));
        let orch = orchestrator(&rel);

        let err = orch
            .on_post_deploy_backup(&rel, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.category(), FailureCategory::Configuration);
        assert_eq!(orch.store().counts().creates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_prevents_second_backup() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let orch = orchestrator(&rel);
        orch.store().script_phases(&backup_key(), [Phase::Completed]);
        let cancel = CancellationToken::new();

        let first = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap();
        assert!(!first.is_skipped());
        assert!(orch.has_triggered(&rel));

        let second = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap();
        assert!(matches!(second, HookOutcome::Skipped(SkipReason::AlreadyTriggered)));
        assert_eq!(orch.store().counts().creates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_create_leaves_guard_unset() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let orch = orchestrator(&rel);
        orch.store().reject_creates("quota exceeded");
        let cancel = CancellationToken::new();

        let err = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::Submission);
        assert!(!orch.has_triggered(&rel));

        orch.store().accept_creates();
        orch.store().script_phases(&backup_key(), [Phase::Completed]);
        let outcome = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap();
        assert!(!outcome.is_skipped());
        assert_eq!(orch.store().created().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_on_first_observation_still_reconciles() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let orch = orchestrator(&rel);
        orch.store().script_phases(&backup_key(), [Phase::Completed]);

        let outcome = orch
            .on_post_deploy_backup(&rel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(orch.store().counts().gets, 1);
        assert_eq!(orch.mutator().calls().len(), 1);
        match outcome {
            HookOutcome::Completed { release: Some(updated), .. } => {
                assert_eq!(updated.values.0, json!({ "backup": { "enabled": false } }));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_backup_does_not_reconcile() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let orch = orchestrator(&rel);
        orch.store()
            .script_phases(&backup_key(), [Phase::InProgress, Phase::PartiallyFailed]);

        let err = orch
            .on_post_deploy_backup(&rel, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.category(), FailureCategory::Operation);
        assert!(orch.mutator().calls().is_empty());
        assert!(orch.has_triggered(&rel));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_without_source_builds_nothing() {
        let rel = release(3, json!({ "restore": { "enabled": true } }));
        let orch = orchestrator(&rel);

        let err = orch
            .on_post_deploy_restore(&rel, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.category(), FailureCategory::Configuration);
        assert_eq!(orch.store().counts().creates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_flags() {
        let rel = release(
            1,
            json!({ "backup": { "enabled": true }, "restore": { "enabled": true, "backupName": "b1" } }),
        );
        let orch = orchestrator(&rel);
        let cancel = CancellationToken::new();

        let err = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::Configuration);
        let err = orch.on_post_deploy_restore(&rel, &cancel).await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::Configuration);
        assert_eq!(orch.store().counts().creates, 0);
        assert!(!orch.has_triggered(&rel));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restore_can_be_retried() {
        let rel = release(3, json!({ "restore": { "enabled": true, "backupName": "b1" } }));
        let orch = orchestrator(&rel);
        let key = ResourceKey::new(OperationKind::Restore, "default", "matrix-restore");
        orch.store().script_phases(&key, [Phase::InProgress, Phase::Failed]);
        let cancel = CancellationToken::new();

        let err = orch.on_post_deploy_restore(&rel, &cancel).await.unwrap_err();
        assert!(matches!(err, KubeError::OperationFailed { phase: Phase::Failed, .. }));
        assert!(!orch.store().contains(&key));
        assert!(orch.mutator().calls().is_empty());

        orch.store().script_phases(&key, [Phase::Completed]);
        let outcome = orch.on_post_deploy_restore(&rel, &cancel).await.unwrap();
        assert!(!outcome.is_skipped());
        assert_eq!(orch.store().created().len(), 2);
        assert!(!orch.store().contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_restore_is_kept() {
        let rel = release(3, json!({ "restore": { "enabled": true, "backupName": "b1" } }));
        let mut settings = OperationSettings::default();
        settings.poll.max_wait = std::time::Duration::from_secs(30);
        let orch = Orchestrator::new(
            MockObjectStore::new(),
            MockReleaseMutator::with_release(rel.clone()),
            settings,
        );
        let key = ResourceKey::new(OperationKind::Restore, "default", "matrix-restore");
        orch.store().script_phases(&key, [Phase::InProgress]);

        let err = orch
            .on_post_deploy_restore(&rel, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::Timeout);
        assert!(orch.store().contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_refuses_conflicting_flags() {
        let rel = release(
            4,
            json!({
                "backup": { "enabled": true },
                "restore": { "enabled": true, "backupName": "b1" },
                "snapshot": { "enabled": true }
            }),
        );
        let orch = orchestrator(&rel);

        for phase in [HookPhase::PreDelete, HookPhase::PreUpgrade] {
            let err = orch
                .on_pre_operation(phase, &rel, &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.category(), FailureCategory::Configuration);
        }
        assert_eq!(orch.store().counts().creates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_before_delete() {
        let rel = release(4, json!({ "snapshot": { "enabled": true } }));
        let orch = orchestrator(&rel);
        let key = ResourceKey::new(
            OperationKind::Backup,
            "default",
            "matrix-backup-myapp-pre-delete-4",
        );
        orch.store().script_phases(&key, [Phase::InProgress, Phase::Completed]);

        let outcome = orch
            .on_pre_operation(HookPhase::PreDelete, &rel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.resource().unwrap().phase(), Some(Phase::Completed));
        assert!(orch.mutator().calls().is_empty());
        assert!(!orch.has_triggered(&rel));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_without_wait() {
        let rel = release(2, json!({ "snapshot": { "enabled": true } }));
        let mut settings = OperationSettings::default();
        settings.snapshot.wait_for_completion = false;
        let orch = Orchestrator::new(
            MockObjectStore::new(),
            MockReleaseMutator::with_release(rel.clone()),
            settings,
        );

        let outcome = orch
            .on_pre_operation(HookPhase::PreUpgrade, &rel, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        assert_eq!(orch.store().counts().gets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_ignores_post_phases() {
        let rel = release(1, json!({ "snapshot": { "enabled": true } }));
        let orch = orchestrator(&rel);

        let outcome = orch
            .on_pre_operation(HookPhase::PostInstall, &rel, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            HookOutcome::Skipped(SkipReason::PhaseNotHandled { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_dispatches_post_phase() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let orch = orchestrator(&rel);
        orch.store().script_phases(&backup_key(), [Phase::Completed]);

        let outcomes = orch
            .run(HookPhase::PostInstall, &rel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_skipped());
        assert!(matches!(outcomes[1], HookOutcome::Skipped(SkipReason::RestoreDisabled)));
    }

    #[test]
    fn test_plan_backup() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let steps = plan(HookPhase::PostInstall, &rel, &OperationSettings::default()).unwrap();

        assert_eq!(steps.len(), 3);
        assert!(matches!(&steps[0], PlannedStep::Submit(r) if r.metadata.name == "matrix-backup-myapp-1"));
        assert!(matches!(&steps[1], PlannedStep::Wait(w) if w.polls == 124));
        assert_eq!(
            steps[2],
            PlannedStep::Reconcile(Values(json!({ "backup": { "enabled": false } })))
        );
    }

    #[test]
    fn test_plan_restore_with_quiesce() {
        let rel = release(
            5,
            json!({
                "restore": { "enabled": true, "backupName": "matrix-backup-myapp-1" },
                "postgresql": { "enabled": true }
            }),
        );
        let steps = plan(HookPhase::PostUpgrade, &rel, &OperationSettings::default()).unwrap();

        assert_eq!(
            steps[0],
            PlannedStep::Patch(Values(json!({ "postgresql": { "enabled": false } })))
        );
        assert!(matches!(&steps[1], PlannedStep::Submit(r) if r.kind == OperationKind::Restore));
        assert_eq!(
            steps.last(),
            Some(&PlannedStep::Delete(ResourceKey::new(
                OperationKind::Restore,
                "default",
                "matrix-restore"
            )))
        );
    }

    #[test]
    fn test_plan_snapshot_refuses_conflicting_flags() {
        let rel = release(
            4,
            json!({
                "backup": { "enabled": true },
                "restore": { "enabled": true, "backupName": "b1" },
                "snapshot": { "enabled": true }
            }),
        );
        let err = plan(HookPhase::PreDelete, &rel, &OperationSettings::default()).unwrap_err();
        assert_eq!(err.category(), FailureCategory::Configuration);
    }

    #[test]
    fn test_plan_uses_configured_clear_flag() {
        let rel = release(1, json!({ "backup": { "enabled": true } }));
        let mut settings = OperationSettings::default();
        settings.backup.clear_flag = "ops.firstBackup".to_string();

        let steps = plan(HookPhase::PostInstall, &rel, &settings).unwrap();
        assert_eq!(
            steps[2],
            PlannedStep::Reconcile(Values(json!({ "ops": { "firstBackup": false } })))
        );
    }

    #[test]
    fn test_plan_nothing() {
        let rel = release(2, json!({ "backup": { "enabled": true } }));
        assert!(plan(HookPhase::PostUpgrade, &rel, &OperationSettings::default())
            .unwrap()
            .is_empty());
    }
}
