//! End-to-end hook flows against the in-memory object store and real release storage

use serde_json::json;
use stowage_core::{ChartRef, OperationKind, OperationSettings, Phase, Release, ReleaseStatus, Values};
use stowage_kube::{
    FailureCategory, FileDriver, HookOutcome, HookPhase, KubeError, MockObjectStore,
    MockStorageDriver, Orchestrator, ResourceKey, StorageDriver, StorageReleaseMutator,
};
use tokio_util::sync::CancellationToken;

fn release(revision: u32, values: serde_json::Value) -> Release {
    let mut release = Release::new(
        "myapp",
        "default",
        ChartRef::new("matrix", semver::Version::new(1, 4, 2)),
        Values(values),
    );
    release.revision = revision;
    release
}

type TestOrchestrator = Orchestrator<MockObjectStore, StorageReleaseMutator<MockStorageDriver>>;

fn orchestrator(seed: &Release) -> TestOrchestrator {
    let storage = MockStorageDriver::with_releases(vec![seed.clone()]);
    Orchestrator::new(
        MockObjectStore::new(),
        StorageReleaseMutator::new(storage),
        OperationSettings::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn first_install_backup_then_flag_cleared() {
    let rel = release(1, json!({ "backup": { "enabled": true } }));
    let orch = orchestrator(&rel);
    let key = ResourceKey::new(OperationKind::Backup, "default", "matrix-backup-myapp-1");
    orch.store()
        .script_phases(&key, [Phase::New, Phase::InProgress, Phase::Completed]);

    let outcomes = orch
        .run(HookPhase::PostInstall, &rel, &CancellationToken::new())
        .await
        .unwrap();

    let created = orch.store().created();
    assert_eq!(created.len(), 1);
    let backup = &created[0];
    assert_eq!(backup.metadata.name, "matrix-backup-myapp-1");
    assert_eq!(backup.metadata.namespace, "default");
    assert_eq!(
        backup.metadata.labels.get("velero.io/storage-location").map(String::as_str),
        Some("default")
    );
    assert_eq!(
        backup.spec,
        json!({
            "hooks": {},
            "includeNamespaces": ["default"],
            "storageLocation": "matrix-backup",
            "ttl": "720h0m0s"
        })
    );

    let storage = orch.mutator().storage();
    let latest = storage.get_latest("default", "myapp").await.unwrap();
    assert_eq!(latest.revision, 2);
    assert_eq!(latest.values.0, json!({ "backup": { "enabled": false } }));
    assert_eq!(latest.chart, rel.chart);
    let first = storage.get("default", "myapp", 1).await.unwrap();
    assert_eq!(first.status, ReleaseStatus::Superseded);

    match &outcomes[0] {
        HookOutcome::Completed { resource, release } => {
            assert_eq!(resource.phase(), Some(Phase::Completed));
            assert_eq!(release.as_ref().map(|r| r.revision), Some(2));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn upgrade_with_backup_flag_does_nothing() {
    let rel = release(2, json!({ "backup": { "enabled": true } }));
    let orch = orchestrator(&rel);

    let outcomes = orch
        .run(HookPhase::PostUpgrade, &rel, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcomes.iter().all(HookOutcome::is_skipped));
    assert_eq!(orch.store().counts().creates, 0);
    assert_eq!(orch.mutator().storage().release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restore_deletes_resource_after_completion() {
    let rel = release(
        3,
        json!({ "restore": { "enabled": true, "backupName": "matrix-backup-myapp-1" } }),
    );
    let orch = orchestrator(&rel);
    let key = ResourceKey::new(OperationKind::Restore, "default", "matrix-restore");
    orch.store()
        .script_phases(&key, [Phase::InProgress, Phase::Completed]);

    let outcome = orch
        .on_post_deploy_restore(&rel, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.is_skipped());
    let created = orch.store().created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].spec["backupName"], "matrix-backup-myapp-1");
    assert_eq!(created[0].spec["restorePVs"], true);
    assert!(!orch.store().contains(&key));
    assert_eq!(orch.store().counts().deletes, 1);

    // no stateful dependency enabled, so no release update
    assert_eq!(orch.mutator().storage().release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restore_disables_database_first() {
    let rel = release(
        1,
        json!({
            "restore": { "enabled": true, "backupName": "matrix-backup-myapp-1" },
            "postgresql": { "enabled": true }
        }),
    );
    let orch = orchestrator(&rel);
    let key = ResourceKey::new(OperationKind::Restore, "default", "matrix-restore");
    orch.store().script_phases(&key, [Phase::Completed]);

    let outcome = orch
        .on_post_deploy_restore(&rel, &CancellationToken::new())
        .await
        .unwrap();

    let storage = orch.mutator().storage();
    assert_eq!(storage.operation_counts().creates, 1);
    let latest = storage.get_latest("default", "myapp").await.unwrap();
    assert_eq!(latest.revision, 2);
    assert_eq!(latest.values.lookup::<bool>("postgresql.enabled").ok(), Some(false));
    assert_eq!(latest.values.lookup::<bool>("restore.enabled").ok(), Some(true));

    match outcome {
        HookOutcome::Completed { release, .. } => {
            assert_eq!(release.map(|r| r.revision), Some(2));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn restore_preparation_failure_submits_nothing() {
    let rel = release(
        4,
        json!({
            "restore": { "enabled": true, "backupName": "b1" },
            "postgresql": { "enabled": true }
        }),
    );
    // storage does not know the release, so the upgrade fails
    let orch = Orchestrator::new(
        MockObjectStore::new(),
        StorageReleaseMutator::new(MockStorageDriver::new()),
        OperationSettings::default(),
    );

    let err = orch
        .on_post_deploy_restore(&rel, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.category(), FailureCategory::Reconcile);
    assert_eq!(orch.store().counts().creates, 0);
}

#[tokio::test(start_paused = true)]
async fn reconcile_failure_is_not_an_operation_failure() {
    let rel = release(1, json!({ "backup": { "enabled": true } }));
    let orch = Orchestrator::new(
        MockObjectStore::new(),
        StorageReleaseMutator::new(MockStorageDriver::new()),
        OperationSettings::default(),
    );
    let key = ResourceKey::new(OperationKind::Backup, "default", "matrix-backup-myapp-1");
    orch.store().script_phases(&key, [Phase::Completed]);

    let err = orch
        .on_post_deploy_backup(&rel, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, KubeError::Reconcile { .. }));
    assert_eq!(err.category(), FailureCategory::Reconcile);
    assert_eq!(orch.store().counts().creates, 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_keeps_guard() {
    let rel = release(1, json!({ "backup": { "enabled": true } }));
    let orch = orchestrator(&rel);
    let key = ResourceKey::new(OperationKind::Backup, "default", "matrix-backup-myapp-1");
    orch.store().script_phases(&key, [Phase::InProgress]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let err = orch.on_post_deploy_backup(&rel, &cancel).await.unwrap_err();
    assert_eq!(err.category(), FailureCategory::Cancelled);
    assert!(orch.has_triggered(&rel));
    assert_eq!(orch.mutator().storage().release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn file_storage_backed_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = FileDriver::new(tmp.path().to_path_buf()).unwrap();
    let rel = release(1, json!({ "backup": { "enabled": true, "ttl": "24h" } }));
    storage.create(&rel).await.unwrap();

    let orch = Orchestrator::new(
        MockObjectStore::new(),
        StorageReleaseMutator::new(storage),
        OperationSettings::default(),
    );
    let key = ResourceKey::new(OperationKind::Backup, "default", "matrix-backup-myapp-1");
    orch.store().script_phases(&key, [Phase::Completed]);

    orch.run(HookPhase::PostInstall, &rel, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(orch.store().created()[0].spec["ttl"], "24h0m0s");
    assert!(tmp.path().join("default/myapp/v2.json").exists());
    let latest = orch
        .mutator()
        .storage()
        .get_latest("default", "myapp")
        .await
        .unwrap();
    assert_eq!(latest.values.lookup::<bool>("backup.enabled").ok(), Some(false));
    assert_eq!(latest.values.lookup::<String>("backup.ttl").ok().as_deref(), Some("24h"));
}
