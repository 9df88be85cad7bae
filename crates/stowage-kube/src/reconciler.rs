//! Release updates around a finished operation
//!
//! After a backup completes, the release's `backup.enabled` flag is cleared so
//! later revisions do not ask for another one. Once a restore is terminal, the
//! Restore resource is removed so the next restore can reuse its name.

use serde_json::json;
use stowage_core::operation::RESTORE_ENABLED;
use stowage_core::{OperationKind, OperationResource, OperationSettings, Release, Values};

use crate::error::{KubeError, Result};
use crate::mutator::ReleaseMutator;
use crate::store::{ObjectStore, ResourceKey};

/// Applies release mutations that follow a successful operation
pub struct Reconciler<'a, O: ObjectStore + ?Sized, M: ReleaseMutator + ?Sized> {
    store: &'a O,
    mutator: &'a M,
    settings: &'a OperationSettings,
}

impl<'a, O, M> Reconciler<'a, O, M>
where
    O: ObjectStore + ?Sized,
    M: ReleaseMutator + ?Sized,
{
    pub fn new(store: &'a O, mutator: &'a M, settings: &'a OperationSettings) -> Self {
        Self {
            store,
            mutator,
            settings,
        }
    }

    /// Clear the backup flag (`backup.clearFlag`) on the release
    pub async fn after_backup(&self, release: &Release) -> Result<Release> {
        self.patch(release, &self.settings.backup.clear_flag, "backup").await
    }

    /// Delete the finished Restore resource
    ///
    /// A resource that is already gone is fine. Returns the updated release
    /// when `restore.clearFlagOnSuccess` is set.
    pub async fn after_restore(
        &self,
        release: &Release,
        resource: &OperationResource,
    ) -> Result<Option<Release>> {
        self.delete_restore(resource)
            .await
            .map_err(|e| KubeError::Reconcile {
                release: release.qualified_name(),
                step: "restore".to_string(),
                source: Box::new(e),
            })?;

        if self.settings.restore.clear_flag_on_success {
            return self.patch(release, RESTORE_ENABLED, "restore").await.map(Some);
        }
        Ok(None)
    }

    /// Remove a Restore the controller failed, so a retry can reuse its name
    ///
    /// The release is left alone. A failed delete is only logged, the
    /// operation failure is what the caller reports.
    pub async fn discard_failed_restore(&self, resource: &OperationResource) {
        if let Err(e) = self.delete_restore(resource).await {
            tracing::warn!(
                resource = %resource.metadata.name,
                namespace = %resource.metadata.namespace,
                error = %e,
                "could not delete failed restore"
            );
        }
    }

    async fn delete_restore(&self, resource: &OperationResource) -> Result<()> {
        let key = ResourceKey::of(resource);
        debug_assert_eq!(key.kind, OperationKind::Restore);

        match self.store.delete(&key).await {
            Ok(()) => {
                tracing::info!(resource = %key.name, namespace = %key.namespace, "deleted finished restore");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(resource = %key.name, namespace = %key.namespace, "restore already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Switch off every configured dependency that is enabled, ahead of a restore
    ///
    /// Returns the release after the last upgrade, or `None` when nothing was
    /// enabled.
    pub async fn quiesce(&self, release: &Release) -> Result<Option<Release>> {
        let mut enabled = Vec::new();
        for path in &self.settings.restore.disable_before_restore {
            if release.values.flag(path)? {
                enabled.push(path.as_str());
            }
        }

        if enabled.is_empty() {
            return Ok(None);
        }

        let mut patch = Values::new();
        for path in &enabled {
            patch.set(path, json!(false))?;
        }

        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            disabled = ?enabled,
            "disabling dependencies before restore"
        );

        let updated = self
            .mutator
            .upgrade(&release.name, &release.namespace, &release.chart, &patch)
            .await
            .map_err(|e| KubeError::Reconcile {
                release: release.qualified_name(),
                step: "restore preparation".to_string(),
                source: Box::new(e),
            })?;
        Ok(Some(updated))
    }

    async fn patch(&self, release: &Release, path: &str, step: &str) -> Result<Release> {
        let patch = Values::from_path(path, json!(false))?;

        let updated = self
            .mutator
            .upgrade(&release.name, &release.namespace, &release.chart, &patch)
            .await
            .map_err(|e| {
                tracing::error!(
                    release = %release.name,
                    namespace = %release.namespace,
                    error = %e,
                    "failed to clear {}", path
                );
                KubeError::Reconcile {
                    release: release.qualified_name(),
                    step: step.to_string(),
                    source: Box::new(e),
                }
            })?;

        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            revision = updated.revision,
            "cleared {}", path
        );
        Ok(updated)
    }
}
