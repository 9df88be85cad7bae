//! Completion watcher for submitted operations
//!
//! Polls a Backup or Restore until the controller reports a terminal phase.
//! Sleeps grow exponentially from `initialInterval` up to `maxInterval`, and
//! are clamped so the last fetch happens right at the deadline.

use std::time::Duration;
use stowage_core::resource::go_duration;
use stowage_core::{OperationResource, Phase, PollSettings};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{KubeError, Result};
use crate::store::{ObjectStore, ResourceKey};

/// Waits for operation resources to finish
pub struct StatusPoller<'a, O: ObjectStore + ?Sized> {
    store: &'a O,
    settings: &'a PollSettings,
}

impl<'a, O: ObjectStore + ?Sized> StatusPoller<'a, O> {
    pub fn new(store: &'a O, settings: &'a PollSettings) -> Self {
        Self { store, settings }
    }

    /// Block until `key` reaches a terminal phase
    ///
    /// Returns the resource as last observed on `Completed`. Failure phases
    /// end the wait immediately with [`KubeError::OperationFailed`].
    pub async fn wait_for_completion(
        &self,
        key: &ResourceKey,
        cancel: &CancellationToken,
    ) -> Result<OperationResource> {
        let started = Instant::now();
        let deadline = started + self.settings.max_wait;
        let mut delay = self.settings.initial_interval;
        let mut read_errors: u32 = 0;
        let mut last_phase = None;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(key));
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(key)),
                result = self.store.get(key) => result,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(self.timed_out(key, started, last_phase));
                }
            };

            match fetched {
                Ok(resource) => {
                    read_errors = 0;
                    let phase = resource.phase();

                    if phase != last_phase {
                        tracing::debug!(
                            kind = %key.kind,
                            resource = %key.name,
                            namespace = %key.namespace,
                            phase = ?phase,
                            "phase changed"
                        );
                        last_phase = phase;
                    }

                    match phase {
                        Some(p) if p.is_success() => {
                            tracing::info!(
                                kind = %key.kind,
                                resource = %key.name,
                                namespace = %key.namespace,
                                elapsed = %go_duration(started.elapsed()),
                                "operation completed"
                            );
                            return Ok(resource);
                        }
                        Some(p) if p.is_failure() => {
                            let diagnostics = resource
                                .status
                                .as_ref()
                                .map(|s| s.diagnostics())
                                .unwrap_or_default();
                            return Err(KubeError::OperationFailed {
                                resource: key.to_string(),
                                phase: p,
                                diagnostics,
                            });
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    read_errors += 1;
                    tracing::warn!(
                        kind = %key.kind,
                        resource = %key.name,
                        namespace = %key.namespace,
                        attempt = read_errors,
                        error = %e,
                        "failed to read operation status"
                    );

                    if read_errors > self.settings.max_read_errors {
                        return Err(KubeError::Timeout {
                            resource: key.to_string(),
                            waited: go_duration(started.elapsed()),
                            cause: format!("{} consecutive read errors, last: {}", read_errors, e),
                        });
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(key, started, last_phase));
            }

            let sleep_for = delay.min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(key)),
                _ = tokio::time::sleep(sleep_for) => {}
            }
            delay = self.settings.next_interval(delay);
        }
    }

    fn timed_out(
        &self,
        key: &ResourceKey,
        started: Instant,
        last_phase: Option<Phase>,
    ) -> KubeError {
        let cause = match last_phase {
            Some(phase) => format!("last observed phase {}", phase),
            None => "controller never reported a phase".to_string(),
        };
        KubeError::Timeout {
            resource: key.to_string(),
            waited: go_duration(started.elapsed()),
            cause,
        }
    }

    fn cancelled(&self, key: &ResourceKey) -> KubeError {
        tracing::info!(kind = %key.kind, resource = %key.name, "wait cancelled");
        KubeError::Cancelled {
            resource: key.to_string(),
        }
    }
}

/// Shape of a wait that runs to `max_wait` without a terminal phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSchedule {
    /// Fetches, the first one included
    pub polls: u64,
    /// Time slept in total
    pub total: Duration,
}

/// Work out how a full wait would go, without fetching
///
/// Used by `plan`. Once the delay stops growing the remaining polls are
/// counted in one step, so tiny intervals over long waits stay cheap.
pub fn schedule(settings: &PollSettings) -> WaitSchedule {
    let mut polls: u64 = 1;
    let mut total = Duration::ZERO;
    let mut delay = settings.initial_interval;

    while total < settings.max_wait && !delay.is_zero() {
        let remaining = settings.max_wait - total;
        let next = settings.next_interval(delay);

        if next <= delay {
            let steps = remaining.as_nanos().div_ceil(delay.as_nanos());
            polls = polls.saturating_add(u64::try_from(steps).unwrap_or(u64::MAX));
            total = settings.max_wait;
            break;
        }

        total += delay.min(remaining);
        polls += 1;
        delay = next;
    }

    WaitSchedule { polls, total }
}
