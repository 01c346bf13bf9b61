//! Bulk mutations with snapshot and restore.
//!
//! A [`Mutation`] describes one kind of change applied to many entities. The
//! [`BulkMutationCoordinator`] walks the targets in a stable order, captures
//! each target's previous value, applies the change, and records the outcome
//! per target. One target failing never stops the batch.

mod nickname;
mod roles;

pub use nickname::NicknameOverride;
pub use roles::RoleRevoke;

use crate::error::GatewayError;
use crate::gateway::EntityId;
use crate::metrics;
use crate::telemetry::spans;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{Instrument, debug, info, warn};

/// Pre-mutation state of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture<V> {
    /// Value to restore later.
    Eligible(V),
    /// The target must not be touched; the reason is logged.
    Ineligible(&'static str),
}

/// One kind of change applied by the coordinator.
#[async_trait]
pub trait Mutation: Send + Sync + 'static {
    /// Previous value kept in the snapshot.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn capture(&self, target: &EntityId) -> Result<Capture<Self::Value>, GatewayError>;

    async fn mutate(&self, target: &EntityId) -> Result<(), GatewayError>;

    async fn restore(&self, target: &EntityId, previous: &Self::Value) -> Result<(), GatewayError>;
}

/// Outcome of one bulk pass.
///
/// `succeeded`, `failed` and `skipped` are disjoint and together cover
/// `targets`. `snapshot` holds previous values for succeeded targets only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch<V> {
    pub targets: BTreeSet<EntityId>,
    pub snapshot: BTreeMap<EntityId, V>,
    pub succeeded: BTreeSet<EntityId>,
    pub failed: BTreeSet<EntityId>,
    pub skipped: BTreeSet<EntityId>,
}

impl<V> MutationBatch<V> {
    fn new(targets: BTreeSet<EntityId>) -> Self {
        Self {
            targets,
            snapshot: BTreeMap::new(),
            succeeded: BTreeSet::new(),
            failed: BTreeSet::new(),
            skipped: BTreeSet::new(),
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
            skipped: self.skipped.len(),
        }
    }

    fn record_metrics(&self, mutation: &str) {
        metrics::record_bulk(mutation, "succeeded", self.succeeded.len());
        metrics::record_bulk(mutation, "failed", self.failed.len());
        metrics::record_bulk(mutation, "skipped", self.skipped.len());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Stateless driver for bulk passes. Keeps nothing beyond the batch it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkMutationCoordinator;

impl BulkMutationCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Capture then mutate every target, isolating failures per target.
    pub async fn apply_to_all<M: Mutation>(
        &self,
        targets: impl IntoIterator<Item = EntityId>,
        mutation: &M,
    ) -> MutationBatch<M::Value> {
        let mut batch = MutationBatch::new(targets.into_iter().collect());
        let span = spans::batch(mutation.name(), "apply", batch.targets.len());

        async {
            let targets: Vec<EntityId> = batch.targets.iter().cloned().collect();
            for target in targets {
                let previous = match mutation.capture(&target).await {
                    Ok(Capture::Eligible(value)) => value,
                    Ok(Capture::Ineligible(reason)) => {
                        debug!(target = %target, reason, "Skipping target");
                        batch.skipped.insert(target);
                        continue;
                    }
                    Err(e) => {
                        warn!(target = %target, error = %e, "Failed to capture target");
                        batch.failed.insert(target);
                        continue;
                    }
                };

                match mutation.mutate(&target).await {
                    Ok(()) => {
                        batch.snapshot.insert(target.clone(), previous);
                        batch.succeeded.insert(target);
                    }
                    Err(e) => {
                        warn!(target = %target, error = %e, "Failed to mutate target");
                        batch.failed.insert(target);
                    }
                }
            }
            info!(summary = %batch.summary(), "Bulk mutation finished");
        }
        .instrument(span)
        .await;

        batch.record_metrics(mutation.name());
        batch
    }

    /// Reapply previous values. Entities that vanished are recorded as failed.
    pub async fn restore_all<M: Mutation>(
        &self,
        snapshot: &BTreeMap<EntityId, M::Value>,
        mutation: &M,
    ) -> MutationBatch<M::Value> {
        let mut batch = MutationBatch::new(snapshot.keys().cloned().collect());
        let span = spans::batch(mutation.name(), "restore", batch.targets.len());

        async {
            for (target, previous) in snapshot {
                match mutation.restore(target, previous).await {
                    Ok(()) => {
                        batch.succeeded.insert(target.clone());
                    }
                    Err(e) => {
                        warn!(target = %target, error = %e, "Failed to restore target");
                        batch.failed.insert(target.clone());
                    }
                }
            }
            info!(summary = %batch.summary(), "Bulk restore finished");
        }
        .instrument(span)
        .await;

        batch.record_metrics(mutation.name());
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Counter mutation over an in-memory table with injectable failures.
    #[derive(Default)]
    struct Bump {
        values: Mutex<BTreeMap<EntityId, u32>>,
        frozen: HashSet<EntityId>,
        fail_mutate: HashSet<EntityId>,
        fail_restore: HashSet<EntityId>,
        restored: Mutex<Vec<EntityId>>,
    }

    impl Bump {
        fn with_targets(ids: &[&str]) -> Self {
            let bump = Self::default();
            for id in ids {
                bump.values.lock().insert(id.to_string(), 1);
            }
            bump
        }
    }

    #[async_trait]
    impl Mutation for Bump {
        type Value = u32;

        fn name(&self) -> &'static str {
            "bump"
        }

        async fn capture(&self, target: &EntityId) -> Result<Capture<u32>, GatewayError> {
            if self.frozen.contains(target) {
                return Ok(Capture::Ineligible("frozen"));
            }
            self.values
                .lock()
                .get(target)
                .map(|v| Capture::Eligible(*v))
                .ok_or_else(|| GatewayError::NotFound(target.clone()))
        }

        async fn mutate(&self, target: &EntityId) -> Result<(), GatewayError> {
            if self.fail_mutate.contains(target) {
                return Err(GatewayError::PermissionDenied(target.clone()));
            }
            if let Some(v) = self.values.lock().get_mut(target) {
                *v += 10;
            }
            Ok(())
        }

        async fn restore(&self, target: &EntityId, previous: &u32) -> Result<(), GatewayError> {
            if self.fail_restore.contains(target) {
                return Err(GatewayError::NotFound(target.clone()));
            }
            self.restored.lock().push(target.clone());
            self.values.lock().insert(target.clone(), *previous);
            Ok(())
        }
    }

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn set(names: &[&str]) -> BTreeSet<EntityId> {
        ids(names).into_iter().collect()
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let mut bump = Bump::with_targets(&["e1", "e2", "e3", "e4", "e5"]);
        bump.fail_mutate.insert("e3".into());
        let coordinator = BulkMutationCoordinator::new();

        let batch = coordinator
            .apply_to_all(ids(&["e1", "e2", "e3", "e4", "e5"]), &bump)
            .await;
        assert_eq!(batch.succeeded, set(&["e1", "e2", "e4", "e5"]));
        assert_eq!(batch.failed, set(&["e3"]));
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.snapshot.len(), 4);

        let restored = coordinator.restore_all(&batch.snapshot, &bump).await;
        assert_eq!(restored.succeeded, batch.succeeded);
        assert_eq!(*bump.restored.lock(), ids(&["e1", "e2", "e4", "e5"]));
        assert!(bump.values.lock().values().all(|v| *v == 1));
    }

    #[tokio::test]
    async fn outcome_sets_partition_the_targets() {
        let mut bump = Bump::with_targets(&["a", "b", "c", "d"]);
        bump.frozen.insert("b".into());
        bump.fail_mutate.insert("c".into());

        let batch = BulkMutationCoordinator
            .apply_to_all(ids(&["d", "c", "b", "a", "ghost"]), &bump)
            .await;

        assert_eq!(batch.succeeded, set(&["a", "d"]));
        assert_eq!(batch.failed, set(&["c", "ghost"]));
        assert_eq!(batch.skipped, set(&["b"]));

        let mut union = batch.succeeded.clone();
        union.extend(batch.failed.iter().cloned());
        union.extend(batch.skipped.iter().cloned());
        assert_eq!(union, batch.targets);
        assert!(batch.succeeded.is_disjoint(&batch.failed));
        assert!(batch.succeeded.is_disjoint(&batch.skipped));
        assert!(batch.failed.is_disjoint(&batch.skipped));
        assert_eq!(
            batch.summary(),
            BatchSummary {
                succeeded: 2,
                failed: 2,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn restore_records_vanished_targets_as_failed() {
        let mut bump = Bump::with_targets(&["a", "b"]);
        let batch = BulkMutationCoordinator
            .apply_to_all(ids(&["a", "b"]), &bump)
            .await;

        bump.fail_restore.insert("b".into());
        let restored = BulkMutationCoordinator
            .restore_all(&batch.snapshot, &bump)
            .await;
        assert_eq!(restored.succeeded, set(&["a"]));
        assert_eq!(restored.failed, set(&["b"]));
    }

    #[test]
    fn summary_display() {
        let summary = BatchSummary {
            succeeded: 4,
            failed: 1,
            skipped: 2,
        };
        assert_eq!(summary.to_string(), "4 succeeded, 1 failed, 2 skipped");
    }
}
