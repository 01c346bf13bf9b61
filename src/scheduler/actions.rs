//! Concrete deferred actions.

use super::{ActionHandler, ActionKind};
use crate::bulk::{BulkMutationCoordinator, Mutation};
use crate::error::ActionError;
use crate::gateway::{ChannelId, EntityId, Gateway, MessageContent};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Post a message to a channel.
pub struct DeliverAction {
    gateway: Arc<dyn Gateway>,
    channel: ChannelId,
    content: MessageContent,
}

impl DeliverAction {
    pub fn new(gateway: Arc<dyn Gateway>, channel: ChannelId, content: MessageContent) -> Self {
        Self {
            gateway,
            channel,
            content,
        }
    }
}

#[async_trait]
impl ActionHandler for DeliverAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Deliver
    }

    fn describe(&self) -> String {
        format!("deliver message to {}", self.channel)
    }

    async fn fire(self: Box<Self>) -> Result<(), ActionError> {
        let Self {
            gateway,
            channel,
            content,
        } = *self;
        gateway.send(&channel, content).await?;
        Ok(())
    }
}

/// Reapply a bulk mutation snapshot, then optionally report to a channel.
pub struct RestoreAction<M: Mutation> {
    mutation: Arc<M>,
    snapshot: BTreeMap<EntityId, M::Value>,
    report: Option<(Arc<dyn Gateway>, ChannelId)>,
}

impl<M: Mutation> RestoreAction<M> {
    pub fn new(mutation: Arc<M>, snapshot: BTreeMap<EntityId, M::Value>) -> Self {
        Self {
            mutation,
            snapshot,
            report: None,
        }
    }

    /// Post the restore summary to `channel` once done.
    pub fn report_to(mut self, gateway: Arc<dyn Gateway>, channel: ChannelId) -> Self {
        self.report = Some((gateway, channel));
        self
    }
}

#[async_trait]
impl<M: Mutation> ActionHandler for RestoreAction<M> {
    fn kind(&self) -> ActionKind {
        ActionKind::Restore
    }

    fn describe(&self) -> String {
        format!(
            "restore {} for {} entities",
            self.mutation.name(),
            self.snapshot.len()
        )
    }

    async fn fire(self: Box<Self>) -> Result<(), ActionError> {
        let batch = BulkMutationCoordinator
            .restore_all(&self.snapshot, self.mutation.as_ref())
            .await;
        let summary = batch.summary();

        if let Some((gateway, channel)) = &self.report {
            let text = format!("Restored {}: {}", self.mutation.name(), summary);
            if let Err(e) = gateway.send(channel, MessageContent::text(text)).await {
                warn!(channel = %channel, error = %e, "Failed to report restore");
            }
        }

        if summary.failed > 0 {
            return Err(ActionError::Partial {
                failed: summary.failed,
                total: batch.targets.len(),
            });
        }
        Ok(())
    }
}
