//! Per-session interaction collector.
//!
//! Each live session runs one collector task. The task owns the session's
//! handler (its payload) and drains the session mailbox one event at a time,
//! so events for a session are handled strictly in arrival order while
//! different sessions proceed independently.

use super::handler::{HandlerOutcome, InteractionEvent, SessionContext, SessionHandler, View};
use super::{ExpireReason, RegistryInner, SessionState};
use crate::metrics;
use crate::telemetry::spans;
use std::sync::Weak;
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, warn};

pub(super) struct InteractionCollector {
    ctx: SessionContext,
    handler: Box<dyn SessionHandler>,
    mailbox: mpsc::Receiver<InteractionEvent>,
    status: watch::Receiver<SessionState>,
    registry: Weak<RegistryInner>,
}

impl InteractionCollector {
    pub(super) fn new(
        ctx: SessionContext,
        handler: Box<dyn SessionHandler>,
        mailbox: mpsc::Receiver<InteractionEvent>,
        status: watch::Receiver<SessionState>,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            ctx,
            handler,
            mailbox,
            status,
            registry,
        }
    }

    /// Run until the session expires or the registry goes away.
    pub(super) async fn run(self) {
        let span = spans::session(&self.ctx.session, &self.ctx.owner);
        self.collect().instrument(span).await;
    }

    async fn collect(mut self) {
        loop {
            tokio::select! {
                biased;

                changed = self.status.changed() => {
                    if changed.is_err() || self.is_expired() {
                        break;
                    }
                }

                event = self.mailbox.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }

        self.close().await;
    }

    fn is_expired(&self) -> bool {
        *self.status.borrow() == SessionState::Expired
    }

    async fn handle(&mut self, event: InteractionEvent) {
        // Queued before expiry but not yet processed.
        if self.is_expired() {
            debug!(kind = %event.kind, "Dropping interaction for expired session");
            metrics::record_interaction("dropped");
            return;
        }
        if event.actor != self.ctx.owner {
            metrics::record_interaction("ignored");
            return;
        }

        let outcome = self.handler.on_interaction(&event, &self.ctx).await;
        metrics::record_interaction("handled");
        debug!(kind = %event.kind, outcome = ?outcome, "Interaction handled");

        match outcome {
            HandlerOutcome::Render => {
                if !self.is_expired() {
                    self.redraw(View::Live).await;
                }
            }
            HandlerOutcome::Unchanged => {}
            HandlerOutcome::Complete => {
                if let Some(registry) = self.registry.upgrade() {
                    registry.expire(&self.ctx.session, ExpireReason::Completed);
                }
            }
        }
    }

    async fn close(mut self) {
        self.mailbox.close();
        self.handler.on_expire(&self.ctx).await;
        self.redraw(View::Disabled).await;
        debug!("Collector closed");
    }

    async fn redraw(&mut self, view: View) {
        let content = self.handler.render(view);
        if let Err(e) = self
            .ctx
            .gateway
            .edit(&self.ctx.channel, &self.ctx.session, content)
            .await
        {
            warn!(error = %e, view = ?view, "Failed to redraw session");
        }
    }
}
