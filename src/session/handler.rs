//! Capability interface implemented by interactive views.

use crate::gateway::{ChannelId, Gateway, MessageContent, MessageId, UserId};
use async_trait::async_trait;
use std::sync::Arc;

/// A component interaction addressed to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub session: MessageId,
    pub actor: UserId,
    /// Action name, e.g. `next` or `toggle`.
    pub kind: String,
    /// Optional argument, e.g. the role id in `toggle:gamer`.
    pub data: Option<String>,
}

impl InteractionEvent {
    /// Build an event from a component custom id of the form `kind[:data]`.
    pub fn from_component(
        session: impl Into<MessageId>,
        actor: impl Into<UserId>,
        custom_id: &str,
    ) -> Self {
        let (kind, data) = match custom_id.split_once(':') {
            Some((kind, data)) => (kind.to_string(), Some(data.to_string())),
            None => (custom_id.to_string(), None),
        };
        Self {
            session: session.into(),
            actor: actor.into(),
            kind,
            data,
        }
    }
}

/// How a view should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Live,
    /// Session expired: same content, every control disabled.
    Disabled,
}

/// What the collector does after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// State changed, redraw the live view.
    Render,
    /// Nothing visible changed.
    Unchanged,
    /// The owner finished the flow; close the session.
    Complete,
}

/// Read-only context handed to a handler.
pub struct SessionContext {
    pub session: MessageId,
    pub channel: ChannelId,
    pub owner: UserId,
    pub gateway: Arc<dyn Gateway>,
}

/// A session's view state and behaviour.
///
/// The implementor is the session payload: the collector task owns it and is
/// the only code that ever touches it.
#[async_trait]
pub trait SessionHandler: Send + 'static {
    fn render(&self, view: View) -> MessageContent;

    /// Handle an interaction from the session owner.
    async fn on_interaction(
        &mut self,
        event: &InteractionEvent,
        ctx: &SessionContext,
    ) -> HandlerOutcome;

    /// Called once after the session expired, before the disabled redraw.
    async fn on_expire(&mut self, _ctx: &SessionContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_splits_kind_and_data() {
        let event = InteractionEvent::from_component("m1", "u1", "toggle:gamer");
        assert_eq!(event.kind, "toggle");
        assert_eq!(event.data.as_deref(), Some("gamer"));

        let event = InteractionEvent::from_component("m1", "u1", "next");
        assert_eq!(event.kind, "next");
        assert!(event.data.is_none());
    }
}
