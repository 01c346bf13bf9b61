//! In-process gateway.
//!
//! Holds a member table and the messages the bot posted, logs every outbound
//! call, and lets callers inject failures per entity. The binary uses it as a
//! dry-run platform fed from stdin; tests use it to observe side effects.

use super::{
    ChannelId, EntityChange, EntityId, Gateway, GatewayError, InboundEvent, Member,
    MessageContent, MessageId,
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Record of one successful outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Send {
        channel: ChannelId,
        message: MessageId,
        content: MessageContent,
    },
    Edit {
        channel: ChannelId,
        message: MessageId,
        content: MessageContent,
    },
    Mutate {
        entity: EntityId,
        change: EntityChange,
    },
}

#[derive(Debug, Clone)]
struct PostedMessage {
    channel: ChannelId,
    content: MessageContent,
}

pub struct MemoryGateway {
    members: DashMap<EntityId, Member>,
    messages: DashMap<MessageId, PostedMessage>,
    outbox: Mutex<Vec<Outbound>>,
    /// Entities whose mutations are refused.
    denied: DashSet<EntityId>,
    /// When set, send/edit fail as if the platform were down.
    offline: AtomicBool,
    inbound_tx: mpsc::Sender<InboundEvent>,
}

impl MemoryGateway {
    /// Create a gateway seeded with `members`.
    ///
    /// Returns the gateway and the inbound event stream it feeds.
    pub fn new(
        members: impl IntoIterator<Item = Member>,
        inbound_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<InboundEvent>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity.max(1));
        let gateway = Self {
            members: members.into_iter().map(|m| (m.id.clone(), m)).collect(),
            messages: DashMap::new(),
            outbox: Mutex::new(Vec::new()),
            denied: DashSet::new(),
            offline: AtomicBool::new(false),
            inbound_tx,
        };
        (Arc::new(gateway), inbound_rx)
    }

    /// Push an inbound event as if the platform had delivered it.
    ///
    /// Returns `false` once the receiving side is gone.
    pub async fn inject(&self, event: InboundEvent) -> bool {
        self.inbound_tx.send(event).await.is_ok()
    }

    /// Refuse every future mutation of `entity`.
    pub fn deny_mutations(&self, entity: &str) {
        self.denied.insert(entity.to_string());
    }

    pub fn allow_mutations(&self, entity: &str) {
        self.denied.remove(entity);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Remove a member, as if they left the guild.
    pub fn remove_member(&self, entity: &str) -> Option<Member> {
        self.members.remove(entity).map(|(_, m)| m)
    }

    pub fn member(&self, entity: &str) -> Option<Member> {
        self.members.get(entity).map(|m| m.value().clone())
    }

    /// Current content of a posted message.
    pub fn message(&self, message: &str) -> Option<MessageContent> {
        self.messages.get(message).map(|m| m.content.clone())
    }

    pub fn outbox(&self) -> Vec<Outbound> {
        self.outbox.lock().clone()
    }

    /// Successful mutations in the order they were applied.
    pub fn mutations(&self) -> Vec<(EntityId, EntityChange)> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Mutate { entity, change } => Some((entity.clone(), change.clone())),
                _ => None,
            })
            .collect()
    }

    /// Messages posted to `channel`, oldest first.
    pub fn sent_to(&self, channel: &str) -> Vec<MessageContent> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Send {
                    channel: c,
                    content,
                    ..
                } if c == channel => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(GatewayError::Unreachable("gateway offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn record(&self, outbound: Outbound) {
        self.outbox.lock().push(outbound);
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn send(
        &self,
        channel: &ChannelId,
        content: MessageContent,
    ) -> Result<MessageId, GatewayError> {
        self.ensure_online()?;
        let message = Uuid::new_v4().simple().to_string();
        info!(channel = %channel, message = %message, text = %content.text, "send");
        self.messages.insert(
            message.clone(),
            PostedMessage {
                channel: channel.clone(),
                content: content.clone(),
            },
        );
        self.record(Outbound::Send {
            channel: channel.clone(),
            message: message.clone(),
            content,
        });
        Ok(message)
    }

    async fn edit(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: MessageContent,
    ) -> Result<(), GatewayError> {
        self.ensure_online()?;
        {
            let mut posted = self
                .messages
                .get_mut(message)
                .ok_or_else(|| GatewayError::NotFound(message.clone()))?;
            if &posted.channel != channel {
                return Err(GatewayError::Rejected(format!(
                    "message {message} is not in channel {channel}"
                )));
            }
            posted.content = content.clone();
        }
        debug!(channel = %channel, message = %message, "edit");
        self.record(Outbound::Edit {
            channel: channel.clone(),
            message: message.clone(),
            content,
        });
        Ok(())
    }

    async fn mutate_entity(
        &self,
        entity: &EntityId,
        change: EntityChange,
    ) -> Result<(), GatewayError> {
        if self.denied.contains(entity) {
            return Err(GatewayError::PermissionDenied(entity.clone()));
        }
        {
            let mut member = self
                .members
                .get_mut(entity)
                .ok_or_else(|| GatewayError::NotFound(entity.clone()))?;
            match &change {
                EntityChange::Nickname(nick) => member.nickname = nick.clone(),
                EntityChange::AddRole(role) => {
                    member.roles.insert(role.clone());
                }
                EntityChange::RemoveRole(role) => {
                    member.roles.remove(role);
                }
            }
        }
        debug!(entity = %entity, change = ?change, "mutate");
        self.record(Outbound::Mutate {
            entity: entity.clone(),
            change,
        });
        Ok(())
    }

    async fn fetch_entity(&self, entity: &EntityId) -> Result<Member, GatewayError> {
        self.member(entity)
            .ok_or_else(|| GatewayError::NotFound(entity.clone()))
    }

    async fn list_members(&self) -> Result<Vec<EntityId>, GatewayError> {
        let mut ids: Vec<EntityId> = self.members.iter().map(|m| m.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
