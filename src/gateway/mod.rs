//! Platform gateway abstraction.
//!
//! The bot never talks to the chat platform directly. Outbound calls go
//! through the [`Gateway`] trait and every one of them may fail on its own;
//! inbound events arrive on the receiver handed out when a gateway is built.

mod memory;
mod types;

pub use crate::error::GatewayError;
pub use memory::{MemoryGateway, Outbound};
pub use types::{
    Button, ChannelId, EntityChange, EntityId, InboundEvent, Member, MessageContent, MessageId,
    RoleId, UserId,
};

use async_trait::async_trait;

/// Outbound side of the chat platform.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Post a new message, returning its id.
    async fn send(
        &self,
        channel: &ChannelId,
        content: MessageContent,
    ) -> Result<MessageId, GatewayError>;

    /// Replace the content of a message the bot posted earlier.
    async fn edit(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: MessageContent,
    ) -> Result<(), GatewayError>;

    /// Apply a change to a single entity.
    async fn mutate_entity(&self, entity: &EntityId, change: EntityChange)
    -> Result<(), GatewayError>;

    /// Fetch the current state of an entity.
    async fn fetch_entity(&self, entity: &EntityId) -> Result<Member, GatewayError>;

    /// Ids of every member of the guild.
    async fn list_members(&self) -> Result<Vec<EntityId>, GatewayError>;
}
