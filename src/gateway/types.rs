//! Platform-facing value types.

use serde::Deserialize;
use std::collections::BTreeSet;

/// Identifier of a platform user or guild member.
pub type UserId = String;
/// Identifier of a text channel.
pub type ChannelId = String;
/// Identifier of a posted message.
pub type MessageId = String;
/// Identifier of a role.
pub type RoleId = String;
/// Identifier of any entity a bulk mutation can target (members, in practice).
pub type EntityId = UserId;

/// A clickable component attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Custom id echoed back in the component interaction.
    pub id: String,
    pub label: String,
    pub disabled: bool,
}

/// Outbound message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.buttons.push(Button {
            id: id.into(),
            label: label.into(),
            disabled: false,
        });
        self
    }

    /// Grey out every button while keeping the content visible.
    pub fn disabled(mut self) -> Self {
        for button in &mut self.buttons {
            button.disabled = true;
        }
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.buttons.iter().any(|b| !b.disabled)
    }
}

/// A guild member as returned by `fetch_entity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: UserId,
    pub nickname: Option<String>,
    pub roles: BTreeSet<RoleId>,
    /// Set for members the bot may not modify (guild owner, higher roles).
    pub immutable: bool,
}

/// A change applied to a single entity through `mutate_entity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityChange {
    /// Set (`Some`) or reset (`None`) the member's nickname.
    Nickname(Option<String>),
    AddRole(RoleId),
    RemoveRole(RoleId),
}

/// Events delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A slash-style command invocation.
    Command {
        channel: ChannelId,
        actor: UserId,
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// A button press on a message the bot posted.
    Component {
        channel: ChannelId,
        message: MessageId,
        actor: UserId,
        custom_id: String,
    },
}
