//! Bot commands.
//!
//! Every command is a [`Command`] trait object registered by name in the
//! [`CommandRegistry`]. Commands reach the registries through the shared
//! [`Bot`](crate::bot::Bot) carried by their [`CommandContext`].

mod bulk;
mod cancel;
mod help;
mod recruit;
mod registry;
mod remind;
mod roles;

pub use bulk::{LockdownCommand, RenameCommand};
pub use cancel::CancelCommand;
pub use help::{HelpCommand, Paginator};
pub use recruit::{RECRUIT_PREFIX, RecruitCommand, recruitment_view};
pub use registry::CommandRegistry;
pub use remind::RemindCommand;
pub use roles::{RoleMenu, RolesCommand};

use crate::bot::Bot;
use crate::error::{CommandError, GatewayError};
use crate::gateway::{ChannelId, MessageContent, MessageId, UserId};
use crate::scheduler::ActionId;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Who invoked a command, where, and the bot it runs against.
#[derive(Clone)]
pub struct CommandContext {
    pub channel: ChannelId,
    pub actor: UserId,
    pub bot: Arc<Bot>,
}

impl CommandContext {
    pub fn new(bot: Arc<Bot>, channel: impl Into<ChannelId>, actor: impl Into<UserId>) -> Self {
        Self {
            channel: channel.into(),
            actor: actor.into(),
            bot,
        }
    }

    /// Post a plain text reply in the invoking channel.
    pub async fn reply(&self, text: impl Into<String>) -> Result<MessageId, GatewayError> {
        self.bot
            .gateway
            .send(&self.channel, MessageContent::text(text))
            .await
    }

    /// Refuse `command` unless the actor is listed in `bot.moderators`.
    pub fn require_moderator(&self, command: &'static str) -> Result<(), CommandError> {
        if self.bot.config.bot.is_moderator(&self.actor) {
            Ok(())
        } else {
            Err(CommandError::NotPermitted { command })
        }
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    /// Argument synopsis, e.g. `remind <secs> <text>`.
    fn usage(&self) -> &'static str;

    /// One-line description shown by `help`.
    fn summary(&self) -> &'static str;

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError>;
}

/// Parse a deferred action id as printed in replies, with or without `#`.
fn parse_action_id(arg: &str) -> Result<ActionId, CommandError> {
    arg.trim_start_matches('#')
        .parse::<ActionId>()
        .map_err(|_| CommandError::InvalidArgument(format!("`{arg}` is not an action id")))
}

/// Parse a whole number of seconds.
fn parse_secs(arg: &str) -> Result<Duration, CommandError> {
    arg.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| CommandError::InvalidArgument(format!("`{arg}` is not a number of seconds")))
}
