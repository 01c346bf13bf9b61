//! `recruit`: post a join board for a role.

use super::{Command, CommandContext};
use crate::error::CommandError;
use crate::gateway::{MessageContent, RoleId, UserId};
use crate::recruit::RecruitmentRecord;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Component id prefix routed to the recruitment store.
pub const RECRUIT_PREFIX: &str = "recruit:";

fn board(
    role: &RoleId,
    participants: &BTreeSet<UserId>,
    capacity: Option<usize>,
) -> MessageContent {
    let count = match capacity {
        Some(capacity) => format!("{}/{}", participants.len(), capacity),
        None => participants.len().to_string(),
    };
    let names: Vec<String> = participants.iter().map(|p| format!("<@{p}>")).collect();
    MessageContent::text(format!(
        "Looking for **{role}** ({count})\n{}",
        names.join(" ")
    ))
    .with_button(format!("{RECRUIT_PREFIX}join"), "Join")
    .with_button(format!("{RECRUIT_PREFIX}leave"), "Leave")
}

/// Current board for a tracked recruitment.
pub fn recruitment_view(record: &RecruitmentRecord) -> MessageContent {
    board(&record.role, &record.participants, record.capacity)
}

pub struct RecruitCommand;

#[async_trait]
impl Command for RecruitCommand {
    fn name(&self) -> &'static str {
        "recruit"
    }

    fn usage(&self) -> &'static str {
        "recruit <role> [capacity]"
    }

    fn summary(&self) -> &'static str {
        "Gather players for a role"
    }

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        let Some(role) = args.first() else {
            return Err(CommandError::Usage(self.usage()));
        };
        let capacity = match args.get(1) {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(CommandError::InvalidArgument(format!(
                        "capacity must be a positive number, got `{arg}`"
                    )));
                }
            },
            None => None,
        };

        let creator = BTreeSet::from([ctx.actor.clone()]);
        let message = ctx
            .bot
            .gateway
            .send(&ctx.channel, board(role, &creator, capacity))
            .await?;
        ctx.bot.recruitment.create_record(
            message,
            ctx.channel.clone(),
            role.clone(),
            ctx.actor.clone(),
            capacity,
        )?;
        Ok(())
    }
}
