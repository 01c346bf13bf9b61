//! `remind`: deliver a message later.

use super::{Command, CommandContext, parse_secs};
use crate::error::CommandError;
use crate::gateway::MessageContent;
use crate::scheduler::DeliverAction;
use async_trait::async_trait;

pub struct RemindCommand;

#[async_trait]
impl Command for RemindCommand {
    fn name(&self) -> &'static str {
        "remind"
    }

    fn usage(&self) -> &'static str {
        "remind <secs> <text>"
    }

    fn summary(&self) -> &'static str {
        "Post a reminder after a delay"
    }

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        let [secs, text @ ..] = args else {
            return Err(CommandError::Usage(self.usage()));
        };
        if text.is_empty() {
            return Err(CommandError::Usage(self.usage()));
        }
        let delay = parse_secs(secs)?;

        let text = format!("<@{}> reminder: {}", ctx.actor, text.join(" "));
        let content = MessageContent::text(text);
        let action = DeliverAction::new(ctx.bot.gateway.clone(), ctx.channel.clone(), content);
        let id = ctx.bot.scheduler.schedule(delay, Box::new(action))?;

        ctx.reply(format!("Reminder #{id} set for {}s from now.", delay.as_secs()))
            .await?;
        Ok(())
    }
}
