//! `cancel`: drop a pending reminder or restore by the id its reply printed.

use super::{Command, CommandContext, parse_action_id};
use crate::error::CommandError;
use async_trait::async_trait;

pub struct CancelCommand;

#[async_trait]
impl Command for CancelCommand {
    fn name(&self) -> &'static str {
        "cancel"
    }

    fn usage(&self) -> &'static str {
        "cancel <id>"
    }

    fn summary(&self) -> &'static str {
        "Drop a pending reminder or restore"
    }

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        ctx.require_moderator(self.name())?;
        let [id] = args else {
            return Err(CommandError::Usage(self.usage()));
        };
        let id = parse_action_id(id)?;

        let text = if ctx.bot.scheduler.cancel(id) {
            format!("Cancelled #{id}.")
        } else {
            format!("Nothing pending with id #{id}.")
        };
        ctx.reply(text).await?;
        Ok(())
    }
}
