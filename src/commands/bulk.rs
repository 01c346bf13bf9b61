//! Temporary guild-wide changes: `lockdown` and `rename`.
//!
//! Both apply a bulk mutation to every member right away and schedule a
//! restore from the captured snapshot. Only moderators may run them.

use super::{Command, CommandContext, parse_secs};
use crate::bulk::{BulkMutationCoordinator, Mutation, NicknameOverride, RoleRevoke};
use crate::error::CommandError;
use crate::scheduler::RestoreAction;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

async fn apply_temporarily<M: Mutation>(
    ctx: &CommandContext,
    mutation: Arc<M>,
    restore_after: Duration,
) -> Result<(), CommandError> {
    let bot = &ctx.bot;
    // The restore delay is checked before any member is touched.
    bot.scheduler.ensure_delay(restore_after)?;

    let targets = bot.gateway.list_members().await?;
    let batch = bot.bulk.apply_to_all(targets, mutation.as_ref()).await;
    let summary = batch.summary();
    info!(mutation = mutation.name(), summary = %summary, "Temporary change applied");

    if batch.succeeded.is_empty() {
        ctx.reply(format!("{}: {summary}. Nothing to restore.", mutation.name()))
            .await?;
        return Ok(());
    }

    let snapshot = batch.snapshot.clone();
    let restore = RestoreAction::new(Arc::clone(&mutation), batch.snapshot)
        .report_to(bot.gateway.clone(), ctx.channel.clone());

    let text = match bot.scheduler.schedule(restore_after, Box::new(restore)) {
        Ok(id) => format!(
            "{}: {summary}. Restore #{id} in {}s.",
            mutation.name(),
            restore_after.as_secs()
        ),
        Err(e) => {
            warn!(error = %e, "Restore could not be scheduled, restoring now");
            let restored = BulkMutationCoordinator
                .restore_all(&snapshot, mutation.as_ref())
                .await;
            format!(
                "{}: {summary}. Could not schedule the restore, reverted now: {}.",
                mutation.name(),
                restored.summary()
            )
        }
    };
    ctx.reply(text).await?;
    Ok(())
}

pub struct LockdownCommand;

#[async_trait]
impl Command for LockdownCommand {
    fn name(&self) -> &'static str {
        "lockdown"
    }

    fn usage(&self) -> &'static str {
        "lockdown <secs> <role>"
    }

    fn summary(&self) -> &'static str {
        "Revoke a role from everyone for a while"
    }

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        ctx.require_moderator(self.name())?;
        let [secs, role] = args else {
            return Err(CommandError::Usage(self.usage()));
        };
        let restore_after = parse_secs(secs)?;
        let revoke = Arc::new(RoleRevoke::new(ctx.bot.gateway.clone(), role.clone()));
        apply_temporarily(ctx, revoke, restore_after).await
    }
}

pub struct RenameCommand;

#[async_trait]
impl Command for RenameCommand {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn usage(&self) -> &'static str {
        "rename <secs> <nickname>"
    }

    fn summary(&self) -> &'static str {
        "Give everyone the same nickname for a while"
    }

    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> Result<(), CommandError> {
        ctx.require_moderator(self.name())?;
        let [secs, nickname @ ..] = args else {
            return Err(CommandError::Usage(self.usage()));
        };
        if nickname.is_empty() {
            return Err(CommandError::Usage(self.usage()));
        }
        let restore_after = parse_secs(secs)?;
        let rename = Arc::new(NicknameOverride::new(
            ctx.bot.gateway.clone(),
            nickname.join(" "),
        ));
        apply_temporarily(ctx, rename, restore_after).await
    }
}
