//! Command registry and dispatch.

use super::{
    CancelCommand, Command, CommandContext, HelpCommand, LockdownCommand, RecruitCommand,
    RemindCommand, RenameCommand, RolesCommand,
};
use crate::config::BotConfig;
use crate::error::CommandError;
use crate::metrics;
use crate::telemetry::{CommandTimer, spans};
use std::collections::HashMap;
use tracing::{Instrument, debug};

/// Registry of command handlers.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with every command registered.
    pub fn new(config: &BotConfig) -> Self {
        let mut commands: Vec<Box<dyn Command>> = vec![
            Box::new(RolesCommand::new(config.selectable_roles.clone())),
            Box::new(RecruitCommand),
            Box::new(RemindCommand),
            Box::new(CancelCommand),
            Box::new(LockdownCommand),
            Box::new(RenameCommand),
        ];

        let mut entries: Vec<(&'static str, &'static str)> =
            commands.iter().map(|c| (c.usage(), c.summary())).collect();
        entries.insert(0, (HelpCommand::USAGE, HelpCommand::SUMMARY));
        commands.insert(0, Box::new(HelpCommand::new(&entries, config.help_page_size)));

        let commands = commands.into_iter().map(|c| (c.name(), c)).collect();
        Self { commands }
    }

    /// Run the command called `name` (case-insensitive).
    pub async fn dispatch(
        &self,
        ctx: &CommandContext,
        name: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        let name = name.to_ascii_lowercase();
        let Some((&name, command)) = self.commands.get_key_value(name.as_str()) else {
            metrics::record_command_error("unknown", "unknown_command");
            return Err(CommandError::UnknownCommand(name));
        };

        let span = spans::command(name, &ctx.actor, &ctx.channel);
        let _timer = CommandTimer::new(name);
        let result = command.execute(ctx, args).instrument(span).await;

        if let Err(ref e) = result {
            metrics::record_command_error(name, e.error_code());
            debug!(command = %name, error = %e, "Command error");
        }
        result
    }
}
