//! Inbound event routing.
//!
//! Component presses go to the recruitment store (`recruit:*` ids) or to the
//! session registry; commands go to the command registry. Component events
//! are routed inline so presses on one message keep their arrival order;
//! commands run on their own tasks.

use crate::bot::Bot;
use crate::commands::{CommandContext, CommandRegistry, RECRUIT_PREFIX, recruitment_view};
use crate::error::{CommandError, SessionError};
use crate::gateway::{ChannelId, InboundEvent, MessageContent, MessageId, UserId};
use crate::session::{Dispatch, InteractionEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct EventRouter {
    bot: Arc<Bot>,
    commands: Arc<CommandRegistry>,
}

impl EventRouter {
    pub fn new(bot: Arc<Bot>) -> Self {
        let commands = Arc::new(CommandRegistry::new(&bot.config.bot));
        Self { bot, commands }
    }

    /// Consume inbound events until the gateway side closes.
    pub async fn run(self, mut events: mpsc::Receiver<InboundEvent>) {
        info!("Event router started");
        while let Some(event) = events.recv().await {
            match event {
                InboundEvent::Command { .. } => {
                    let router = self.clone();
                    tokio::spawn(async move { router.handle(event).await });
                }
                InboundEvent::Component { .. } => self.handle(event).await,
            }
        }
        info!("Event router stopped");
    }

    /// Route one event to completion.
    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Command {
                channel,
                actor,
                name,
                args,
            } => self.handle_command(channel, actor, &name, &args).await,
            InboundEvent::Component {
                channel,
                message,
                actor,
                custom_id,
            } => match custom_id.strip_prefix(RECRUIT_PREFIX) {
                Some(action) => self.handle_recruit(&channel, &message, &actor, action).await,
                None => {
                    let event = InteractionEvent::from_component(message, actor, &custom_id);
                    self.handle_interaction(&channel, event).await
                }
            },
        }
    }

    async fn handle_command(&self, channel: ChannelId, actor: UserId, name: &str, args: &[String]) {
        let ctx = CommandContext::new(Arc::clone(&self.bot), channel, actor);
        if let Err(e) = self.commands.dispatch(&ctx, name, args).await {
            self.reply_error(&ctx.channel, e).await;
        }
    }

    async fn handle_interaction(&self, channel: &ChannelId, event: InteractionEvent) {
        match self.bot.sessions.dispatch(event) {
            Ok(Dispatch::Delivered | Dispatch::Ignored) => {}
            Err(e @ SessionError::NotFound(_)) => self.reply_error(channel, e.into()).await,
            Err(e) => warn!(channel = %channel, error = %e, "Interaction not delivered"),
        }
    }

    async fn handle_recruit(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        actor: &UserId,
        action: &str,
    ) {
        let store = &self.bot.recruitment;
        let result = match action {
            "join" => store.join(message, actor),
            "leave" => store.leave(message, actor),
            other => {
                debug!(action = other, "Unknown recruitment action");
                return;
            }
        };
        if let Err(e) = result {
            self.reply_error(channel, e.into()).await;
            return;
        }

        if let Ok(record) = store.get(message) {
            let view = recruitment_view(&record);
            if let Err(e) = self.bot.gateway.edit(channel, message, view).await {
                warn!(message = %message, error = %e, "Failed to refresh recruitment");
            }
        }
    }

    async fn reply_error(&self, channel: &ChannelId, error: CommandError) {
        let Some(text) = error.user_message() else {
            return;
        };
        if let Err(e) = self
            .bot
            .gateway
            .send(channel, MessageContent::text(text))
            .await
        {
            warn!(channel = %channel, error = %e, "Failed to send error reply");
        }
    }
}
