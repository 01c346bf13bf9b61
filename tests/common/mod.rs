//! Integration test common infrastructure.
//!
//! Builds a bot on top of the in-memory gateway and drives it through the
//! event router exactly like the binary does.

#![allow(dead_code)]

use rallybot::bot::Bot;
use rallybot::config::{Config, MemberConfig};
use rallybot::gateway::{InboundEvent, Member, MemoryGateway, MessageContent, MessageId, Outbound};
use rallybot::router::EventRouter;
use std::sync::Arc;

pub const CHANNEL: &str = "general";

pub fn member(id: &str, roles: &[&str]) -> MemberConfig {
    MemberConfig {
        id: id.to_string(),
        nickname: None,
        roles: roles.iter().map(|r| r.to_string()).collect(),
        immutable: false,
    }
}

/// Guild owner plus four regular members, all holding `talker`.
///
/// `mod` may run moderator commands without being a member itself.
pub fn default_config() -> Config {
    let mut config = Config::default();
    config.bot.selectable_roles = vec!["gamer".into(), "artist".into()];
    config.bot.moderators = vec!["mod".into()];
    config.bot.help_page_size = 4;
    config.sessions.default_ttl_secs = 60;
    config.members = vec![
        MemberConfig {
            immutable: true,
            ..member("owner", &["talker"])
        },
        MemberConfig {
            nickname: Some("Ann".into()),
            ..member("u1", &["talker"])
        },
        member("u2", &["talker"]),
        member("u3", &["talker"]),
        member("u4", &["talker"]),
    ];
    config
}

pub struct TestBot {
    pub bot: Arc<Bot>,
    pub gateway: Arc<MemoryGateway>,
    pub router: EventRouter,
}

impl TestBot {
    pub fn start() -> Self {
        Self::with_config(default_config())
    }

    pub fn with_config(config: Config) -> Self {
        let members: Vec<Member> = config.members.iter().map(Member::from).collect();
        let (gateway, _inbound) = MemoryGateway::new(members, 16);
        let bot = Bot::new(config, gateway.clone());
        bot.start();
        let router = EventRouter::new(Arc::clone(&bot));
        Self {
            bot,
            gateway,
            router,
        }
    }

    pub async fn command(&self, actor: &str, name: &str, args: &[&str]) {
        self.router
            .handle(InboundEvent::Command {
                channel: CHANNEL.into(),
                actor: actor.into(),
                name: name.into(),
                args: args.iter().map(|a| a.to_string()).collect(),
            })
            .await;
        settle().await;
    }

    pub async fn press(&self, actor: &str, message: &str, custom_id: &str) {
        self.router
            .handle(InboundEvent::Component {
                channel: CHANNEL.into(),
                message: message.into(),
                actor: actor.into(),
                custom_id: custom_id.into(),
            })
            .await;
        settle().await;
    }

    /// Id and original content of the most recent message posted.
    pub fn last_sent(&self) -> (MessageId, MessageContent) {
        self.gateway
            .outbox()
            .into_iter()
            .rev()
            .find_map(|o| match o {
                Outbound::Send {
                    message, content, ..
                } => Some((message, content)),
                _ => None,
            })
            .expect("nothing was sent")
    }

    /// Current content of a posted message.
    pub fn view(&self, message: &str) -> MessageContent {
        self.gateway.message(message).expect("unknown message")
    }

    /// Texts posted to the test channel, oldest first.
    pub fn posts(&self) -> Vec<String> {
        self.gateway
            .sent_to(CHANNEL)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    pub fn roles_of(&self, id: &str) -> Vec<String> {
        self.gateway
            .member(id)
            .map(|m| m.roles.into_iter().collect())
            .unwrap_or_default()
    }
}

/// Let spawned tasks (collectors, fired actions) run.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
