//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use super::limits::{SchedulerConfig, SessionsConfig};
use crate::gateway::Member;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot identity and outer surfaces.
    #[serde(default)]
    pub bot: BotConfig,
    /// Interactive session limits.
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Deferred action limits.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Members seeded into the in-memory gateway.
    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Display name used in replies (default: "rallybot").
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Prometheus metrics HTTP port. 0 or unset disables the endpoint.
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// Roles members may assign to themselves through the `roles` menu.
    #[serde(default)]
    pub selectable_roles: Vec<String>,
    /// Commands per page in the `help` menu (default: 3).
    #[serde(default = "default_help_page_size")]
    pub help_page_size: usize,
    /// Inbound event queue capacity (default: 256).
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    /// Members allowed to run `lockdown`, `rename` and `cancel`.
    /// Empty means nobody can.
    #[serde(default)]
    pub moderators: Vec<String>,
}

impl BotConfig {
    pub fn is_moderator(&self, user: &str) -> bool {
        self.moderators.iter().any(|m| m == user)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            metrics_port: None,
            selectable_roles: Vec::new(),
            help_page_size: default_help_page_size(),
            inbound_capacity: default_inbound_capacity(),
            moderators: Vec::new(),
        }
    }
}

/// Log output configuration.
///
/// `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// A member entry for the in-memory gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberConfig {
    pub id: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// The bot may not modify this member (e.g. the guild owner).
    #[serde(default)]
    pub immutable: bool,
}

impl From<&MemberConfig> for Member {
    fn from(config: &MemberConfig) -> Self {
        Member {
            id: config.id.clone(),
            nickname: config.nickname.clone(),
            roles: config.roles.iter().cloned().collect::<BTreeSet<_>>(),
            immutable: config.immutable,
        }
    }
}

fn default_bot_name() -> String {
    "rallybot".to_string()
}

fn default_help_page_size() -> usize {
    3
}

fn default_inbound_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}
