//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level config structs (Config, BotConfig, LoggingConfig, MemberConfig)
//! - [`limits`]: Session and scheduler limits (SessionsConfig, SchedulerConfig)
//! - [`validation`]: Startup validation collecting every error found

mod limits;
mod types;
pub mod validation;

pub use limits::{SchedulerConfig, SessionsConfig};
pub use types::{BotConfig, Config, ConfigError, LoggingConfig, MemberConfig};
