//! Session and scheduler limits configuration.

use serde::Deserialize;
use std::time::Duration;

/// Interactive session limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// TTL used when a command does not ask for one (default: 120).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Longest TTL a session may be created with (default: 900).
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u64,
    /// Per-session interaction mailbox capacity (default: 16).
    /// Events arriving while the mailbox is full are refused.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Seconds an expired session record stays visible before it is purged (default: 600).
    #[serde(default = "default_purge_after_secs")]
    pub purge_after_secs: u64,
    /// Seconds between purge sweeps (default: 60).
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            max_ttl_secs: default_max_ttl_secs(),
            mailbox_capacity: default_mailbox_capacity(),
            purge_after_secs: default_purge_after_secs(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl SessionsConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl_secs)
    }

    pub fn purge_after(&self) -> Duration {
        Duration::from_secs(self.purge_after_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

/// Deferred action scheduler limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Longest delay an action may be scheduled with (default: 7 days).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

fn default_ttl_secs() -> u64 {
    120
}

fn default_max_ttl_secs() -> u64 {
    900
}

fn default_mailbox_capacity() -> usize {
    16
}

fn default_purge_after_secs() -> u64 {
    600
}

fn default_purge_interval_secs() -> u64 {
    60
}

fn default_max_delay_secs() -> u64 {
    7 * 24 * 3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let sessions = SessionsConfig::default();
        assert_eq!(sessions.default_ttl(), Duration::from_secs(120));
        assert_eq!(sessions.max_ttl(), Duration::from_secs(900));
        assert_eq!(sessions.mailbox_capacity, 16);
        assert_eq!(sessions.purge_after(), Duration::from_secs(600));

        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.max_delay(), Duration::from_secs(604_800));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let sessions: SessionsConfig = toml::from_str("max_ttl_secs = 30").unwrap();
        assert_eq!(sessions.max_ttl_secs, 30);
        assert_eq!(sessions.default_ttl_secs, 120);
    }
}
