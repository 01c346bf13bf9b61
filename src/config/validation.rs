//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.name is required")]
    MissingBotName,
    #[error("sessions.default_ttl_secs must be greater than 0")]
    ZeroDefaultTtl,
    #[error("sessions.default_ttl_secs ({default}) exceeds sessions.max_ttl_secs ({max})")]
    DefaultTtlAboveMax { default: u64, max: u64 },
    #[error("sessions.mailbox_capacity must be greater than 0")]
    ZeroMailboxCapacity,
    #[error("sessions.purge_interval_secs must be greater than 0")]
    ZeroPurgeInterval,
    #[error("bot.help_page_size must be greater than 0")]
    ZeroHelpPageSize,
    #[error("duplicate member id: {0}")]
    DuplicateMember(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bot.name.trim().is_empty() {
        errors.push(ValidationError::MissingBotName);
    }
    if config.bot.help_page_size == 0 {
        errors.push(ValidationError::ZeroHelpPageSize);
    }

    let sessions = &config.sessions;
    if sessions.default_ttl_secs == 0 {
        errors.push(ValidationError::ZeroDefaultTtl);
    }
    if sessions.default_ttl_secs > sessions.max_ttl_secs {
        errors.push(ValidationError::DefaultTtlAboveMax {
            default: sessions.default_ttl_secs,
            max: sessions.max_ttl_secs,
        });
    }
    if sessions.mailbox_capacity == 0 {
        errors.push(ValidationError::ZeroMailboxCapacity);
    }
    if sessions.purge_interval_secs == 0 {
        errors.push(ValidationError::ZeroPurgeInterval);
    }

    let mut seen = HashSet::new();
    for member in &config.members {
        if !seen.insert(member.id.as_str()) {
            errors.push(ValidationError::DuplicateMember(member.id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
