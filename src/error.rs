//! Unified error handling for rallybot.
//!
//! Each subsystem owns a small error enum. All of them expose a static
//! `error_code()` used as a metrics label, and the command layer maps them
//! to the text shown back to the invoking user.

use crate::gateway::{EntityId, MessageId};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Gateway Errors (outbound platform calls)
// ============================================================================

/// Failure of a single outbound platform call.
///
/// Every variant is recoverable and local to the call that produced it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("platform unreachable: {0}")]
    Unreachable(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl GatewayError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Unreachable(_) => "unreachable",
            Self::Rejected(_) => "rejected",
        }
    }
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors surfaced by the session registry.
///
/// Unauthorized actors never produce an error: their events are dropped and
/// reported as [`crate::session::Dispatch::Ignored`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Session is absent or already expired.
    #[error("no such session: {0}")]
    NotFound(MessageId),

    #[error("session already exists: {0}")]
    AlreadyExists(MessageId),

    #[error("invalid session ttl {requested:?} (must be > 0 and <= {max:?})")]
    InvalidTtl { requested: Duration, max: Duration },

    /// The session's mailbox is full; the event was not queued.
    #[error("session {0} is busy")]
    Busy(MessageId),

    #[error("failed to render session: {0}")]
    Render(#[from] GatewayError),
}

impl SessionError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidTtl { .. } => "invalid_ttl",
            Self::Busy(_) => "busy",
            Self::Render(_) => "render_failed",
        }
    }
}

// ============================================================================
// Recruitment Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecruitError {
    #[error("no recruitment for message {0}")]
    NotFound(MessageId),

    #[error("recruitment already exists for message {0}")]
    AlreadyExists(MessageId),

    #[error("recruitment is full ({capacity} participants)")]
    Full { capacity: usize },
}

impl RecruitError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Full { .. } => "full",
        }
    }
}

// ============================================================================
// Scheduler Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// Requested delay exceeds the configured maximum. Nothing was scheduled.
    #[error("delay {requested:?} exceeds the maximum of {max:?}")]
    Overflow { requested: Duration, max: Duration },

    #[error("scheduler is shut down")]
    ShutDown,
}

impl ScheduleError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Overflow { .. } => "overflow",
            Self::ShutDown => "shut_down",
        }
    }
}

/// Failure reported by a fired deferred action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Some entities of a restore batch could not be restored.
    #[error("{failed} of {total} entities could not be restored")]
    Partial { failed: usize, total: usize },
}

impl ActionError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Gateway(e) => e.error_code(),
            Self::Partial { .. } => "partial",
        }
    }
}

// ============================================================================
// Command Errors
// ============================================================================

/// Errors that can occur while executing a bot command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("member not found: {0}")]
    UnknownMember(EntityId),

    #[error("{command} is restricted to moderators")]
    NotPermitted { command: &'static str },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Recruit(#[from] RecruitError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl CommandError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownCommand(_) => "unknown_command",
            Self::UnknownMember(_) => "unknown_member",
            Self::NotPermitted { .. } => "not_permitted",
            Self::Session(e) => e.error_code(),
            Self::Recruit(e) => e.error_code(),
            Self::Schedule(e) => e.error_code(),
            Self::Gateway(e) => e.error_code(),
        }
    }

    /// Text shown to the invoking user.
    ///
    /// Returns `None` for failures that should stay silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Usage(usage) => Some(format!("Usage: {usage}")),
            Self::InvalidArgument(reason) => Some(format!("Invalid argument: {reason}")),
            Self::UnknownCommand(name) => Some(format!("Unknown command `{name}`.")),
            Self::UnknownMember(_) => Some("Could not find you in this server.".to_string()),
            Self::NotPermitted { command } => {
                Some(format!("Only moderators can run `{command}`."))
            }
            Self::Session(SessionError::NotFound(_)) => {
                Some("This menu has expired, run the command again.".to_string())
            }
            Self::Session(SessionError::InvalidTtl { max, .. }) => Some(format!(
                "Menus can stay open for at most {} seconds.",
                max.as_secs()
            )),
            Self::Session(_) => Some("Could not open the menu, try again.".to_string()),
            Self::Recruit(RecruitError::NotFound(_)) => {
                Some("This recruitment is no longer tracked, start a new one.".to_string())
            }
            Self::Recruit(RecruitError::Full { capacity }) => {
                Some(format!("This group is already full ({capacity} members)."))
            }
            Self::Recruit(RecruitError::AlreadyExists(_)) => None,
            Self::Schedule(ScheduleError::Overflow { max, .. }) => Some(format!(
                "That is too far ahead, the maximum delay is {} seconds.",
                max.as_secs()
            )),
            Self::Schedule(ScheduleError::ShutDown) => {
                Some("The bot is shutting down, try again later.".to_string())
            }
            Self::Gateway(_) => Some("The platform rejected the request, try again.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(SessionError::NotFound("m".into()).error_code(), "not_found");
        assert_eq!(RecruitError::Full { capacity: 4 }.error_code(), "full");
        let overflow = ScheduleError::Overflow {
            requested: Duration::from_secs(10),
            max: Duration::from_secs(5),
        };
        assert_eq!(overflow.error_code(), "overflow");
        assert_eq!(
            CommandError::from(overflow).error_code(),
            "overflow",
            "wrapped errors keep their code"
        );
    }

    #[test]
    fn expired_session_has_retry_message() {
        let err = CommandError::from(SessionError::NotFound("m1".into()));
        let text = err.user_message().unwrap();
        assert!(text.contains("run the command again"));
    }

    #[test]
    fn duplicate_recruitment_is_silent() {
        let err = CommandError::from(RecruitError::AlreadyExists("m1".into()));
        assert!(err.user_message().is_none());
    }
}
