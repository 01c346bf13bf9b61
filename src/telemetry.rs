//! Telemetry utilities for command timing and span construction.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for an interactive session's collector task.
    pub fn session(id: &str, owner: &str) -> Span {
        info_span!("session", id = %id, owner = %owner)
    }

    /// Span for a command execution.
    pub fn command(name: &str, actor: &str, channel: &str) -> Span {
        info_span!("command", name = %name, actor = %actor, channel = %channel)
    }

    /// Span for a bulk mutation or restore batch.
    pub fn batch(mutation: &str, phase: &'static str, targets: usize) -> Span {
        info_span!("batch", mutation = %mutation, phase, targets)
    }

    /// Span for a fired deferred action.
    pub fn deferred(id: u64, kind: &str) -> Span {
        info_span!("deferred", id, kind = %kind)
    }
}
