//! Prometheus metrics collection for rallybot.
//!
//! - `rallybot_sessions_created_total` - Interactive sessions opened
//! - `rallybot_sessions_expired_total{reason}` - Sessions closed by TTL, completion or shutdown
//! - `rallybot_interactions_total{outcome}` - Component interactions by dispatch outcome
//! - `rallybot_recruit_joins_total{outcome}` - Recruitment join attempts
//! - `rallybot_deferred_actions_total{kind,event}` - Deferred action lifecycle
//! - `rallybot_bulk_targets_total{mutation,outcome}` - Per-entity bulk mutation outcomes
//! - `rallybot_command_duration_seconds{command}` - Command latency histogram

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Sessions
// ========================================================================

pub static SESSIONS_CREATED: OnceLock<IntCounter> = OnceLock::new();

pub static SESSIONS_EXPIRED: OnceLock<IntCounterVec> = OnceLock::new();

/// Sessions currently Active.
pub static SESSIONS_ACTIVE: OnceLock<IntGauge> = OnceLock::new();

pub static INTERACTIONS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Recruitment
// ========================================================================

pub static RECRUIT_JOINS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Deferred actions and bulk mutations
// ========================================================================

pub static DEFERRED_ACTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Actions waiting to fire.
pub static DEFERRED_PENDING: OnceLock<IntGauge> = OnceLock::new();

pub static BULK_TARGETS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Commands
// ========================================================================

pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(
                            error = %e,
                            concat!("Failed to register metric ", stringify!($metric))
                        );
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        concat!("Failed to create metric ", stringify!($metric))
                    );
                }
            }
        };
    }

    register!(
        SESSIONS_CREATED,
        IntCounter::new("rallybot_sessions_created_total", "Interactive sessions opened")
    );
    register!(
        SESSIONS_EXPIRED,
        IntCounterVec::new(
            Opts::new("rallybot_sessions_expired_total", "Interactive sessions closed"),
            &["reason"]
        )
    );
    register!(
        SESSIONS_ACTIVE,
        IntGauge::new("rallybot_sessions_active", "Interactive sessions currently active")
    );
    register!(
        INTERACTIONS,
        IntCounterVec::new(
            Opts::new("rallybot_interactions_total", "Component interactions by outcome"),
            &["outcome"]
        )
    );
    register!(
        RECRUIT_JOINS,
        IntCounterVec::new(
            Opts::new("rallybot_recruit_joins_total", "Recruitment join attempts"),
            &["outcome"]
        )
    );
    register!(
        DEFERRED_ACTIONS,
        IntCounterVec::new(
            Opts::new("rallybot_deferred_actions_total", "Deferred action lifecycle events"),
            &["kind", "event"]
        )
    );
    register!(
        DEFERRED_PENDING,
        IntGauge::new("rallybot_deferred_pending", "Deferred actions waiting to fire")
    );
    register!(
        BULK_TARGETS,
        IntCounterVec::new(
            Opts::new("rallybot_bulk_targets_total", "Per-entity bulk mutation outcomes"),
            &["mutation", "outcome"]
        )
    );
    register!(
        COMMAND_COUNTER,
        IntCounterVec::new(
            Opts::new("rallybot_command_total", "Commands processed by name"),
            &["command"]
        )
    );
    register!(
        COMMAND_LATENCY,
        HistogramVec::new(
            HistogramOpts::new("rallybot_command_duration_seconds", "Command latency by name")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
            &["command"]
        )
    );
    register!(
        COMMAND_ERRORS,
        IntCounterVec::new(
            Opts::new("rallybot_command_errors_total", "Command errors by name and kind"),
            &["command", "error"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

#[inline]
fn inc_vec(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

#[inline]
pub fn record_session_created() {
    if let Some(c) = SESSIONS_CREATED.get() {
        c.inc();
    }
    if let Some(g) = SESSIONS_ACTIVE.get() {
        g.inc();
    }
}

#[inline]
pub fn record_session_expired(reason: &str) {
    inc_vec(&SESSIONS_EXPIRED, &[reason]);
    if let Some(g) = SESSIONS_ACTIVE.get() {
        g.dec();
    }
}

#[inline]
pub fn record_interaction(outcome: &str) {
    inc_vec(&INTERACTIONS, &[outcome]);
}

#[inline]
pub fn record_recruit_join(outcome: &str) {
    inc_vec(&RECRUIT_JOINS, &[outcome]);
}

/// Record a deferred action event: `scheduled`, `cancelled`, `fired`, `failed`,
/// `panicked` or `dropped`.
#[inline]
pub fn record_deferred(kind: &str, event: &str) {
    inc_vec(&DEFERRED_ACTIONS, &[kind, event]);
}

#[inline]
pub fn set_deferred_pending(count: usize) {
    if let Some(g) = DEFERRED_PENDING.get() {
        g.set(count as i64);
    }
}

/// Record the outcome of a batch (`succeeded`, `failed`, `skipped`).
#[inline]
pub fn record_bulk(mutation: &str, outcome: &str, count: usize) {
    if let Some(c) = BULK_TARGETS.get() {
        c.with_label_values(&[mutation, outcome]).inc_by(count as u64);
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    inc_vec(&COMMAND_COUNTER, &[command]);
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn record_command_error(command: &str, error: &str) {
    inc_vec(&COMMAND_ERRORS, &[command, error]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_command("help", 0.001);
        record_bulk("nickname", "succeeded", 4);
        record_deferred("restore", "scheduled");

        let output = gather_metrics();
        assert!(output.contains("rallybot_command_total"));
        assert!(output.contains("rallybot_bulk_targets_total"));
    }
}
