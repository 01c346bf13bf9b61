//! One-shot deferred actions.
//!
//! Actions sit in a priority queue ordered by `(fire_at, id)`; ids grow
//! monotonically, so actions due at the same instant fire in the order they
//! were scheduled. A single driver task ([`DeferredScheduler::run`]) sleeps
//! until the earliest deadline and is woken whenever the queue changes.
//!
//! The queue is in-memory only. Anything still pending at shutdown or on a
//! crash is lost; [`DeferredScheduler::shutdown`] logs what was dropped.

mod actions;

pub use actions::{DeliverAction, RestoreAction};

use crate::error::{ActionError, ScheduleError};
use crate::metrics;
use crate::telemetry::spans;
use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

pub type ActionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Send a message later.
    Deliver,
    /// Undo a bulk mutation from its snapshot.
    Restore,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deliver => "deliver",
            Self::Restore => "restore",
        }
    }
}

/// Work carried by a deferred action.
#[async_trait]
pub trait ActionHandler: Send + 'static {
    fn kind(&self) -> ActionKind;

    /// Human-readable description used when the action is logged.
    fn describe(&self) -> String;

    /// Run the action. Called at most once.
    async fn fire(self: Box<Self>) -> Result<(), ActionError>;
}

struct DeferredAction {
    id: ActionId,
    fire_at: Instant,
    kind: ActionKind,
    description: String,
    handler: Box<dyn ActionHandler>,
}

#[derive(Default)]
struct QueueState {
    queue: BinaryHeap<Reverse<(Instant, ActionId)>>,
    /// Live actions. Cancelled ids leave a stale heap entry behind.
    pending: HashMap<ActionId, DeferredAction>,
    closed: bool,
}

impl QueueState {
    /// Earliest live deadline, discarding stale heads.
    fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((at, id))) = self.queue.peek().copied() {
            if self.pending.contains_key(&id) {
                return Some(at);
            }
            self.queue.pop();
        }
        None
    }

    fn take_due(&mut self, now: Instant) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        while let Some(Reverse((at, id))) = self.queue.peek().copied() {
            if at > now {
                break;
            }
            self.queue.pop();
            if let Some(action) = self.pending.remove(&id) {
                due.push(action);
            }
        }
        due
    }
}

struct SchedulerInner {
    state: Mutex<QueueState>,
    wake: Notify,
    max_delay: Duration,
    next_id: AtomicU64,
}

/// Handle to the deferred action queue. Clones share the queue.
#[derive(Clone)]
pub struct DeferredScheduler {
    inner: Arc<SchedulerInner>,
}

impl DeferredScheduler {
    pub fn new(max_delay: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                max_delay,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn max_delay(&self) -> Duration {
        self.inner.max_delay
    }

    /// Check a delay against the configured maximum without scheduling.
    pub fn ensure_delay(&self, delay: Duration) -> Result<(), ScheduleError> {
        if delay > self.inner.max_delay {
            return Err(ScheduleError::Overflow {
                requested: delay,
                max: self.inner.max_delay,
            });
        }
        Ok(())
    }

    /// Queue `handler` to fire once after `delay`.
    pub fn schedule(
        &self,
        delay: Duration,
        handler: Box<dyn ActionHandler>,
    ) -> Result<ActionId, ScheduleError> {
        self.ensure_delay(delay)?;
        let fire_at = Instant::now()
            .checked_add(delay)
            .ok_or(ScheduleError::Overflow {
                requested: delay,
                max: self.inner.max_delay,
            })?;
        let kind = handler.kind();
        let description = handler.describe();

        let id = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(ScheduleError::ShutDown);
            }
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            state.queue.push(Reverse((fire_at, id)));
            state.pending.insert(
                id,
                DeferredAction {
                    id,
                    fire_at,
                    kind,
                    description: description.clone(),
                    handler,
                },
            );
            metrics::set_deferred_pending(state.pending.len());
            id
        };
        self.inner.wake.notify_one();

        metrics::record_deferred(kind.as_str(), "scheduled");
        info!(
            action = id,
            kind = kind.as_str(),
            delay_ms = delay.as_millis() as u64,
            description = %description,
            "Deferred action scheduled"
        );
        Ok(id)
    }

    /// Remove a pending action. Returns `false` if it already fired or is unknown.
    pub fn cancel(&self, id: ActionId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state.pending.remove(&id);
            metrics::set_deferred_pending(state.pending.len());
            removed
        };
        match removed {
            Some(action) => {
                self.inner.wake.notify_one();
                metrics::record_deferred(action.kind.as_str(), "cancelled");
                info!(action = id, description = %action.description, "Deferred action cancelled");
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Drive the queue until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) {
        info!("Deferred scheduler started");
        loop {
            let (due, next) = {
                let mut state = self.inner.state.lock();
                if state.closed {
                    break;
                }
                let due = state.take_due(Instant::now());
                metrics::set_deferred_pending(state.pending.len());
                (due, state.next_deadline())
            };

            if !due.is_empty() {
                tokio::spawn(fire_batch(due));
            }

            match next {
                Some(at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = self.inner.wake.notified() => {}
                    }
                }
                None => self.inner.wake.notified().await,
            }
        }
        info!("Deferred scheduler stopped");
    }

    /// Close the queue and drop everything still pending.
    ///
    /// Returns the number of actions dropped. Lost restorations are logged
    /// one by one since nothing will ever undo those mutations.
    pub fn shutdown(&self) -> usize {
        let dropped: Vec<DeferredAction> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.queue.clear();
            state.pending.drain().map(|(_, action)| action).collect()
        };
        metrics::set_deferred_pending(0);
        self.inner.wake.notify_one();

        let mut restores = 0;
        for action in &dropped {
            metrics::record_deferred(action.kind.as_str(), "dropped");
            if action.kind == ActionKind::Restore {
                restores += 1;
                warn!(
                    action = action.id,
                    description = %action.description,
                    "Pending restoration dropped at shutdown"
                );
            }
        }
        if !dropped.is_empty() {
            warn!(
                dropped = dropped.len(),
                restores, "Deferred actions lost at shutdown"
            );
        }
        dropped.len()
    }
}

/// Fire due actions in queue order, each isolated from the others.
async fn fire_batch(due: Vec<DeferredAction>) {
    for action in due {
        let DeferredAction {
            id,
            fire_at,
            kind,
            description,
            handler,
        } = action;
        let span = spans::deferred(id, kind.as_str());

        async {
            let late = Instant::now().saturating_duration_since(fire_at);
            debug!(late_ms = late.as_millis() as u64, description = %description, "Firing deferred action");

            match AssertUnwindSafe(handler.fire()).catch_unwind().await {
                Ok(Ok(())) => {
                    metrics::record_deferred(kind.as_str(), "fired");
                    info!(description = %description, "Deferred action fired");
                }
                Ok(Err(e)) => {
                    metrics::record_deferred(kind.as_str(), "failed");
                    warn!(error = %e, code = e.error_code(), description = %description, "Deferred action failed");
                }
                Err(_) => {
                    metrics::record_deferred(kind.as_str(), "panicked");
                    error!(description = %description, "Deferred action panicked");
                }
            }
        }
        .instrument(span)
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct Probe {
        tag: &'static str,
        behaviour: Behaviour,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl ActionHandler for Probe {
        fn kind(&self) -> ActionKind {
            ActionKind::Deliver
        }

        fn describe(&self) -> String {
            format!("probe {}", self.tag)
        }

        async fn fire(self: Box<Self>) -> Result<(), ActionError> {
            match self.behaviour {
                Behaviour::Succeed => {
                    self.log.lock().push(self.tag);
                    Ok(())
                }
                Behaviour::Fail => Err(ActionError::Partial {
                    failed: 1,
                    total: 1,
                }),
                Behaviour::Panic => panic!("probe {} exploded", self.tag),
            }
        }
    }

    struct Harness {
        scheduler: DeferredScheduler,
        log: Arc<Mutex<Vec<&'static str>>>,
        runner: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start() -> Self {
            let scheduler = DeferredScheduler::new(Duration::from_secs(60));
            let runner = tokio::spawn({
                let scheduler = scheduler.clone();
                async move { scheduler.run().await }
            });
            Self {
                scheduler,
                log: Arc::default(),
                runner,
            }
        }

        fn schedule(&self, ms: u64, tag: &'static str, behaviour: Behaviour) -> ActionId {
            let probe = Probe {
                tag,
                behaviour,
                log: self.log.clone(),
            };
            self.scheduler
                .schedule(Duration::from_millis(ms), Box::new(probe))
                .unwrap()
        }

        fn fired(&self) -> Vec<&'static str> {
            self.log.lock().clone()
        }
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_at_deadline() {
        let h = Harness::start();
        h.schedule(10, "a", Behaviour::Succeed);

        advance(5).await;
        assert!(h.fired().is_empty());
        assert_eq!(h.scheduler.pending(), 1);

        advance(10).await;
        assert_eq!(h.fired(), ["a"]);
        assert_eq!(h.scheduler.pending(), 0);

        advance(100).await;
        assert_eq!(h.fired(), ["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_action_never_fires() {
        let h = Harness::start();
        let id = h.schedule(10, "a", Behaviour::Succeed);

        assert!(h.scheduler.cancel(id));
        assert!(!h.scheduler.cancel(id));
        advance(20).await;
        assert!(h.fired().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_noop() {
        let h = Harness::start();
        let id = h.schedule(10, "a", Behaviour::Succeed);
        advance(20).await;
        assert!(!h.scheduler.cancel(id));
        assert!(!h.scheduler.cancel(999));
    }

    #[tokio::test(start_paused = true)]
    async fn same_deadline_fires_in_schedule_order() {
        let h = Harness::start();
        h.schedule(10, "first", Behaviour::Succeed);
        h.schedule(10, "second", Behaviour::Succeed);
        h.schedule(10, "third", Behaviour::Succeed);

        advance(20).await;
        assert_eq!(h.fired(), ["first", "second", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wakes_the_driver() {
        let h = Harness::start();
        h.schedule(1_000, "late", Behaviour::Succeed);
        advance(1).await;
        h.schedule(10, "early", Behaviour::Succeed);

        advance(20).await;
        assert_eq!(h.fired(), ["early"]);
        advance(1_000).await;
        assert_eq!(h.fired(), ["early", "late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_and_panics_are_isolated() {
        let h = Harness::start();
        h.schedule(10, "boom", Behaviour::Panic);
        h.schedule(10, "after-panic", Behaviour::Succeed);
        h.schedule(15, "error", Behaviour::Fail);
        h.schedule(20, "last", Behaviour::Succeed);

        advance(30).await;
        assert_eq!(h.fired(), ["after-panic", "last"]);
        assert!(!h.runner.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_is_rejected_synchronously() {
        let h = Harness::start();
        let probe = Probe {
            tag: "far",
            behaviour: Behaviour::Succeed,
            log: h.log.clone(),
        };
        let err = h
            .scheduler
            .schedule(Duration::from_secs(61), Box::new(probe))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Overflow { .. }));
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_pending_and_stops_driver() {
        let mut h = Harness::start();
        h.schedule(10, "a", Behaviour::Succeed);
        h.schedule(20, "b", Behaviour::Succeed);

        assert_eq!(h.scheduler.shutdown(), 2);
        (&mut h.runner).await.unwrap();

        advance(50).await;
        assert!(h.fired().is_empty());

        let probe = Probe {
            tag: "c",
            behaviour: Behaviour::Succeed,
            log: h.log.clone(),
        };
        let err = h
            .scheduler
            .schedule(Duration::from_millis(1), Box::new(probe))
            .unwrap_err();
        assert_eq!(err, ScheduleError::ShutDown);
    }
}
