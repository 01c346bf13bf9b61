//! The `Bot` aggregate.
//!
//! Owns the gateway handle and every registry. Built once at startup,
//! shared behind an `Arc`, and shut down explicitly on exit.

use crate::bulk::BulkMutationCoordinator;
use crate::config::Config;
use crate::gateway::Gateway;
use crate::recruit::RecruitmentStore;
use crate::scheduler::DeferredScheduler;
use crate::session::{SessionLimits, SessionRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Bot {
    pub config: Config,
    pub gateway: Arc<dyn Gateway>,
    pub sessions: SessionRegistry,
    pub recruitment: RecruitmentStore,
    pub scheduler: DeferredScheduler,
    pub bulk: BulkMutationCoordinator,
    tasks: Mutex<BackgroundTasks>,
}

#[derive(Default)]
struct BackgroundTasks {
    scheduler: Option<JoinHandle<()>>,
    purge: Option<JoinHandle<()>>,
}

/// What was cut short by [`Bot::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub sessions_closed: usize,
    pub actions_dropped: usize,
}

impl Bot {
    pub fn new(config: Config, gateway: Arc<dyn Gateway>) -> Arc<Self> {
        let sessions = SessionRegistry::new(
            Arc::clone(&gateway),
            SessionLimits::from(&config.sessions),
        );
        let scheduler = DeferredScheduler::new(config.scheduler.max_delay());
        Arc::new(Self {
            config,
            gateway,
            sessions,
            recruitment: RecruitmentStore::new(),
            scheduler,
            bulk: BulkMutationCoordinator::new(),
            tasks: Mutex::new(BackgroundTasks::default()),
        })
    }

    /// Spawn the scheduler driver and the session purge sweep.
    ///
    /// Calling `start` on a running bot does nothing.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.scheduler.is_some() {
            return;
        }

        let scheduler = self.scheduler.clone();
        tasks.scheduler = Some(tokio::spawn(async move { scheduler.run().await }));

        let sessions = self.sessions.clone();
        let every = self
            .config
            .sessions
            .purge_interval()
            .max(Duration::from_secs(1));
        let older_than = self.config.sessions.purge_after();
        tasks.purge = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let purged = sessions.purge_expired(older_than);
                if purged > 0 {
                    debug!(purged, "Purged expired sessions");
                }
            }
        }));

        info!(name = %self.config.bot.name, "Bot started");
    }

    /// Expire every session, drop pending actions and stop background tasks.
    pub async fn shutdown(&self) -> ShutdownReport {
        let report = ShutdownReport {
            sessions_closed: self.sessions.shutdown(),
            actions_dropped: self.scheduler.shutdown(),
        };

        let (scheduler, purge) = {
            let mut tasks = self.tasks.lock();
            (tasks.scheduler.take(), tasks.purge.take())
        };
        if let Some(purge) = purge {
            purge.abort();
        }
        if let Some(scheduler) = scheduler {
            if let Err(e) = scheduler.await {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }

        info!(
            sessions_closed = report.sessions_closed,
            actions_dropped = report.actions_dropped,
            "Bot stopped"
        );
        report
    }
}
