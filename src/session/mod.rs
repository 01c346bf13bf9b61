//! Interactive session registry.
//!
//! A session is a time-bounded UI flow attached to one message the bot
//! posted and driven by exactly one actor (its owner). The registry owns every
//! session record and is the only code that changes a session's state:
//!
//! ```text
//! create ──▶ Active ──(TTL timer | complete | close | shutdown)──▶ Expired
//! ```
//!
//! Expiry is one-way. The record stays in the map, answering `NotFound` to
//! dispatches, until a purge sweep removes it.

mod collector;
mod handler;

pub use handler::{HandlerOutcome, InteractionEvent, SessionContext, SessionHandler, View};

use crate::config::SessionsConfig;
use crate::error::SessionError;
use crate::gateway::{ChannelId, Gateway, MessageId, UserId};
use crate::metrics;
use chrono::{DateTime, Utc};
use collector::InteractionCollector;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
}

/// Why a session stopped being Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireReason {
    Timeout,
    /// The owner finished the flow.
    Completed,
    Closed,
    Shutdown,
}

impl ExpireReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Queued for the session's handler.
    Delivered,
    /// Actor is not the owner. Callers must not reply.
    Ignored,
}

/// Where a session lives: the message it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOrigin {
    pub channel: ChannelId,
    pub message: MessageId,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub mailbox_capacity: usize,
}

impl From<&SessionsConfig> for SessionLimits {
    fn from(config: &SessionsConfig) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            max_ttl: config.max_ttl(),
            mailbox_capacity: config.mailbox_capacity,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&SessionsConfig::default())
    }
}

/// Point-in-time view of a session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: MessageId,
    pub channel: ChannelId,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub state: SessionState,
}

struct SessionEntry {
    channel: ChannelId,
    owner: UserId,
    created_at: DateTime<Utc>,
    ttl: Duration,
    state: SessionState,
    expired_at: Option<Instant>,
    mailbox: mpsc::Sender<InteractionEvent>,
    status: watch::Sender<SessionState>,
    ttl_timer: Option<AbortHandle>,
}

struct RegistryInner {
    sessions: DashMap<MessageId, SessionEntry>,
    gateway: Arc<dyn Gateway>,
    limits: SessionLimits,
}

impl RegistryInner {
    fn check_ttl(&self, ttl: Duration) -> Result<(), SessionError> {
        if ttl.is_zero() || ttl > self.limits.max_ttl {
            return Err(SessionError::InvalidTtl {
                requested: ttl,
                max: self.limits.max_ttl,
            });
        }
        Ok(())
    }

    fn expire(&self, id: &str, reason: ExpireReason) -> bool {
        let timer = {
            let Some(mut entry) = self.sessions.get_mut(id) else {
                return false;
            };
            if entry.state == SessionState::Expired {
                return false;
            }
            entry.state = SessionState::Expired;
            entry.expired_at = Some(Instant::now());
            let _ = entry.status.send(SessionState::Expired);
            entry.ttl_timer.take()
        };

        // The timer task is the caller on timeout; it must not abort itself.
        if reason != ExpireReason::Timeout {
            if let Some(timer) = timer {
                timer.abort();
            }
        }

        metrics::record_session_expired(reason.as_str());
        info!(session = %id, reason = reason.as_str(), "Session expired");
        true
    }
}

/// Owner of all interactive sessions.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn Gateway>, limits: SessionLimits) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                gateway,
                limits,
            }),
        }
    }

    /// Post the handler's initial view to `channel` and start a session on it.
    ///
    /// `ttl` defaults to the configured session TTL.
    pub async fn open(
        &self,
        channel: ChannelId,
        owner: UserId,
        ttl: Option<Duration>,
        handler: Box<dyn SessionHandler>,
    ) -> Result<MessageId, SessionError> {
        let ttl = ttl.unwrap_or(self.inner.limits.default_ttl);
        self.inner.check_ttl(ttl)?;

        let message = self
            .inner
            .gateway
            .send(&channel, handler.render(View::Live))
            .await?;
        self.create(SessionOrigin { channel, message }, owner, ttl, handler)
    }

    /// Start an Active session keyed by the originating message.
    pub fn create(
        &self,
        origin: SessionOrigin,
        owner: UserId,
        ttl: Duration,
        handler: Box<dyn SessionHandler>,
    ) -> Result<MessageId, SessionError> {
        self.inner.check_ttl(ttl)?;
        let id = origin.message.clone();

        match self.inner.sessions.entry(id.clone()) {
            Entry::Occupied(_) => return Err(SessionError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                let (mailbox_tx, mailbox_rx) =
                    mpsc::channel(self.inner.limits.mailbox_capacity.max(1));
                let (status_tx, status_rx) = watch::channel(SessionState::Active);

                let ctx = SessionContext {
                    session: id.clone(),
                    channel: origin.channel.clone(),
                    owner: owner.clone(),
                    gateway: Arc::clone(&self.inner.gateway),
                };
                let collector = InteractionCollector::new(
                    ctx,
                    handler,
                    mailbox_rx,
                    status_rx,
                    Arc::downgrade(&self.inner),
                );
                tokio::spawn(collector.run());

                let ttl_timer = spawn_ttl_timer(Arc::downgrade(&self.inner), id.clone(), ttl);

                slot.insert(SessionEntry {
                    channel: origin.channel,
                    owner: owner.clone(),
                    created_at: Utc::now(),
                    ttl,
                    state: SessionState::Active,
                    expired_at: None,
                    mailbox: mailbox_tx,
                    status: status_tx,
                    ttl_timer: Some(ttl_timer),
                });
            }
        }

        metrics::record_session_created();
        info!(session = %id, owner = %owner, ttl_ms = ttl.as_millis() as u64, "Session created");
        Ok(id)
    }

    /// Route an interaction to its session.
    ///
    /// Events from anyone but the owner of a known session are dropped and
    /// reported as [`Dispatch::Ignored`], whatever the session's state.
    /// Absent sessions, and expired ones pressed by their owner, yield
    /// `NotFound`.
    pub fn dispatch(&self, event: InteractionEvent) -> Result<Dispatch, SessionError> {
        let id = event.session.clone();
        let Some(entry) = self.inner.sessions.get(&id) else {
            metrics::record_interaction("not_found");
            return Err(SessionError::NotFound(id));
        };
        // Non-owners learn nothing, not even that the session has expired.
        if event.actor != entry.owner {
            debug!(session = %id, actor = %event.actor, "Ignoring interaction from non-owner");
            metrics::record_interaction("ignored");
            return Ok(Dispatch::Ignored);
        }
        if entry.state == SessionState::Expired {
            metrics::record_interaction("not_found");
            return Err(SessionError::NotFound(id));
        }

        match entry.mailbox.try_send(event) {
            Ok(()) => Ok(Dispatch::Delivered),
            Err(TrySendError::Full(_)) => {
                metrics::record_interaction("busy");
                Err(SessionError::Busy(id))
            }
            Err(TrySendError::Closed(_)) => Err(SessionError::NotFound(id)),
        }
    }

    /// Close a session explicitly.
    ///
    /// Returns `false` if the session is unknown or already expired.
    pub fn expire(&self, id: &str) -> bool {
        self.inner.expire(id, ExpireReason::Closed)
    }

    pub fn state(&self, id: &str) -> Option<SessionState> {
        self.inner.sessions.get(id).map(|e| e.state)
    }

    pub fn info(&self, id: &str) -> Option<SessionInfo> {
        self.inner.sessions.get(id).map(|e| SessionInfo {
            id: e.key().clone(),
            channel: e.channel.clone(),
            owner: e.owner.clone(),
            created_at: e.created_at,
            ttl: e.ttl,
            state: e.state,
        })
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .sessions
            .iter()
            .filter(|e| e.state == SessionState::Active)
            .count()
    }

    /// Number of records, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    /// Drop records that have been expired for at least `older_than`.
    pub fn purge_expired(&self, older_than: Duration) -> usize {
        let now = Instant::now();
        let before = self.inner.sessions.len();
        self.inner.sessions.retain(|_, entry| match entry.expired_at {
            Some(at) => now.duration_since(at) < older_than,
            None => true,
        });
        before.saturating_sub(self.inner.sessions.len())
    }

    /// Expire every Active session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let active: Vec<MessageId> = self
            .inner
            .sessions
            .iter()
            .filter(|e| e.state == SessionState::Active)
            .map(|e| e.key().clone())
            .collect();

        active
            .iter()
            .filter(|id| self.inner.expire(id, ExpireReason::Shutdown))
            .count()
    }
}

fn spawn_ttl_timer(registry: Weak<RegistryInner>, id: MessageId, ttl: Duration) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Some(registry) = registry.upgrade() {
            registry.expire(&id, ExpireReason::Timeout);
        }
    })
    .abort_handle()
}
