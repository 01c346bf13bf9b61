//! Keyed store of recruitment ("join") records.
//!
//! A record is created when someone posts a recruitment message and is keyed
//! by that message. Participants accumulate across unrelated button presses
//! from any member. Records have no TTL; they live until removed.

use crate::error::RecruitError;
use crate::gateway::{ChannelId, MessageId, RoleId, UserId};
use crate::metrics;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecruitmentRecord {
    pub message: MessageId,
    pub channel: ChannelId,
    pub role: RoleId,
    pub creator: UserId,
    pub participants: BTreeSet<UserId>,
    /// Maximum number of participants. `None` is unbounded.
    pub capacity: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl RecruitmentRecord {
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.participants.len() >= capacity)
    }
}

/// Recruitment records keyed by message id.
///
/// The store is the only writer of `participants`. Every operation completes
/// under a single shard lock, so concurrent joins on one record never lose
/// an update.
#[derive(Debug, Default)]
pub struct RecruitmentStore {
    records: DashMap<MessageId, RecruitmentRecord>,
}

impl RecruitmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a recruitment with the creator as first participant.
    pub fn create_record(
        &self,
        message: MessageId,
        channel: ChannelId,
        role: RoleId,
        creator: UserId,
        capacity: Option<usize>,
    ) -> Result<RecruitmentRecord, RecruitError> {
        match self.records.entry(message.clone()) {
            Entry::Occupied(_) => Err(RecruitError::AlreadyExists(message)),
            Entry::Vacant(slot) => {
                let record = RecruitmentRecord {
                    message: message.clone(),
                    channel,
                    role,
                    participants: BTreeSet::from([creator.clone()]),
                    creator,
                    capacity,
                    created_at: Utc::now(),
                };
                slot.insert(record.clone());
                info!(message = %message, role = %record.role, creator = %record.creator, "Recruitment created");
                Ok(record)
            }
        }
    }

    /// Add `actor` to the record. Joining twice is a no-op.
    pub fn join(&self, message: &str, actor: &str) -> Result<BTreeSet<UserId>, RecruitError> {
        let mut record = self.records.get_mut(message).ok_or_else(|| {
            metrics::record_recruit_join("not_found");
            RecruitError::NotFound(message.to_string())
        })?;

        if record.participants.contains(actor) {
            metrics::record_recruit_join("duplicate");
            return Ok(record.participants.clone());
        }
        if let Some(capacity) = record.capacity {
            if record.participants.len() >= capacity {
                metrics::record_recruit_join("full");
                return Err(RecruitError::Full { capacity });
            }
        }

        record.participants.insert(actor.to_string());
        metrics::record_recruit_join("joined");
        debug!(message = %message, actor = %actor, count = record.participants.len(), "Joined recruitment");
        Ok(record.participants.clone())
    }

    /// Remove `actor` from the record. Leaving when absent is a no-op.
    pub fn leave(&self, message: &str, actor: &str) -> Result<BTreeSet<UserId>, RecruitError> {
        let mut record = self
            .records
            .get_mut(message)
            .ok_or_else(|| RecruitError::NotFound(message.to_string()))?;
        if record.participants.remove(actor) {
            debug!(message = %message, actor = %actor, "Left recruitment");
        }
        Ok(record.participants.clone())
    }

    pub fn get(&self, message: &str) -> Result<RecruitmentRecord, RecruitError> {
        self.records
            .get(message)
            .map(|r| r.value().clone())
            .ok_or_else(|| RecruitError::NotFound(message.to_string()))
    }

    pub fn remove(&self, message: &str) -> Option<RecruitmentRecord> {
        self.records.remove(message).map(|(_, r)| r)
    }

    pub fn clear(&self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn names(set: &BTreeSet<UserId>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn store_with(message: &str, capacity: Option<usize>) -> RecruitmentStore {
        let store = RecruitmentStore::new();
        store
            .create_record(message.into(), "c1".into(), "r1".into(), "u1".into(), capacity)
            .unwrap();
        store
    }

    #[test]
    fn join_accumulates_and_is_idempotent() {
        let store = store_with("m1", None);
        assert_eq!(names(&store.get("m1").unwrap().participants), ["u1"]);

        assert_eq!(names(&store.join("m1", "u2").unwrap()), ["u1", "u2"]);
        assert_eq!(names(&store.join("m1", "u1").unwrap()), ["u1", "u2"]);
        assert_eq!(names(&store.join("m1", "u2").unwrap()), ["u1", "u2"]);
    }

    #[test]
    fn unknown_message_is_not_found() {
        let store = RecruitmentStore::new();
        assert_eq!(
            store.join("missing", "u1"),
            Err(RecruitError::NotFound("missing".into()))
        );
        assert!(store.get("missing").is_err());
        assert!(store.leave("missing", "u1").is_err());
    }

    #[test]
    fn duplicate_record_is_rejected() {
        let store = store_with("m1", None);
        let err = store
            .create_record("m1".into(), "c1".into(), "r2".into(), "u9".into(), None)
            .unwrap_err();
        assert_eq!(err, RecruitError::AlreadyExists("m1".into()));
        assert_eq!(store.get("m1").unwrap().role, "r1");
    }

    #[test]
    fn capacity_blocks_new_members_only() {
        let store = store_with("m1", Some(2));
        store.join("m1", "u2").unwrap();
        assert!(store.get("m1").unwrap().is_full());

        assert_eq!(store.join("m1", "u3"), Err(RecruitError::Full { capacity: 2 }));
        assert_eq!(names(&store.join("m1", "u2").unwrap()), ["u1", "u2"]);

        store.leave("m1", "u2").unwrap();
        assert_eq!(names(&store.join("m1", "u3").unwrap()), ["u1", "u3"]);
    }

    #[test]
    fn leave_is_idempotent_and_creator_may_leave() {
        let store = store_with("m1", None);
        store.join("m1", "u2").unwrap();
        assert_eq!(names(&store.leave("m1", "u1").unwrap()), ["u2"]);
        assert_eq!(names(&store.leave("m1", "u1").unwrap()), ["u2"]);
        assert_eq!(store.get("m1").unwrap().creator, "u1");
    }

    #[test]
    fn remove_and_clear() {
        let store = store_with("m1", None);
        store
            .create_record("m2".into(), "c1".into(), "r1".into(), "u1".into(), None)
            .unwrap();
        assert_eq!(store.len(), 2);

        assert!(store.remove("m1").is_some());
        assert!(store.remove("m1").is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_lose_no_updates() {
        let store = Arc::new(store_with("m1", None));
        let mut tasks = Vec::new();
        for n in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.join("m1", &format!("user{n}")).unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.get("m1").unwrap().participants.len(), 51);
    }
}
