//! Force one nickname onto every member.

use super::{Capture, Mutation};
use crate::error::GatewayError;
use crate::gateway::{EntityChange, EntityId, Gateway};
use async_trait::async_trait;
use std::sync::Arc;

pub struct NicknameOverride {
    gateway: Arc<dyn Gateway>,
    nickname: String,
}

impl NicknameOverride {
    pub fn new(gateway: Arc<dyn Gateway>, nickname: impl Into<String>) -> Self {
        Self {
            gateway,
            nickname: nickname.into(),
        }
    }
}

#[async_trait]
impl Mutation for NicknameOverride {
    /// Previous nickname; `None` means the member had none set.
    type Value = Option<String>;

    fn name(&self) -> &'static str {
        "nickname"
    }

    async fn capture(&self, target: &EntityId) -> Result<Capture<Self::Value>, GatewayError> {
        let member = self.gateway.fetch_entity(target).await?;
        if member.immutable {
            return Ok(Capture::Ineligible("immutable"));
        }
        Ok(Capture::Eligible(member.nickname))
    }

    async fn mutate(&self, target: &EntityId) -> Result<(), GatewayError> {
        self.gateway
            .mutate_entity(target, EntityChange::Nickname(Some(self.nickname.clone())))
            .await
    }

    async fn restore(&self, target: &EntityId, previous: &Self::Value) -> Result<(), GatewayError> {
        self.gateway
            .mutate_entity(target, EntityChange::Nickname(previous.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::BulkMutationCoordinator;
    use crate::gateway::{Member, MemoryGateway};
    use std::collections::BTreeSet;

    fn member(id: &str, nickname: Option<&str>, immutable: bool) -> Member {
        Member {
            id: id.into(),
            nickname: nickname.map(str::to_string),
            roles: BTreeSet::new(),
            immutable,
        }
    }

    #[tokio::test]
    async fn renames_and_restores_previous_nicknames() {
        let (gateway, _rx) = MemoryGateway::new(
            [
                member("owner", Some("Boss"), true),
                member("u1", Some("Ann"), false),
                member("u2", None, false),
            ],
            8,
        );
        let rename = NicknameOverride::new(gateway.clone(), "Potato");
        let targets = gateway.list_members().await.unwrap();

        let batch = BulkMutationCoordinator.apply_to_all(targets, &rename).await;
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.succeeded.len(), 2);
        assert_eq!(gateway.member("u1").unwrap().nickname.as_deref(), Some("Potato"));
        assert_eq!(gateway.member("owner").unwrap().nickname.as_deref(), Some("Boss"));

        BulkMutationCoordinator
            .restore_all(&batch.snapshot, &rename)
            .await;
        assert_eq!(gateway.member("u1").unwrap().nickname.as_deref(), Some("Ann"));
        assert_eq!(gateway.member("u2").unwrap().nickname, None);
    }
}
