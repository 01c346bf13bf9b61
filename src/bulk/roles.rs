//! Take a role away from everyone holding it.

use super::{Capture, Mutation};
use crate::error::GatewayError;
use crate::gateway::{EntityChange, EntityId, Gateway, RoleId};
use async_trait::async_trait;
use std::sync::Arc;

pub struct RoleRevoke {
    gateway: Arc<dyn Gateway>,
    role: RoleId,
}

impl RoleRevoke {
    pub fn new(gateway: Arc<dyn Gateway>, role: impl Into<RoleId>) -> Self {
        Self {
            gateway,
            role: role.into(),
        }
    }
}

#[async_trait]
impl Mutation for RoleRevoke {
    /// Nothing to remember: the role itself is the previous value.
    type Value = ();

    fn name(&self) -> &'static str {
        "role_revoke"
    }

    async fn capture(&self, target: &EntityId) -> Result<Capture<()>, GatewayError> {
        let member = self.gateway.fetch_entity(target).await?;
        if member.immutable {
            return Ok(Capture::Ineligible("immutable"));
        }
        if !member.roles.contains(&self.role) {
            return Ok(Capture::Ineligible("role not held"));
        }
        Ok(Capture::Eligible(()))
    }

    async fn mutate(&self, target: &EntityId) -> Result<(), GatewayError> {
        self.gateway
            .mutate_entity(target, EntityChange::RemoveRole(self.role.clone()))
            .await
    }

    async fn restore(&self, target: &EntityId, _previous: &()) -> Result<(), GatewayError> {
        self.gateway
            .mutate_entity(target, EntityChange::AddRole(self.role.clone()))
            .await
    }
}
