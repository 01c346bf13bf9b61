//! `roles`: self-service role picker.

use super::{Command, CommandContext};
use crate::error::{CommandError, GatewayError};
use crate::gateway::{EntityChange, EntityId, MessageContent, RoleId};
use crate::session::{HandlerOutcome, InteractionEvent, SessionContext, SessionHandler, View};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::warn;

/// Role picker state: roles held now plus the toggles not yet applied.
pub struct RoleMenu {
    member: EntityId,
    selectable: Vec<RoleId>,
    held: BTreeSet<RoleId>,
    toggled: BTreeSet<RoleId>,
    status: Option<String>,
}

impl RoleMenu {
    pub fn new(member: EntityId, selectable: Vec<RoleId>, held: BTreeSet<RoleId>) -> Self {
        Self {
            member,
            selectable,
            held,
            toggled: BTreeSet::new(),
            status: None,
        }
    }

    /// Whether `role` would be held once the pending toggles are applied.
    fn selected(&self, role: &str) -> bool {
        self.held.contains(role) != self.toggled.contains(role)
    }

    /// Apply pending toggles one role at a time; a failed role does not
    /// stop the others.
    async fn apply(&mut self, ctx: &SessionContext) -> String {
        let mut applied = 0;
        let mut failed = Vec::new();

        for role in std::mem::take(&mut self.toggled) {
            let adding = !self.held.contains(&role);
            let change = if adding {
                EntityChange::AddRole(role.clone())
            } else {
                EntityChange::RemoveRole(role.clone())
            };
            match ctx.gateway.mutate_entity(&self.member, change).await {
                Ok(()) => {
                    if adding {
                        self.held.insert(role);
                    } else {
                        self.held.remove(&role);
                    }
                    applied += 1;
                }
                Err(e) => {
                    warn!(member = %self.member, role = %role, error = %e, "Failed to update role");
                    failed.push(role);
                }
            }
        }

        if failed.is_empty() {
            format!("Applied {applied} change(s).")
        } else {
            format!(
                "Applied {applied} change(s), could not update: {}.",
                failed.join(", ")
            )
        }
    }
}

#[async_trait]
impl SessionHandler for RoleMenu {
    fn render(&self, view: View) -> MessageContent {
        let mut lines = vec!["Pick your roles:".to_string()];
        for role in &self.selectable {
            let mark = if self.selected(role) { "x" } else { " " };
            lines.push(format!("[{mark}] {role}"));
        }
        if let Some(status) = &self.status {
            lines.push(String::new());
            lines.push(status.clone());
        }

        let mut content = MessageContent::text(lines.join("\n"));
        for role in &self.selectable {
            content = content.with_button(format!("toggle:{role}"), role.clone());
        }
        let content = content
            .with_button("confirm", "Apply")
            .with_button("cancel", "Cancel");

        match view {
            View::Live => content,
            View::Disabled => content.disabled(),
        }
    }

    async fn on_interaction(
        &mut self,
        event: &InteractionEvent,
        ctx: &SessionContext,
    ) -> HandlerOutcome {
        match (event.kind.as_str(), event.data.as_deref()) {
            ("toggle", Some(role)) if self.selectable.iter().any(|r| r == role) => {
                if !self.toggled.remove(role) {
                    self.toggled.insert(role.to_string());
                }
                HandlerOutcome::Render
            }
            ("confirm", _) => {
                self.status = Some(self.apply(ctx).await);
                HandlerOutcome::Complete
            }
            ("cancel", _) => {
                self.toggled.clear();
                self.status = Some("Cancelled, nothing changed.".to_string());
                HandlerOutcome::Complete
            }
            _ => HandlerOutcome::Unchanged,
        }
    }
}

pub struct RolesCommand {
    selectable: Vec<RoleId>,
}

impl RolesCommand {
    pub fn new(selectable: Vec<RoleId>) -> Self {
        Self { selectable }
    }
}

#[async_trait]
impl Command for RolesCommand {
    fn name(&self) -> &'static str {
        "roles"
    }

    fn usage(&self) -> &'static str {
        "roles"
    }

    fn summary(&self) -> &'static str {
        "Pick your own roles"
    }

    async fn execute(&self, ctx: &CommandContext, _args: &[String]) -> Result<(), CommandError> {
        if self.selectable.is_empty() {
            return Err(CommandError::InvalidArgument(
                "no self-assignable roles are configured".to_string(),
            ));
        }

        let member = match ctx.bot.gateway.fetch_entity(&ctx.actor).await {
            Ok(member) => member,
            Err(GatewayError::NotFound(_)) => {
                return Err(CommandError::UnknownMember(ctx.actor.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let menu = RoleMenu::new(member.id, self.selectable.clone(), member.roles);
        ctx.bot
            .sessions
            .open(ctx.channel.clone(), ctx.actor.clone(), None, Box::new(menu))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Gateway, Member, MemoryGateway};
    use std::sync::Arc;

    fn ctx(gateway: Arc<MemoryGateway>) -> SessionContext {
        SessionContext {
            session: "m1".into(),
            channel: "c1".into(),
            owner: "u1".into(),
            gateway,
        }
    }

    fn menu() -> RoleMenu {
        RoleMenu::new(
            "u1".into(),
            vec!["gamer".into(), "artist".into(), "reader".into()],
            ["reader".to_string()].into(),
        )
    }

    #[tokio::test]
    async fn toggles_apply_per_role_on_confirm() {
        let member = Member {
            id: "u1".into(),
            nickname: None,
            roles: ["reader".to_string()].into(),
            immutable: false,
        };
        let (gateway, _rx) = MemoryGateway::new([member], 8);
        let ctx = ctx(gateway.clone());
        let mut menu = menu();

        for id in ["toggle:gamer", "toggle:reader", "toggle:unknown"] {
            menu.on_interaction(&InteractionEvent::from_component("m1", "u1", id), &ctx)
                .await;
        }
        assert!(menu.render(View::Live).text.contains("[x] gamer"));
        assert!(gateway.mutations().is_empty());

        let outcome = menu
            .on_interaction(&InteractionEvent::from_component("m1", "u1", "confirm"), &ctx)
            .await;
        assert_eq!(outcome, HandlerOutcome::Complete);
        let roles = gateway.fetch_entity(&"u1".to_string()).await.unwrap().roles;
        assert_eq!(roles, ["gamer".to_string()].into());
    }

    #[tokio::test]
    async fn failed_role_does_not_block_others() {
        let (gateway, _rx) = MemoryGateway::new([], 8);
        let ctx = ctx(gateway.clone());
        let mut menu = menu();

        menu.on_interaction(&InteractionEvent::from_component("m1", "u1", "toggle:gamer"), &ctx)
            .await;
        menu.on_interaction(&InteractionEvent::from_component("m1", "u1", "confirm"), &ctx)
            .await;

        let text = menu.render(View::Disabled).text;
        assert!(text.contains("could not update: gamer"));
        assert!(text.contains("[ ] gamer"));
    }

    #[tokio::test]
    async fn cancel_discards_pending_toggles() {
        let (gateway, _rx) = MemoryGateway::new([], 8);
        let ctx = ctx(gateway.clone());
        let mut menu = menu();

        menu.on_interaction(&InteractionEvent::from_component("m1", "u1", "toggle:artist"), &ctx)
            .await;
        let outcome = menu
            .on_interaction(&InteractionEvent::from_component("m1", "u1", "cancel"), &ctx)
            .await;

        assert_eq!(outcome, HandlerOutcome::Complete);
        assert!(menu.render(View::Live).text.contains("[ ] artist"));
        assert!(gateway.mutations().is_empty());
    }
}
