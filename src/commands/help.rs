//! `help`: paginated command list.

use super::{Command, CommandContext};
use crate::error::CommandError;
use crate::gateway::MessageContent;
use crate::session::{HandlerOutcome, InteractionEvent, SessionContext, SessionHandler, View};
use async_trait::async_trait;

/// Page-flipping view over pre-rendered pages.
pub struct Paginator {
    title: String,
    pages: Vec<String>,
    page: usize,
}

impl Paginator {
    pub fn new(title: impl Into<String>, pages: Vec<String>) -> Self {
        let pages = if pages.is_empty() {
            vec![String::new()]
        } else {
            pages
        };
        Self {
            title: title.into(),
            pages,
            page: 0,
        }
    }
}

#[async_trait]
impl SessionHandler for Paginator {
    fn render(&self, view: View) -> MessageContent {
        let body = self.pages.get(self.page).map(String::as_str).unwrap_or("");
        let content = MessageContent::text(format!(
            "**{}**\n{}\n\nPage {}/{}",
            self.title,
            body,
            self.page + 1,
            self.pages.len()
        ))
        .with_button("prev", "Prev")
        .with_button("next", "Next")
        .with_button("close", "Close");

        match view {
            View::Live => content,
            View::Disabled => content.disabled(),
        }
    }

    async fn on_interaction(
        &mut self,
        event: &InteractionEvent,
        _ctx: &SessionContext,
    ) -> HandlerOutcome {
        match event.kind.as_str() {
            "prev" if self.page > 0 => {
                self.page -= 1;
                HandlerOutcome::Render
            }
            "next" if self.page + 1 < self.pages.len() => {
                self.page += 1;
                HandlerOutcome::Render
            }
            "close" => HandlerOutcome::Complete,
            _ => HandlerOutcome::Unchanged,
        }
    }
}

pub struct HelpCommand {
    pages: Vec<String>,
}

impl HelpCommand {
    pub const USAGE: &'static str = "help";
    pub const SUMMARY: &'static str = "Browse the command list";

    /// Split `(usage, summary)` entries into pages of `page_size` lines.
    pub fn new(entries: &[(&str, &str)], page_size: usize) -> Self {
        let pages = entries
            .chunks(page_size.max(1))
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|(usage, summary)| format!("`{usage}` {summary}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect();
        Self { pages }
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        Self::USAGE
    }

    fn summary(&self) -> &'static str {
        Self::SUMMARY
    }

    async fn execute(&self, ctx: &CommandContext, _args: &[String]) -> Result<(), CommandError> {
        let title = format!("{} commands", ctx.bot.config.bot.name);
        let paginator = Paginator::new(title, self.pages.clone());
        ctx.bot
            .sessions
            .open(ctx.channel.clone(), ctx.actor.clone(), None, Box::new(paginator))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_split_into_pages() {
        let entries = [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")];
        let help = HelpCommand::new(&entries, 3);
        assert_eq!(help.pages.len(), 2);
        assert_eq!(help.pages[1], "`d` 4");
    }

    #[test]
    fn render_shows_page_position() {
        let paginator = Paginator::new("cmds", vec!["one".into(), "two".into()]);
        let live = paginator.render(View::Live);
        assert!(live.text.contains("Page 1/2"));
        assert!(live.is_interactive());
        assert!(!paginator.render(View::Disabled).is_interactive());
    }
}
