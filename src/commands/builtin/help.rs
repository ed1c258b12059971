//! Help command: browse commands by category.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::BotResult;
use crate::transport::{Reply, RichMessage};

use super::super::registry::RegisteredCommand;
use super::super::traits::Command;
use super::super::types::{CommandArgs, ExecutionContext};
use super::BUILTIN_CATEGORY;

const HELP_COLOR: u32 = 0x00ff00;
const UNCATEGORIZED: &str = "uncategorized";

/// Lists categories, the commands in a category, or one command's help.
pub struct HelpCommand;

/// Category label a command is listed under, lowercased.
fn category_of(command: &RegisteredCommand) -> String {
    if !command.is_dynamic() {
        return BUILTIN_CATEGORY.to_string();
    }
    command
        .definition
        .category
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

impl HelpCommand {
    async fn overview(&self, ctx: &ExecutionContext, visible: &[Arc<RegisteredCommand>]) -> Reply {
        let mut categories = BTreeSet::new();
        categories.insert(BUILTIN_CATEGORY.to_string());

        match ctx.registry.categories().await {
            Ok(stored) => categories.extend(stored.iter().map(|c| c.to_lowercase())),
            Err(e) => {
                warn!(error = %e, "Failed to list categories, using loaded commands");
                categories.extend(
                    visible
                        .iter()
                        .filter_map(|c| c.definition.category.as_deref())
                        .map(str::to_lowercase),
                );
            }
        }
        if visible
            .iter()
            .any(|c| c.is_dynamic() && c.definition.category.is_none())
        {
            categories.insert(UNCATEGORIZED.to_string());
        }

        let mut message = RichMessage::new()
            .title("Help")
            .description(format!(
                "Use `{}help <category>` to list commands, or `{}help <command>` for details.",
                ctx.prefix, ctx.prefix
            ))
            .color(HELP_COLOR);

        for category in &categories {
            let count = visible
                .iter()
                .filter(|c| category_of(c) == *category)
                .count();
            if count > 0 {
                message = message.field(category.clone(), format!("{} commands", count), true);
            }
        }

        message.into()
    }

    fn category(&self, ctx: &ExecutionContext, category: &str, commands: &[Arc<RegisteredCommand>]) -> Reply {
        let mut message = RichMessage::new()
            .title(format!("Help: {}", category))
            .color(HELP_COLOR);

        for command in commands {
            let help = if command.definition.help_text.is_empty() {
                "(no help text)"
            } else {
                command.definition.help_text.as_str()
            };
            message = message.field(format!("{}{}", ctx.prefix, command.name()), help, false);
        }

        message.into()
    }

    fn command(&self, ctx: &ExecutionContext, command: &RegisteredCommand) -> Reply {
        let definition = &command.definition;
        let help = if definition.help_text.is_empty() {
            "(no help text)"
        } else {
            definition.help_text.as_str()
        };

        RichMessage::new()
            .title(format!("{}{}", ctx.prefix, definition.name))
            .description(help)
            .color(HELP_COLOR)
            .field("Category", category_of(command), true)
            .field(
                "Admin only",
                if definition.requires_admin { "yes" } else { "no" },
                true,
            )
            .into()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help_text(&self) -> &'static str {
        "List commands by category, or show help for one command"
    }

    async fn execute(&self, ctx: &ExecutionContext, args: CommandArgs) -> BotResult<Reply> {
        let visible: Vec<_> = ctx
            .registry
            .list()
            .into_iter()
            .filter(|c| ctx.is_admin || !c.requires_admin())
            .collect();

        let Some(topic) = args.positional(0) else {
            return Ok(self.overview(ctx, &visible).await);
        };
        let topic = topic.trim().to_lowercase();

        let in_category: Vec<_> = visible
            .iter()
            .filter(|c| category_of(c) == topic)
            .cloned()
            .collect();
        if !in_category.is_empty() {
            return Ok(self.category(ctx, &topic, &in_category));
        }

        let topic = topic.strip_prefix(ctx.prefix.as_str()).unwrap_or(&topic);
        if let Some(command) = visible.iter().find(|c| c.name() == topic) {
            return Ok(self.command(ctx, command));
        }

        Ok(Reply::text(format!(
            ":warning: No category or command named '{}'",
            topic
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_test_context, create_test_registry};
    use super::*;
    use crate::commands::CommandDefinition;
    use crate::store::CommandStore;

    fn topic(name: &str) -> CommandArgs {
        CommandArgs {
            positional: vec![name.to_string()],
            ..CommandArgs::default()
        }
    }

    async fn seed(registry: &Arc<crate::commands::CommandRegistry>) {
        let mut doge = CommandDefinition::dynamic("doge");
        doge.category = Some("memes".to_string());
        doge.help_text = "much wow".to_string();
        registry.add_or_replace(doge).await.unwrap();
        registry
            .add_or_replace(CommandDefinition::dynamic("loose"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_overview_lists_categories() {
        let registry = create_test_registry().await;
        seed(&registry).await;
        let ctx = create_test_context(&registry, "help", true);

        let reply = HelpCommand.execute(&ctx, CommandArgs::default()).await.unwrap();
        let names: Vec<&str> = reply
            .as_rich()
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["builtin", "memes", "uncategorized"]);
    }

    #[tokio::test]
    async fn test_categories_differing_in_case_are_merged() {
        let registry = create_test_registry().await;
        for (name, category) in [("doge", "Memes"), ("cat", "memes"), ("frog", "MEMES")] {
            let mut def = CommandDefinition::dynamic(name);
            def.category = Some(category.to_string());
            registry.store().insert(&def).await.unwrap();
        }
        registry.refresh().await.unwrap();
        let ctx = create_test_context(&registry, "help", true);

        let reply = HelpCommand.execute(&ctx, CommandArgs::default()).await.unwrap();
        let fields: Vec<(&str, &str)> = reply
            .as_rich()
            .unwrap()
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(fields, vec![("builtin", "4 commands"), ("memes", "3 commands")]);
    }

    #[tokio::test]
    async fn test_category_listing() {
        let registry = create_test_registry().await;
        seed(&registry).await;
        let ctx = create_test_context(&registry, "help", false);

        let reply = HelpCommand.execute(&ctx, topic("Memes")).await.unwrap();
        let rich = reply.as_rich().unwrap();
        assert_eq!(rich.fields.len(), 1);
        assert_eq!(rich.fields[0].name, ">doge");
        assert_eq!(rich.fields[0].value, "much wow");
    }

    #[tokio::test]
    async fn test_admin_commands_hidden_from_members() {
        let registry = create_test_registry().await;
        let ctx = create_test_context(&registry, "help", false);

        let reply = HelpCommand.execute(&ctx, topic("builtin")).await.unwrap();
        let names: Vec<&str> = reply
            .as_rich()
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec![">help", ">ping"]);
    }

    #[tokio::test]
    async fn test_single_command() {
        let registry = create_test_registry().await;
        let ctx = create_test_context(&registry, "help", true);

        let reply = HelpCommand.execute(&ctx, topic(">dyncmd")).await.unwrap();
        let rich = reply.as_rich().unwrap();
        assert_eq!(rich.title.as_deref(), Some(">dyncmd"));
        assert!(rich.fields.iter().any(|f| f.name == "Admin only" && f.value == "yes"));
    }

    #[tokio::test]
    async fn test_unknown_topic() {
        let registry = create_test_registry().await;
        let ctx = create_test_context(&registry, "help", true);

        let reply = HelpCommand.execute(&ctx, topic("nothing")).await.unwrap();
        assert!(reply.as_text().unwrap().contains("nothing"));
    }
}
