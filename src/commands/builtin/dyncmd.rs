//! Dynamic command administration: `dyncmd set` and `dyncmd del`.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{BotError, BotResult, CommandErrorKind};
use crate::store::parse_bool_lenient;
use crate::transport::{Reply, RichMessage};

use super::super::definition::{normalize_name, CommandDefinition};
use super::super::traits::Command;
use super::super::types::{CommandArgs, ExecutionContext, Switches};

const USAGE_COLOR: u32 = 0xffcc00;

/// Creates, edits and deletes dynamic commands.
///
/// The only chat entry point that writes to the command store.
pub struct DynCmdCommand;

impl DynCmdCommand {
    fn usage(prefix: &str) -> Reply {
        RichMessage::new()
            .title("DynCmd Usage")
            .color(USAGE_COLOR)
            .field(
                "Create/Modify",
                format!("`{}dyncmd set <name> [options]`", prefix),
                false,
            )
            .field("Delete", format!("`{}dyncmd del <name>`", prefix), false)
            .field(
                "Options",
                "`-a, --admin <true|false>\n-c, --category <category>\n-h, --helptext <help text>\n-t, --title <title>\n-b, --body <body>\n-i, --imageurl <image URL>`",
                false,
            )
            .into()
    }

    async fn set(&self, ctx: &ExecutionContext, name: &str, switches: Switches) -> BotResult<Reply> {
        let registry = &ctx.registry;
        let name = normalize_name(name)?;

        if registry.is_builtin(&name) {
            return Ok(Reply::text(
                ":x: You cannot create a dynamic command with the same name as a builtin command",
            ));
        }

        let mut results = registry
            .modify(&name, move |definition| apply_switches(definition, &switches))
            .await
            .map_err(|e| {
                error!(request_id = %ctx.request_id, command = %name, error = %e, "Failed to save dynamic command");
                e
            })?;

        info!(
            request_id = %ctx.request_id,
            command = %name,
            by = ctx.sender_name(),
            "Dynamic command set"
        );
        if results.is_empty() {
            results.push(format!(":white_check_mark: Saved command '{}'", name));
        }

        Ok(Reply::text(results.join("\n")))
    }

    async fn delete(&self, ctx: &ExecutionContext, name: &str) -> BotResult<Reply> {
        let name = normalize_name(name)?;

        let removed = ctx.registry.remove(&name).await.map_err(|e| {
            error!(request_id = %ctx.request_id, command = %name, error = %e, "Failed to delete dynamic command");
            e
        })?;
        if !removed {
            return Err(BotError::command(CommandErrorKind::NotFound { name }));
        }

        info!(
            request_id = %ctx.request_id,
            command = %name,
            by = ctx.sender_name(),
            "Dynamic command deleted"
        );
        Ok(Reply::text(format!(":white_check_mark: Deleted command '{}'", name)))
    }
}

/// Apply recognized switches to the definition.
///
/// Returns one confirmation line per recognized switch and one warning
/// line per unrecognized switch; unknown switches never stop the rest.
fn apply_switches(definition: &mut CommandDefinition, switches: &Switches) -> Vec<String> {
    let mut results = Vec::with_capacity(switches.len());

    for (switch, value) in switches.iter() {
        match switch {
            "admin" => {
                let admin = parse_bool_lenient(value);
                definition.requires_admin = admin;
                results.push(format!(
                    ":white_check_mark: Requires Admin Privileges: {}",
                    admin
                ));
            }
            "category" => {
                definition.category = non_empty(value);
                results.push(format!(":white_check_mark: New Category: {}", value));
            }
            "helptext" => {
                definition.help_text = value.to_string();
                results.push(format!(":white_check_mark: New Help Text: {}", value));
            }
            "title" => {
                definition.payload.title = non_empty(value);
                results.push(format!(":white_check_mark: New Title: {}", value));
            }
            "body" => {
                definition.payload.body = non_empty(value);
                results.push(format!(":white_check_mark: New Body: {}", value));
            }
            "imageurl" => {
                definition.payload.image_url = non_empty(value);
                results.push(format!(":white_check_mark: New Image URL: {}", value));
            }
            other => {
                results.push(format!(
                    ":warning: Unrecognized switch {} with value {}",
                    other, value
                ));
            }
        }
    }

    results
}

/// Empty values clear optional fields.
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl Command for DynCmdCommand {
    fn name(&self) -> &'static str {
        "dyncmd"
    }

    fn help_text(&self) -> &'static str {
        "Create, modify or delete dynamic commands"
    }

    fn requires_admin(&self) -> bool {
        true
    }

    fn switch_aliases(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("a", "admin"),
            ("c", "category"),
            ("h", "helptext"),
            ("t", "title"),
            ("b", "body"),
            ("i", "imageurl"),
        ]
    }

    async fn execute(&self, ctx: &ExecutionContext, args: CommandArgs) -> BotResult<Reply> {
        let CommandArgs { positional, switches } = args;
        let (Some(sub_command), Some(name)) = (positional.first(), positional.get(1)) else {
            return Ok(Self::usage(&ctx.prefix));
        };

        match sub_command.to_lowercase().as_str() {
            "set" => self.set(ctx, name, switches).await,
            "del" => self.delete(ctx, name).await,
            _ => Ok(Self::usage(&ctx.prefix)),
        }
    }
}
