//! Command registry for dispatching messages to handlers.
//!
//! The registry is a snapshot of builtins plus the rows of the command
//! store. Readers clone an `Arc` of the current map; a refresh builds a
//! complete new map and swaps it in, so a reader never observes a half
//! rebuilt index. A dispatch that cloned the old snapshot may finish
//! running a command that a concurrent refresh just removed.
//!
//! Every store write runs with its rebuild on a detached task under one
//! write gate, so the registry never falls behind a committed write.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{BotError, BotResult, CommandErrorKind, ValidationErrorKind};
use crate::store::{CommandField, CommandRow, CommandStore};
use crate::transport::Reply;

use super::builtin::{DynCmdCommand, HelpCommand, PingCommand, ReloadCommand};
use super::definition::{normalize_name, CommandDefinition, CommandKind};
use super::dynamic;
use super::traits::Command;
use super::types::{CommandArgs, ExecutionContext};

/// How a registered command is executed.
#[derive(Clone)]
pub enum CommandHandler {
    /// Code handler.
    Builtin(Arc<dyn Command>),
    /// Rendered from the definition payload.
    Dynamic,
}

/// A registry entry: definition plus handler.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub definition: CommandDefinition,
    pub handler: CommandHandler,
}

impl RegisteredCommand {
    fn builtin(command: Arc<dyn Command>) -> Self {
        Self {
            definition: command.definition(),
            handler: CommandHandler::Builtin(command),
        }
    }

    fn dynamic(definition: CommandDefinition) -> Self {
        Self {
            definition,
            handler: CommandHandler::Dynamic,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.handler, CommandHandler::Dynamic)
    }

    pub fn requires_admin(&self) -> bool {
        self.definition.requires_admin
    }

    /// Switch aliases understood by the handler.
    pub fn switch_aliases(&self) -> &'static [(&'static str, &'static str)] {
        match &self.handler {
            CommandHandler::Builtin(command) => command.switch_aliases(),
            CommandHandler::Dynamic => &[],
        }
    }

    /// Handler-specific timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        match &self.handler {
            CommandHandler::Builtin(command) => command.timeout(),
            CommandHandler::Dynamic => None,
        }
    }

    /// Run the handler.
    pub async fn execute(&self, ctx: &ExecutionContext, args: CommandArgs) -> BotResult<Reply> {
        match &self.handler {
            CommandHandler::Builtin(command) => command.execute(ctx, args).await,
            CommandHandler::Dynamic => Ok(dynamic::render(&self.definition, ctx)),
        }
    }
}

/// Immutable name to command mapping.
pub type CommandMap = HashMap<String, Arc<RegisteredCommand>>;

/// Registry of all invocable commands.
pub struct CommandRegistry {
    builtins: Vec<Arc<dyn Command>>,
    store: Arc<dyn CommandStore>,
    snapshot: RwLock<Arc<CommandMap>>,
    /// Serializes store writes together with the refresh that follows them.
    write_gate: Mutex<()>,
}

impl CommandRegistry {
    /// Create a registry with the standard builtin commands.
    ///
    /// Only builtins are visible until the first [`refresh`](Self::refresh).
    pub fn new(store: Arc<dyn CommandStore>) -> Self {
        Self::with_builtins(store, Self::default_builtins())
    }

    /// Create a registry with a custom builtin set.
    pub fn with_builtins(store: Arc<dyn CommandStore>, builtins: Vec<Arc<dyn Command>>) -> Self {
        let snapshot = build_map(&builtins, Vec::new());

        info!(builtins = snapshot.len(), "Command registry initialized");

        Self {
            builtins,
            store,
            snapshot: RwLock::new(Arc::new(snapshot)),
            write_gate: Mutex::new(()),
        }
    }

    /// The builtin commands every bot carries.
    pub fn default_builtins() -> Vec<Arc<dyn Command>> {
        vec![
            Arc::new(HelpCommand),
            Arc::new(DynCmdCommand),
            Arc::new(ReloadCommand),
            Arc::new(PingCommand),
        ]
    }

    /// The backing command store.
    pub fn store(&self) -> &Arc<dyn CommandStore> {
        &self.store
    }

    /// Rebuild the whole mapping from builtins and the store.
    ///
    /// On a store read failure the previous mapping stays installed.
    /// Returns the number of registered commands.
    pub async fn refresh(&self) -> BotResult<usize> {
        let _gate = self.write_gate.lock().await;
        self.rebuild().await
    }

    /// Rebuild with the write gate already held.
    async fn rebuild(&self) -> BotResult<usize> {
        let rows = self.store.list_all().await.map_err(|e| {
            error!(error = %e, "Failed to load dynamic commands, keeping previous registry");
            e
        })?;

        let map = build_map(&self.builtins, rows);
        let total = map.len();
        let dynamic = map.values().filter(|c| c.is_dynamic()).count();
        *self.snapshot.write() = Arc::new(map);

        info!(
            total,
            builtins = total - dynamic,
            dynamic,
            "Command registry refreshed"
        );
        Ok(total)
    }

    /// The current mapping. Stays valid and unchanged after later refreshes.
    pub fn snapshot(&self) -> Arc<CommandMap> {
        Arc::clone(&self.snapshot.read())
    }

    /// Find a command by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        let key = name.trim().to_lowercase();
        self.snapshot.read().get(&key).cloned()
    }

    /// Whether any command, builtin or dynamic, has this name.
    pub fn is_command(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Whether the name resolves to a dynamic command.
    pub fn is_dynamic_command(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|c| c.is_dynamic())
    }

    /// Whether the name belongs to a builtin.
    pub fn is_builtin(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.builtins.iter().any(|b| b.name() == key)
    }

    /// All registered commands, sorted by name.
    pub fn list(&self) -> Vec<Arc<RegisteredCommand>> {
        let mut commands: Vec<_> = self.snapshot().values().cloned().collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    /// Distinct categories of stored commands.
    pub async fn categories(&self) -> BotResult<BTreeSet<String>> {
        self.store.list_categories().await
    }

    /// Persist a dynamic command, replacing any stored one of the same
    /// name, then refresh.
    ///
    /// Names of builtins are refused before the store is touched.
    pub async fn add_or_replace(self: &Arc<Self>, mut definition: CommandDefinition) -> BotResult<()> {
        definition.name = normalize_name(&definition.name)?;
        definition.kind = CommandKind::Dynamic;
        self.reject_builtin(&definition.name)?;

        let registry = Arc::clone(self);
        run_detached(async move {
            let _gate = registry.write_gate.lock().await;
            registry.store.upsert(&definition).await?;
            info!(command = %definition.name, "Dynamic command saved");
            registry.rebuild_after_write(&definition.name).await
        })
        .await
    }

    /// Load a dynamic command from the store, change it and save it back,
    /// then refresh.
    ///
    /// The whole read-modify-write runs under the write gate, so
    /// concurrent edits of the same command apply one after the other.
    /// A command that is not stored, or whose row is malformed, starts
    /// from defaults.
    pub async fn modify<F, R>(self: &Arc<Self>, name: &str, change: F) -> BotResult<R>
    where
        F: FnOnce(&mut CommandDefinition) -> R + Send + 'static,
        R: Send + 'static,
    {
        let name = normalize_name(name)?;
        self.reject_builtin(&name)?;

        let registry = Arc::clone(self);
        run_detached(async move {
            let _gate = registry.write_gate.lock().await;

            let mut definition = match registry.store.fetch(&name).await? {
                Some(row) => row.into_definition().unwrap_or_else(|e| {
                    warn!(command = %name, error = %e, "Stored command is malformed, starting over");
                    CommandDefinition::dynamic(name.clone())
                }),
                None => CommandDefinition::dynamic(name.clone()),
            };
            let outcome = change(&mut definition);
            definition.name = name.clone();
            definition.kind = CommandKind::Dynamic;

            registry.store.upsert(&definition).await?;
            info!(command = %name, "Dynamic command saved");
            registry.rebuild_after_write(&name).await?;
            Ok(outcome)
        })
        .await
    }

    /// Set a single field of a stored command, then refresh.
    ///
    /// Returns `false` when no such dynamic command is stored.
    pub async fn update_field(self: &Arc<Self>, name: &str, field: &str, value: Option<&str>) -> BotResult<bool> {
        let field: CommandField = field.parse()?;
        let name = normalize_name(name)?;
        self.reject_builtin(&name)?;

        let registry = Arc::clone(self);
        let value = value.map(str::to_string);
        run_detached(async move {
            let _gate = registry.write_gate.lock().await;
            let updated = registry.store.update(&name, field, value.as_deref()).await?;
            if updated {
                info!(command = %name, field = %field, "Dynamic command updated");
                registry.rebuild_after_write(&name).await?;
            }
            Ok(updated)
        })
        .await
    }

    /// Delete a stored command, then refresh.
    ///
    /// Builtins are never removed; for them this returns `false`.
    pub async fn remove(self: &Arc<Self>, name: &str) -> BotResult<bool> {
        let name = normalize_name(name)?;
        if self.is_builtin(&name) {
            warn!(command = %name, "Refusing to remove builtin command");
            return Ok(false);
        }

        let registry = Arc::clone(self);
        run_detached(async move {
            let _gate = registry.write_gate.lock().await;
            let removed = registry.store.delete(&name).await?;
            if removed {
                info!(command = %name, "Dynamic command deleted");
                registry.rebuild_after_write(&name).await?;
            }
            Ok(removed)
        })
        .await
    }

    /// Rebuild after a committed write.
    ///
    /// A failure here means the store is ahead of the registry; it is
    /// reported as a pending reload, not as a failed write.
    async fn rebuild_after_write(&self, name: &str) -> BotResult<()> {
        match self.rebuild().await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(command = %name, error = %e, "Write saved but registry rebuild failed");
                Err(BotError::command(CommandErrorKind::ReloadPending {
                    name: name.to_string(),
                }))
            }
        }
    }

    fn reject_builtin(&self, name: &str) -> BotResult<()> {
        if self.is_builtin(name) {
            return Err(BotError::validation(ValidationErrorKind::BuiltinCollision {
                name: name.to_string(),
            }));
        }
        Ok(())
    }
}

/// Run a store write on its own task.
///
/// The write and its rebuild finish even if the caller stops waiting.
async fn run_detached<T, Fut>(write: Fut) -> BotResult<T>
where
    Fut: Future<Output = BotResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(write).await.map_err(|e| {
        BotError::command(CommandErrorKind::ExecutionFailed {
            message: e.to_string(),
        })
    })?
}

/// Build a mapping: builtins first, then every decodable stored row.
fn build_map(builtins: &[Arc<dyn Command>], rows: Vec<CommandRow>) -> CommandMap {
    let mut map = CommandMap::new();

    for command in builtins {
        let entry = RegisteredCommand::builtin(Arc::clone(command));
        debug!(command = entry.name(), "Registering builtin command");
        map.insert(entry.name().to_string(), Arc::new(entry));
    }

    for row in rows {
        let raw_name = row.name.clone().unwrap_or_default();
        let definition = match row.into_definition() {
            Ok(definition) => definition,
            Err(e) => {
                warn!(command = %raw_name, error = %e, "Skipping malformed command row");
                continue;
            }
        };

        if let Some(existing) = map.get(&definition.name) {
            if existing.is_dynamic() {
                warn!(command = %definition.name, "Duplicate stored command, keeping the first");
            } else {
                warn!(command = %definition.name, "Stored command shadows a builtin, ignoring");
            }
            continue;
        }

        map.insert(
            definition.name.clone(),
            Arc::new(RegisteredCommand::dynamic(definition)),
        );
    }

    map
}
