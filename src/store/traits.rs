//! Command store trait definition.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::commands::CommandDefinition;
use crate::error::BotResult;

use super::model::{CommandField, CommandRow};

/// Durable CRUD for dynamic command rows.
///
/// Implementations must tolerate concurrent reads. Writes are serialized
/// by the registry, so implementations need not order them.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Create the current table if it does not exist. Safe on every start.
    async fn ensure_schema(&self) -> BotResult<()>;

    /// Copy rows out of the legacy table and drop it.
    ///
    /// Returns the number of rows copied; zero when there is no legacy table.
    async fn migrate_legacy(&self) -> BotResult<u64>;

    /// Every stored row, undecoded.
    async fn list_all(&self) -> BotResult<Vec<CommandRow>>;

    /// Distinct non-null categories.
    async fn list_categories(&self) -> BotResult<BTreeSet<String>>;

    /// Insert a new row. Fails if the name is taken.
    async fn insert(&self, def: &CommandDefinition) -> BotResult<()>;

    /// Insert a row, replacing any row stored under the same name.
    async fn upsert(&self, def: &CommandDefinition) -> BotResult<()>;

    /// Set one field of an existing row. Returns `false` when no row matched.
    ///
    /// Names match case-insensitively, including non-ASCII letters.
    async fn update(&self, name: &str, field: CommandField, value: Option<&str>)
        -> BotResult<bool>;

    /// Delete a row. Returns `false` when no row matched.
    async fn delete(&self, name: &str) -> BotResult<bool>;

    /// [`CommandStore::update`] with the field given by name.
    ///
    /// Unknown field names are rejected before any statement is built.
    async fn update_field(&self, name: &str, field: &str, value: Option<&str>) -> BotResult<bool> {
        let field: CommandField = field.parse()?;
        self.update(name, field, value).await
    }

    /// The row stored under `name`, matched case-insensitively.
    async fn fetch(&self, name: &str) -> BotResult<Option<CommandRow>> {
        let key = name.trim().to_lowercase();
        let rows = self.list_all().await?;
        Ok(rows.into_iter().find(|row| {
            row.name
                .as_deref()
                .is_some_and(|stored| stored.trim().to_lowercase() == key)
        }))
    }

    /// Schema creation followed by legacy migration.
    async fn initialize(&self) -> BotResult<u64> {
        self.ensure_schema().await?;
        self.migrate_legacy().await
    }
}
