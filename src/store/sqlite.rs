//! SQLite-backed command store.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row};
use tracing::{debug, info};

use crate::commands::CommandDefinition;
use crate::config::DatabaseConfig;
use crate::error::BotResult;

use super::model::{parse_bool_lenient, CommandField, CommandRow};
use super::traits::CommandStore;

/// Current commands table.
pub const COMMANDS_TABLE: &str = "commands_v2";
/// Table used before categories existed.
pub const LEGACY_COMMANDS_TABLE: &str = "commands";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS commands_v2 (\
    name TEXT PRIMARY KEY, helpText TEXT, category TEXT, admin BOOLEAN, \
    title TEXT, body TEXT, imageUrl TEXT)";

const SELECT_ALL: &str = "SELECT CAST(name AS TEXT) AS name, \
    CAST(helpText AS TEXT) AS help_text, \
    CAST(category AS TEXT) AS category, \
    CAST(admin AS TEXT) AS admin, \
    CAST(title AS TEXT) AS title, \
    CAST(body AS TEXT) AS body, \
    CAST(imageUrl AS TEXT) AS image_url \
    FROM commands_v2 ORDER BY name";

const INSERT_ROW: &str = "INSERT INTO commands_v2 \
    (name, helpText, category, admin, title, body, imageUrl) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

const COPY_LEGACY_ROWS: &str = "INSERT OR IGNORE INTO commands_v2 \
    (name, helpText, category, admin, title, body, imageUrl) \
    SELECT name, helpText, NULL, admin, title, body, imageUrl FROM commands";

const SELECT_NAMES: &str = "SELECT CAST(name AS TEXT) FROM commands_v2";

/// Stored names that normalize to the same key as `name`.
///
/// SQLite's `lower()` only folds ASCII, so case-insensitive matching is
/// done here and statements then target the exact stored names.
async fn matching_names<'e, E>(executor: E, name: &str) -> BotResult<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let key = name.trim().to_lowercase();
    let names = sqlx::query_scalar::<_, Option<String>>(SELECT_NAMES)
        .fetch_all(executor)
        .await?;

    Ok(names
        .into_iter()
        .flatten()
        .filter(|stored| stored.trim().to_lowercase() == key)
        .collect())
}

/// Command store on a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteCommandStore {
    pool: SqlitePool,
}

impl fmt::Debug for SqliteCommandStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCommandStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteCommandStore {
    /// Open (creating if missing) the database file named in the config.
    pub async fn connect(config: &DatabaseConfig) -> BotResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(path = %config.path.display(), "Command store opened");
        Ok(Self { pool })
    }

    /// A private in-memory database.
    ///
    /// Every SQLite memory connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> BotResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CommandStore for SqliteCommandStore {
    async fn ensure_schema(&self) -> BotResult<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        debug!(table = COMMANDS_TABLE, "Schema ensured");
        Ok(())
    }

    async fn migrate_legacy(&self) -> BotResult<u64> {
        let mut tx = self.pool.begin().await?;

        let legacy = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(LEGACY_COMMANDS_TABLE)
        .fetch_optional(&mut *tx)
        .await?;

        if legacy.is_none() {
            tx.rollback().await?;
            return Ok(0);
        }

        let copied = sqlx::query(COPY_LEGACY_ROWS)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DROP TABLE commands").execute(&mut *tx).await?;
        tx.commit().await?;

        info!(
            rows = copied,
            from = LEGACY_COMMANDS_TABLE,
            to = COMMANDS_TABLE,
            "Legacy commands migrated"
        );
        Ok(copied)
    }

    async fn list_all(&self) -> BotResult<Vec<CommandRow>> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(&self.pool).await?;

        let rows = rows
            .iter()
            .map(|row| -> Result<CommandRow, sqlx::Error> {
                Ok(CommandRow {
                    name: row.try_get("name")?,
                    help_text: row.try_get("help_text")?,
                    category: row.try_get("category")?,
                    admin: row.try_get("admin")?,
                    title: row.try_get("title")?,
                    body: row.try_get("body")?,
                    image_url: row.try_get("image_url")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    async fn list_categories(&self) -> BotResult<BTreeSet<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT CAST(category AS TEXT) FROM commands_v2 WHERE category IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect())
    }

    async fn insert(&self, def: &CommandDefinition) -> BotResult<()> {
        sqlx::query(INSERT_ROW)
            .bind(def.name.as_str())
            .bind(def.help_text.as_str())
            .bind(def.category.as_deref())
            .bind(def.requires_admin)
            .bind(def.payload.title.as_deref())
            .bind(def.payload.body.as_deref())
            .bind(def.payload.image_url.as_deref())
            .execute(&self.pool)
            .await?;
        debug!(command = %def.name, "Command row inserted");
        Ok(())
    }

    async fn upsert(&self, def: &CommandDefinition) -> BotResult<()> {
        let mut tx = self.pool.begin().await?;

        for stored in matching_names(&mut *tx, &def.name).await? {
            sqlx::query("DELETE FROM commands_v2 WHERE name = ?")
                .bind(stored.as_str())
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(INSERT_ROW)
            .bind(def.name.as_str())
            .bind(def.help_text.as_str())
            .bind(def.category.as_deref())
            .bind(def.requires_admin)
            .bind(def.payload.title.as_deref())
            .bind(def.payload.body.as_deref())
            .bind(def.payload.image_url.as_deref())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(command = %def.name, "Command row replaced");
        Ok(())
    }

    async fn update(
        &self,
        name: &str,
        field: CommandField,
        value: Option<&str>,
    ) -> BotResult<bool> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for stored in matching_names(&mut *tx, name).await? {
            let query = sqlx::query(field.update_statement());
            let query = match field {
                CommandField::Admin => query.bind(parse_bool_lenient(value.unwrap_or_default())),
                _ => query.bind(value),
            };
            affected += query
                .bind(stored.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        debug!(command = name, field = %field, affected, "Command row updated");
        Ok(affected > 0)
    }

    async fn delete(&self, name: &str) -> BotResult<bool> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for stored in matching_names(&mut *tx, name).await? {
            affected += sqlx::query("DELETE FROM commands_v2 WHERE name = ?")
                .bind(stored.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        debug!(command = name, affected, "Command row deleted");
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandPayload;

    async fn create_test_store() -> SqliteCommandStore {
        let store = SqliteCommandStore::in_memory().await.unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    async fn create_legacy_table(store: &SqliteCommandStore, rows: &[(&str, &str, bool)]) {
        sqlx::query(
            "CREATE TABLE commands (name TEXT PRIMARY KEY, helpText TEXT, admin BOOLEAN, \
             title TEXT, body TEXT, imageUrl TEXT)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        for (name, body, admin) in rows {
            sqlx::query(
                "INSERT INTO commands (name, helpText, admin, title, body, imageUrl) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(*name)
            .bind(format!("help for {}", name))
            .bind(*admin)
            .bind(format!("title {}", name))
            .bind(*body)
            .bind(Option::<&str>::None)
            .execute(store.pool())
            .await
            .unwrap();
        }
    }

    async fn table_exists(store: &SqliteCommandStore, table: &str) -> bool {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(store.pool())
        .await
        .unwrap()
        .is_some()
    }

    fn greet() -> CommandDefinition {
        CommandDefinition {
            help_text: "says hi".to_string(),
            category: Some("fun".to_string()),
            payload: CommandPayload {
                body: Some("Hello!".to_string()),
                ..CommandPayload::default()
            },
            ..CommandDefinition::dynamic("greet")
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let store = create_test_store().await;
        store.ensure_schema().await.unwrap();
        assert!(table_exists(&store, COMMANDS_TABLE).await);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        let def = rows[0].clone().into_definition().unwrap();
        assert_eq!(def, greet());
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();
        let result = store.insert(&greet()).await;
        assert!(matches!(result, Err(e) if e.is_storage()));
    }

    #[tokio::test]
    async fn test_upsert_replaces_row() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();

        let mut changed = greet();
        changed.payload.body = Some("Howdy!".to_string());
        changed.requires_admin = true;
        store.upsert(&changed).await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].clone().into_definition().unwrap(), changed);
    }

    #[tokio::test]
    async fn test_update_fields() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();

        assert!(store.update("greet", CommandField::Title, Some("Hi")).await.unwrap());
        assert!(store.update_field("GREET", "admin", Some("TRUE")).await.unwrap());
        assert!(store.update_field("greet", "category", None).await.unwrap());

        let def = store.list_all().await.unwrap()[0]
            .clone()
            .into_definition()
            .unwrap();
        assert_eq!(def.payload.title.as_deref(), Some("Hi"));
        assert!(def.requires_admin);
        assert!(def.category.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_field() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();

        let result = store.update_field("greet", "name", Some("other")).await;
        assert!(result.is_err());
        let result = store.update_field("greet", "body = 'x' --", Some("y")).await;
        assert!(result.is_err());

        let def = store.list_all().await.unwrap()[0]
            .clone()
            .into_definition()
            .unwrap();
        assert_eq!(def, greet());
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = create_test_store().await;
        assert!(!store.update("nope", CommandField::Body, Some("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();
        assert!(store.delete("greet").await.unwrap());
        assert!(!store.delete("greet").await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_categories() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();
        let mut other = CommandDefinition::dynamic("wave");
        other.category = Some("fun".to_string());
        store.insert(&other).await.unwrap();
        store.insert(&CommandDefinition::dynamic("bare")).await.unwrap();
        let mut memes = CommandDefinition::dynamic("doge");
        memes.category = Some("memes".to_string());
        store.insert(&memes).await.unwrap();

        let categories = store.list_categories().await.unwrap();
        assert_eq!(
            categories.into_iter().collect::<Vec<_>>(),
            vec!["fun".to_string(), "memes".to_string()]
        );
    }

    #[tokio::test]
    async fn test_migrate_legacy() {
        let store = create_test_store().await;
        create_legacy_table(
            &store,
            &[("alpha", "a body", false), ("beta", "b body", true), ("gamma", "c body", false)],
        )
        .await;

        let copied = store.migrate_legacy().await.unwrap();
        assert_eq!(copied, 3);
        assert!(!table_exists(&store, LEGACY_COMMANDS_TABLE).await);

        let defs: Vec<CommandDefinition> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.into_definition().unwrap())
            .collect();
        assert_eq!(defs.len(), 3);
        assert!(defs.iter().all(|d| d.category.is_none()));
        assert_eq!(defs[1].name, "beta");
        assert!(defs[1].requires_admin);
        assert_eq!(defs[1].help_text, "help for beta");
        assert_eq!(defs[1].payload.title.as_deref(), Some("title beta"));
        assert_eq!(defs[1].payload.body.as_deref(), Some("b body"));
        assert!(defs[1].payload.image_url.is_none());

        // Second run is a no-op.
        assert_eq!(store.migrate_legacy().await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_migrate_without_legacy_table() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();
        assert_eq!(store.migrate_legacy().await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_creates_and_migrates() {
        let store = SqliteCommandStore::in_memory().await.unwrap();
        create_legacy_table(&store, &[("alpha", "a body", false)]).await;

        assert_eq!(store.initialize().await.unwrap(), 1);
        assert_eq!(store.initialize().await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_reads_odd_affinities() {
        let store = create_test_store().await;
        sqlx::query("INSERT INTO commands_v2 (name, helpText, admin, body) VALUES ('num', 42, 'yes', 7)")
            .execute(store.pool())
            .await
            .unwrap();

        let def = store.list_all().await.unwrap()[0]
            .clone()
            .into_definition()
            .unwrap();
        assert_eq!(def.help_text, "42");
        assert!(def.requires_admin);
        assert_eq!(def.payload.body.as_deref(), Some("7"));
    }

    async fn insert_raw_name(store: &SqliteCommandStore, name: &str) {
        sqlx::query("INSERT INTO commands_v2 (name, helpText, title) VALUES (?, '', 'old')")
            .bind(name)
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_ascii_names_match_case_insensitively() {
        let store = create_test_store().await;
        insert_raw_name(&store, "Ämoji").await;

        assert!(store.update("ämoji", CommandField::Body, Some("b")).await.unwrap());
        let row = store.fetch("ÄMOJI").await.unwrap().unwrap();
        assert_eq!(row.body.as_deref(), Some("b"));

        assert!(store.delete("ämoji").await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_non_ascii_variant() {
        let store = create_test_store().await;
        insert_raw_name(&store, "Ämoji").await;

        store.upsert(&CommandDefinition::dynamic("ämoji")).await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("ämoji"));
        assert!(rows[0].title.is_none());
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let store = create_test_store().await;
        store.insert(&greet()).await.unwrap();
        assert!(store.fetch("wave").await.unwrap().is_none());
        assert!(store.fetch("GREET").await.unwrap().is_some());
    }
}
