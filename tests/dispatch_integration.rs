//! Integration tests for the command dispatcher.
//!
//! These tests run the full stack against an on-disk SQLite database
//! and a recording transport.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use dyncmd_bot::commands::CommandRegistry;
use dyncmd_bot::config::{DatabaseConfig, Settings};
use dyncmd_bot::dispatch::Dispatcher;
use dyncmd_bot::store::{CommandStore, SqliteCommandStore};
use dyncmd_bot::transport::{InboundMessage, MemoryTransport, Reply, Sender};

const WAIT: Duration = Duration::from_secs(5);

/// Test bot instance.
struct TestBot {
    dispatcher: Dispatcher,
    transport: Arc<MemoryTransport>,
    store: Arc<SqliteCommandStore>,
}

impl TestBot {
    /// Start a bot on the database in `dir`, running startup migration.
    async fn start(dir: &TempDir) -> Self {
        let store = Arc::new(open_store(dir).await);
        store.initialize().await.expect("Failed to initialize store");

        let registry = Arc::new(CommandRegistry::new(store.clone()));
        registry.refresh().await.expect("Initial refresh failed");

        let transport = Arc::new(MemoryTransport::new());
        let dispatcher = Dispatcher::new(&Settings::default(), registry, transport.clone());

        Self {
            dispatcher,
            transport,
            store,
        }
    }

    /// Send a message and wait for its handler to finish.
    ///
    /// Returns the reply, or `None` when the message was not a command.
    async fn say(&self, sender: Sender, text: &str) -> Option<Reply> {
        let before = self.transport.sent().len();
        let handle = self
            .dispatcher
            .dispatch(InboundMessage::new("general", Some(sender), text))?;
        handle.await.expect("Handler task panicked");

        let sent = self.transport.wait_for(before + 1, WAIT).await;
        sent.get(before).map(|(_, reply)| reply.clone())
    }

    async fn stop(self) {
        assert!(self.dispatcher.wait_for_drain(WAIT).await);
        self.store.close().await;
    }
}

async fn open_store(dir: &TempDir) -> SqliteCommandStore {
    let config = DatabaseConfig {
        path: dir.path().join("data").join("commands.db"),
        ..DatabaseConfig::default()
    };
    SqliteCommandStore::connect(&config)
        .await
        .expect("Failed to open store")
}

fn admin() -> Sender {
    Sender::new("1", "Admin").as_admin()
}

fn member() -> Sender {
    Sender::new("2", "Member")
}

#[tokio::test]
async fn test_create_and_invoke_dynamic_command() {
    let dir = TempDir::new().unwrap();
    let bot = TestBot::start(&dir).await;

    let reply = bot
        .say(admin(), r#">dyncmd set greet -h "says hi" -b "Hello!""#)
        .await
        .unwrap();
    let text = reply.as_text().unwrap();
    assert!(text.contains(":white_check_mark: New Help Text: says hi"));
    assert!(text.contains(":white_check_mark: New Body: Hello!"));

    let reply = bot.say(member(), ">greet").await.unwrap();
    let rich = reply.as_rich().unwrap();
    assert_eq!(rich.description.as_deref(), Some("Hello!"));
    assert_eq!(rich.footer.as_deref(), Some("Requested by Member"));

    let reply = bot.say(member(), ">help greet").await.unwrap();
    assert_eq!(reply.as_rich().unwrap().description.as_deref(), Some("says hi"));

    bot.stop().await;
}

#[tokio::test]
async fn test_commands_survive_restart() {
    let dir = TempDir::new().unwrap();

    let bot = TestBot::start(&dir).await;
    bot.say(admin(), ">dyncmd set rules -c info -t Rules -b \"Be nice\"")
        .await
        .unwrap();
    bot.stop().await;

    let bot = TestBot::start(&dir).await;
    let reply = bot.say(member(), ">RULES").await.unwrap();
    let rich = reply.as_rich().unwrap();
    assert_eq!(rich.title.as_deref(), Some("Rules"));
    assert_eq!(rich.description.as_deref(), Some("Be nice"));
    bot.stop().await;
}

#[tokio::test]
async fn test_legacy_table_migrated_on_startup() {
    let dir = TempDir::new().unwrap();

    {
        let store = open_store(&dir).await;
        sqlx::query(
            "CREATE TABLE commands (name TEXT PRIMARY KEY, helpText TEXT, admin BOOLEAN, \
             title TEXT, body TEXT, imageUrl TEXT)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO commands (name, helpText, admin, title, body, imageUrl) \
             VALUES ('oldie', 'from before', 0, 'Old', 'still here', NULL)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        store.close().await;
    }

    let bot = TestBot::start(&dir).await;
    let reply = bot.say(member(), ">oldie").await.unwrap();
    assert_eq!(reply.as_rich().unwrap().description.as_deref(), Some("still here"));

    let exists: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'commands'",
    )
    .fetch_optional(bot.store.pool())
    .await
    .unwrap();
    assert!(exists.is_none());
    bot.stop().await;
}

#[tokio::test]
async fn test_members_cannot_edit_commands() {
    let dir = TempDir::new().unwrap();
    let bot = TestBot::start(&dir).await;

    let reply = bot.say(member(), ">dyncmd set spam -b spam").await.unwrap();
    assert!(reply.as_text().unwrap().starts_with(":no_entry:"));
    assert!(bot.say(member(), ">spam").await.is_none());
    assert!(bot.store.list_all().await.unwrap().is_empty());

    bot.stop().await;
}

#[tokio::test]
async fn test_non_commands_are_ignored() {
    let dir = TempDir::new().unwrap();
    let bot = TestBot::start(&dir).await;

    assert!(bot.say(member(), "just chatting").await.is_none());
    assert!(bot.say(member(), ">doesnotexist").await.is_none());
    assert!(bot.transport.sent().is_empty());

    bot.stop().await;
}

#[tokio::test]
async fn test_builtins_are_protected() {
    let dir = TempDir::new().unwrap();
    let bot = TestBot::start(&dir).await;

    let reply = bot.say(admin(), ">dyncmd set ping -b hijacked").await.unwrap();
    assert!(reply.as_text().unwrap().starts_with(":x:"));

    let reply = bot.say(admin(), ">dyncmd del ping").await.unwrap();
    assert!(reply.as_text().unwrap().starts_with(":warning: No command found"));

    let reply = bot.say(member(), ">ping").await.unwrap();
    assert!(reply.as_text().unwrap().contains("Pong"));

    bot.stop().await;
}

#[tokio::test]
async fn test_delete_and_reload() {
    let dir = TempDir::new().unwrap();
    let bot = TestBot::start(&dir).await;

    bot.say(admin(), ">dyncmd set temp -b soon").await.unwrap();
    let reply = bot.say(admin(), ">dyncmd del temp").await.unwrap();
    assert_eq!(reply.as_text(), Some(":white_check_mark: Deleted command 'temp'"));
    assert!(bot.say(member(), ">temp").await.is_none());

    // Rows written behind the bot's back appear after a reload
    sqlx::query("INSERT INTO commands_v2 (name, helpText, admin, body) VALUES ('side', '', 'false', 'door')")
        .execute(bot.store.pool())
        .await
        .unwrap();
    assert!(bot.say(member(), ">side").await.is_none());

    let reply = bot.say(admin(), ">reload").await.unwrap();
    assert!(reply.as_text().unwrap().starts_with(":white_check_mark: Reloaded"));
    let reply = bot.say(member(), ">side").await.unwrap();
    assert_eq!(reply.as_rich().unwrap().description.as_deref(), Some("door"));

    bot.stop().await;
}
