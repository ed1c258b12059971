//! Dyncmd Bot - chat command dispatcher with runtime-editable commands.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dyncmd_bot::commands::CommandRegistry;
use dyncmd_bot::config::Settings;
use dyncmd_bot::dispatch::Dispatcher;
use dyncmd_bot::store::{CommandStore, SqliteCommandStore};
use dyncmd_bot::transport::ConsoleTransport;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");
const DEFAULT_CONFIG_PATH: &str = "dyncmd-bot.toml";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let config_path = get_config_path(&args);

    // Load configuration
    let settings = match load_settings(config_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging based on configuration
    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting {} v{}", NAME, VERSION);
    info!(
        "Configuration loaded from: {}",
        config_path.as_deref().unwrap_or("<defaults>")
    );
    info!("Database path: {}", settings.database.path.display());
    info!("Log level: {}", settings.logging.level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Bot failed");
            ExitCode::FAILURE
        }
    }
}

/// Async main function.
async fn async_main(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    // Open the command store and bring the schema up to date
    let store = SqliteCommandStore::connect(&settings.database).await?;
    let migrated = store.initialize().await?;
    if migrated > 0 {
        info!(rows = migrated, "Migrated legacy commands");
    }
    let store = Arc::new(store);

    // Build the registry; without an initial load there is nothing to serve
    let registry = Arc::new(CommandRegistry::new(store.clone()));
    let count = registry.refresh().await?;
    info!(commands = count, "Command registry ready");

    let transport = Arc::new(ConsoleTransport::new(settings.console.clone()));
    let mut inbound = transport.spawn_reader();
    let dispatcher = Dispatcher::new(&settings, Arc::clone(&registry), transport);

    let mut shutdown = ShutdownSignal::install();
    let mut reload = ReloadSignal::install();

    info!(prefix = %settings.bot.prefix, "Listening for messages on the console");

    loop {
        tokio::select! {
            message = inbound.recv() => {
                match message {
                    Some(message) => {
                        dispatcher.dispatch(message);
                    }
                    None => {
                        info!("Input closed, shutting down...");
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Shutdown signal received, initiating graceful shutdown...");
                break;
            }
            _ = reload.recv() => {
                info!("Reload signal received, refreshing commands...");
                match registry.refresh().await {
                    Ok(count) => info!(commands = count, "Commands refreshed"),
                    Err(e) => error!(error = %e, "Failed to refresh commands, keeping existing set"),
                }
            }
        }
    }

    if dispatcher.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("Graceful shutdown complete");
    } else {
        warn!(
            "Shutdown timeout after {}s, some handlers may be terminated",
            DRAIN_TIMEOUT.as_secs()
        );
    }

    store.close().await;
    info!("Bot stopped");
    Ok(())
}

/// Shutdown listener (SIGTERM or SIGINT), installed once so no signal
/// is lost between loop passes.
struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Option<signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<signal::unix::Signal>,
}

impl ShutdownSignal {
    #[cfg(unix)]
    fn install() -> Self {
        Self {
            interrupt: install_unix(signal::unix::SignalKind::interrupt(), "SIGINT"),
            terminate: install_unix(signal::unix::SignalKind::terminate(), "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            _ = recv_unix(&mut self.interrupt) => {},
            _ = recv_unix(&mut self.terminate) => {},
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Reload listener (SIGHUP). Never fires on non-Unix platforms.
struct ReloadSignal {
    #[cfg(unix)]
    hangup: Option<signal::unix::Signal>,
}

impl ReloadSignal {
    #[cfg(unix)]
    fn install() -> Self {
        Self {
            hangup: install_unix(signal::unix::SignalKind::hangup(), "SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        recv_unix(&mut self.hangup).await;
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
fn install_unix(kind: signal::unix::SignalKind, name: &str) -> Option<signal::unix::Signal> {
    match signal::unix::signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            error!(error = %e, signal = name, "Failed to install signal handler");
            None
        }
    }
}

/// Wait on an installed stream; a missing one never fires.
#[cfg(unix)]
async fn recv_unix(stream: &mut Option<signal::unix::Signal>) {
    match stream {
        Some(stream) => {
            stream.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Chat command dispatcher with runtime-editable dynamic commands.

Reads messages from stdin, one per line: plain text from the console
user, or JSON {{"channel", "sender": {{"id", "name", "admin"}}, "text"}}.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    -h, --help             Print help information
    -V, --version          Print version information

SIGNALS:
    SIGHUP                 Reload commands from the database
    SIGINT, SIGTERM        Stop after running commands finish
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Get the configuration file path given on the command line, if any.
fn get_config_path(args: &[String]) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Load settings from the given path, or from the default path if present.
fn load_settings(path: Option<&str>) -> Result<Settings, dyncmd_bot::error::BotError> {
    match path {
        Some(path) => Settings::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Settings::load(DEFAULT_CONFIG_PATH),
        None => Ok(Settings::default()),
    }
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    // Logs go to stderr so replies on stdout stay readable
    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
