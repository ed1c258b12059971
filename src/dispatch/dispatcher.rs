//! Message dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::PermissionManager;
use crate::commands::{CommandArgs, CommandRegistry, ExecutionContext, RegisteredCommand};
use crate::config::Settings;
use crate::error::{BotError, CommandErrorKind};
use crate::transport::{ChatTransport, InboundMessage, Reply};

use super::parser;

/// A message resolved to a command, ready to run.
pub struct PreparedInvocation {
    pub command: Arc<RegisteredCommand>,
    pub ctx: ExecutionContext,
    pub args: CommandArgs,
}

/// Decrements the in-flight count when the handler task ends, even on panic.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Routes inbound messages to command handlers.
///
/// Each matched message runs on its own task, so a slow handler never
/// holds up the event loop or other messages.
pub struct Dispatcher {
    prefix: String,
    registry: Arc<CommandRegistry>,
    transport: Arc<dyn ChatTransport>,
    permissions: Arc<PermissionManager>,
    handler_timeout: Duration,
    /// Bounds the number of handlers running at once
    handler_slots: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(settings: &Settings, registry: Arc<CommandRegistry>, transport: Arc<dyn ChatTransport>) -> Self {
        info!(
            prefix = %settings.bot.prefix,
            max_concurrent = settings.limits.max_concurrent_handlers,
            timeout_secs = settings.limits.handler_timeout_seconds,
            "Dispatcher configured"
        );

        Self {
            prefix: settings.bot.prefix.clone(),
            registry,
            transport,
            permissions: Arc::new(PermissionManager::new(settings.bot.superusers.iter().cloned())),
            handler_timeout: settings.limits.handler_timeout(),
            handler_slots: Arc::new(Semaphore::new(settings.limits.max_concurrent_handlers)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Number of handler tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve a message to a command invocation.
    ///
    /// Returns `None` for messages without the prefix and for unknown
    /// commands; neither gets a reply.
    pub fn prepare(&self, message: &InboundMessage) -> Option<PreparedInvocation> {
        let name = parser::command_name(&message.text, &self.prefix)?;

        let Some(command) = self.registry.lookup(&name) else {
            debug!(command = %name, channel = %message.channel, "Unknown command, ignoring");
            return None;
        };

        let tokens = parser::tokenize(&message.text);
        let args = parser::parse_arguments(tokens.get(1..).unwrap_or(&[]), command.switch_aliases());

        let ctx = ExecutionContext {
            request_id: Uuid::new_v4(),
            channel: message.channel.clone(),
            sender: message.sender.clone(),
            is_admin: self.permissions.is_admin(message.sender.as_ref()),
            received_at: Utc::now(),
            command: name,
            prefix: self.prefix.clone(),
            registry: Arc::clone(&self.registry),
        };

        Some(PreparedInvocation { command, ctx, args })
    }

    /// Dispatch a message.
    ///
    /// Returns the handle of the spawned handler task, or `None` if the
    /// message is not a known command. The reply is sent by the task.
    pub fn dispatch(&self, message: InboundMessage) -> Option<JoinHandle<()>> {
        let invocation = self.prepare(&message)?;

        let transport = Arc::clone(&self.transport);
        let slots = Arc::clone(&self.handler_slots);
        let timeout = invocation.command.timeout().unwrap_or(self.handler_timeout);
        let guard = InFlightGuard::enter(&self.in_flight);

        Some(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match slots.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Handler slots closed, dropping command");
                    return;
                }
            };

            let request_id = invocation.ctx.request_id;
            let channel = invocation.ctx.channel.clone();
            let reply = execute(invocation, timeout).await;

            if let Err(e) = transport.send(&channel, reply).await {
                error!(request_id = %request_id, channel = %channel, error = %e, "Failed to send reply");
            }
        }))
    }

    /// Wait for running handlers to finish, up to `timeout`.
    ///
    /// Returns whether everything drained.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let poll_interval = Duration::from_millis(50);
        let deadline = tokio::time::Instant::now() + timeout;

        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!(in_flight = self.in_flight(), "Handlers still running after drain timeout");
                return false;
            }
            debug!(in_flight = self.in_flight(), "Waiting for handlers to drain");
            tokio::time::sleep(poll_interval).await;
        }

        info!("All handlers drained");
        true
    }
}

/// Run a prepared invocation and turn the outcome into a reply.
///
/// Errors become user-facing text; nothing is propagated.
pub async fn execute(invocation: PreparedInvocation, timeout: Duration) -> Reply {
    let PreparedInvocation { command, ctx, args } = invocation;
    let start = Instant::now();

    let result = if command.requires_admin() && !ctx.is_admin {
        Err(BotError::command(CommandErrorKind::PermissionDenied {
            command: ctx.command.clone(),
        }))
    } else {
        match tokio::time::timeout(timeout, command.execute(&ctx, args)).await {
            Ok(result) => result,
            Err(_) => Err(BotError::command(CommandErrorKind::Timeout {
                timeout_secs: timeout.as_secs(),
            })),
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(reply) => {
            info!(
                request_id = %ctx.request_id,
                command = %ctx.command,
                channel = %ctx.channel,
                sender = ctx.sender_name(),
                duration_ms = duration_ms,
                "Command executed"
            );
            reply
        }
        Err(e) => {
            warn!(
                request_id = %ctx.request_id,
                command = %ctx.command,
                sender = ctx.sender_name(),
                duration_ms = duration_ms,
                error = %e,
                "Command failed"
            );
            Reply::text(e.user_message())
        }
    }
}
