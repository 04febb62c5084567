//! Remote log shipping
//!
//! Structured log events `{stack, level, package, message}` are validated against a
//! fixed allow-list and shipped to an external collector. Shipping is best-effort:
//! callers never block on it and never see its failures.
//!
//! - [`RemoteLogger`]: bounded queue + background worker posting over HTTP
//! - [`MemoryLogger`]: keeps events in memory, for tests
//! - [`NoopLogger`]: discards everything

mod client;

pub use client::{DispatchStats, RemoteLogger};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stack {
    Backend,
    Frontend,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Package names accepted by the collector: backend packages followed by shared ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Package {
    Cache,
    Controller,
    CronJob,
    Db,
    Domain,
    Handler,
    Repository,
    Route,
    Service,
    Auth,
    Config,
    Middleware,
    Utils,
}

/// One event as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub stack: Stack,
    pub level: Level,
    pub package: Package,
    pub message: String,
}

impl LogEvent {
    pub fn new(stack: Stack, level: Level, package: Package, message: impl Into<String>) -> Self {
        Self {
            stack,
            level,
            package,
            message: message.into(),
        }
    }

    /// Parse the four fields against the allow-list.
    pub fn parse(stack: &str, level: &str, package: &str, message: &str) -> Option<Self> {
        Some(Self::new(
            stack.parse().ok()?,
            level.parse().ok()?,
            package.parse().ok()?,
            message,
        ))
    }
}

/// Mirror an event into the local tracing subscriber.
pub(crate) fn trace_locally(event: &LogEvent) {
    let LogEvent {
        stack,
        level,
        package,
        message,
    } = event;
    match level {
        Level::Debug => tracing::debug!(%stack, %package, "{}", message),
        Level::Info => tracing::info!(%stack, %package, "{}", message),
        Level::Warn => tracing::warn!(%stack, %package, "{}", message),
        Level::Error | Level::Fatal => tracing::error!(%stack, %package, %level, "{}", message),
    }
}

/// The logging capability the request path depends on.
///
/// Implementations must never block for long and never panic.
pub trait EventLogger: Send + Sync {
    fn log(&self, stack: Stack, level: Level, package: Package, message: &str);

    /// Untyped entry point; events failing the allow-list are silently dropped.
    fn log_raw(&self, stack: &str, level: &str, package: &str, message: &str) {
        if let Some(event) = LogEvent::parse(stack, level, package, message) {
            self.log(event.stack, event.level, event.package, &event.message);
        }
    }

    fn backend(&self, level: Level, package: Package, message: &str) {
        self.log(Stack::Backend, level, package, message);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl EventLogger for NoopLogger {
    fn log(&self, _stack: Stack, _level: Level, _package: Package, _message: &str) {}
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventLogger for MemoryLogger {
    fn log(&self, stack: Stack, level: Level, package: Package, message: &str) {
        self.events
            .lock()
            .push(LogEvent::new(stack, level, package, message));
    }
}
