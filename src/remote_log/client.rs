//! HTTP shipping of log events
//!
//! The request path only does a `try_send` into a bounded channel. A dedicated
//! thread drains the channel and POSTs each event with a blocking `ureq` agent
//! whose global timeout bounds every call. Outcomes end up in counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};
use ureq::Agent;

use super::{EventLogger, Level, LogEvent, Package, Stack, trace_locally};
use crate::config::RemoteLogConfig;

/// Environment variable holding the collector bearer token
pub const ACCESS_TOKEN_ENV: &str = "ACCESS_TOKEN";

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of dispatch outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Accepted into the queue
    pub queued: u64,
    /// Collector answered with a 2xx
    pub delivered: u64,
    /// Transport error, timeout or non-2xx answer
    pub failed: u64,
    /// Queue full or worker gone
    pub dropped: u64,
    /// Failed validation, or shipping disabled
    pub rejected: u64,
}

impl DispatchStats {
    /// Events queued but not yet delivered or failed.
    pub fn in_flight(&self) -> u64 {
        self.queued.saturating_sub(self.delivered + self.failed)
    }
}

pub struct RemoteLogger {
    sender: RwLock<Option<Sender<LogEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl RemoteLogger {
    /// Build the logger and start its worker thread.
    ///
    /// Without an endpoint or a bearer token (from config or `ACCESS_TOKEN`),
    /// the logger runs disabled: every event is counted as rejected and only
    /// reaches the local tracing output.
    pub fn new(config: &RemoteLogConfig) -> Self {
        let counters = Arc::new(Counters::default());

        let token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty());

        if !config.enabled || config.endpoint.trim().is_empty() {
            debug!("Remote log shipping disabled by configuration");
            return Self::disabled(counters);
        }
        let Some(token) = token else {
            warn!(
                "Remote log shipping disabled: no access token (set remote_log.access_token or {})",
                ACCESS_TOKEN_ENV
            );
            return Self::disabled(counters);
        };

        let (tx, rx) = bounded(config.queue_capacity.max(1));
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
            .build()
            .into();
        let endpoint = config.endpoint.clone();
        let worker_counters = counters.clone();

        let spawned = std::thread::Builder::new()
            .name("remote-log".to_string())
            .spawn(move || worker_loop(rx, agent, endpoint, token, worker_counters));

        match spawned {
            Ok(handle) => {
                debug!("Remote log worker started for {}", config.endpoint);
                Self {
                    sender: RwLock::new(Some(tx)),
                    worker: Mutex::new(Some(handle)),
                    counters,
                }
            }
            Err(e) => {
                warn!("Failed to spawn remote log worker: {}", e);
                Self::disabled(counters)
            }
        }
    }

    fn disabled(counters: Arc<Counters>) -> Self {
        Self {
            sender: RwLock::new(None),
            worker: Mutex::new(None),
            counters,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.read().is_some()
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.counters;
        DispatchStats {
            queued: c.queued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }

    fn dispatch(&self, event: LogEvent) {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Remote log queue unavailable, event dropped");
            }
        }
    }

    /// Stop accepting events and wait up to `timeout` for the queue to drain.
    ///
    /// Returns `true` when the worker finished in time.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        // 释放 sender 后 worker 处理完剩余事件即退出
        drop(self.sender.write().take());

        let Some(handle) = self.worker.lock().take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Remote log worker still busy after {:?}, detaching", timeout);
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = handle.join();
        true
    }
}

impl EventLogger for RemoteLogger {
    fn log(&self, stack: Stack, level: Level, package: Package, message: &str) {
        let event = LogEvent::new(stack, level, package, message);
        trace_locally(&event);
        self.dispatch(event);
    }

    fn log_raw(&self, stack: &str, level: &str, package: &str, message: &str) {
        match LogEvent::parse(stack, level, package, message) {
            Some(event) => {
                trace_locally(&event);
                self.dispatch(event);
            }
            None => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "Remote log event rejected: stack={}, level={}, package={}",
                    stack, level, package
                );
            }
        }
    }
}

impl Drop for RemoteLogger {
    fn drop(&mut self) {
        // 不等待 worker，进程退出时未发送的事件直接丢弃
        self.sender.write().take();
    }
}

fn worker_loop(
    rx: Receiver<LogEvent>,
    agent: Agent,
    endpoint: String,
    token: String,
    counters: Arc<Counters>,
) {
    let authorization = format!("Bearer {}", token);

    for event in rx.iter() {
        let result = agent
            .post(&endpoint)
            .header("Authorization", &authorization)
            .send_json(&event);

        match result {
            Ok(_) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!("Remote log delivery to {} failed: {}", endpoint, e);
            }
        }
    }

    trace!("Remote log worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, token: Option<&str>) -> RemoteLogConfig {
        RemoteLogConfig {
            enabled: true,
            endpoint: endpoint.to_string(),
            access_token: token.map(String::from),
            timeout_ms: 500,
            queue_capacity: 4,
        }
    }

    #[test]
    fn test_disabled_by_config_rejects_everything() {
        let mut cfg = config("http://127.0.0.1:9/logs", Some("secret"));
        cfg.enabled = false;
        let logger = RemoteLogger::new(&cfg);

        assert!(!logger.is_enabled());
        logger.backend(Level::Info, Package::Service, "hello");
        logger.log_raw("backend", "info", "service", "hello");

        let stats = logger.stats();
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.queued, 0);
    }

    #[test]
    fn test_invalid_fields_rejected_before_queue() {
        let logger = RemoteLogger::new(&config("http://127.0.0.1:9/logs", Some("secret")));
        assert!(logger.is_enabled());

        logger.log_raw("backend", "verbose", "service", "nope");
        logger.log_raw("desktop", "info", "service", "nope");
        logger.log_raw("backend", "info", "kernel", "nope");

        let stats = logger.stats();
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.queued, 0);
        assert!(logger.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_transport_failure_is_counted_not_raised() {
        // 端口 9 (discard) 通常无人监听，连接会被拒绝
        let logger = RemoteLogger::new(&config("http://127.0.0.1:9/logs", Some("secret")));
        logger.backend(Level::Error, Package::Handler, "unreachable collector");

        assert!(logger.shutdown(Duration::from_secs(5)));
        let stats = logger.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.in_flight(), 0);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        // 监听但从不应答，worker 卡在第一个请求上直到超时
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/logs", listener.local_addr().unwrap());
        let mut cfg = config(&endpoint, Some("secret"));
        cfg.queue_capacity = 1;
        let logger = RemoteLogger::new(&cfg);

        let started = Instant::now();
        for _ in 0..5 {
            logger.backend(Level::Info, Package::Service, "burst");
        }
        assert!(started.elapsed() < Duration::from_millis(400));

        let stats = logger.stats();
        assert_eq!(stats.queued + stats.dropped, 5);
        assert!(stats.dropped >= 3);

        drop(listener);
        assert!(logger.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_events_after_shutdown_are_rejected() {
        let logger = RemoteLogger::new(&config("http://127.0.0.1:9/logs", Some("secret")));
        assert!(logger.shutdown(Duration::from_secs(1)));
        logger.backend(Level::Info, Package::Service, "late");
        assert_eq!(logger.stats().rejected, 1);
    }
}
