//! shorturls - an in-memory URL shortener with click analytics
//!
//! Long URLs are mapped to short codes that stay valid for a fixed window.
//! Every successful redirect records a click (time, referrer, client address)
//! that can be read back through the stats endpoint, even after expiry.
//!
//! # Architecture
//! - `storage`: link records and the link store
//! - `analytics`: click events and the analytics store
//! - `services`: create / redirect / stats business logic
//! - `api`: HTTP handlers and middleware
//! - `remote_log`: best-effort shipping of log events to an external collector
//! - `config`: static configuration (TOML + environment)
//! - `runtime`: server startup and shutdown
//! - `system`: local logging setup

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod remote_log;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
