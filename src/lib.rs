//! Moogie - live synchronization for the monitoring dashboard
//!
//! Keeps the dashboard's cached views current with a push channel.
//!
//! ## Features
//!
//! - Reconnecting websocket client with exponential backoff
//! - Kind-keyed event dispatch with per-handler failure isolation
//! - Date-range controller persisted to the view location
//! - Jobs, dashboard and job-detail caches merged from live events
//! - HTTP client for the upstream read API

pub mod api;
pub mod config;
pub mod date_range;
pub mod error;
pub mod format;
pub mod location;
pub mod models;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Result, SyncError};
