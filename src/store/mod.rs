//! Range-aware cache stores
//!
//! Each view keeps one [`CacheStore`]: the last fetched entity for the active
//! date range plus its loading/error flags, published on a `watch` channel.
//! Fetches replace the cached value; live events patch it in place.

pub mod dashboard;
pub mod job_detail;
pub mod jobs;
pub mod window;

pub use dashboard::{DashboardStore, DashboardView};
pub use job_detail::{JobDetail, JobDetailStore};
pub use jobs::JobsStore;
pub use window::{ExecutionWindow, JobEntry, RECENT_EXECUTIONS};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// Fetch failure as shown to a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    /// Upstream HTTP status, when the read got that far
    pub status: Option<u16>,
}

impl From<&SyncError> for ErrorInfo {
    fn from(err: &SyncError) -> Self {
        Self {
            message: err.to_string(),
            status: err.http_status(),
        }
    }
}

/// Observable state of one cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Shared load/patch/reset discipline for the view stores
pub struct CacheStore<T> {
    name: &'static str,
    state: watch::Sender<CacheState<T>>,
    latest_request: AtomicU64,
}

impl<T> CacheStore<T> {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            name,
            state,
            latest_request: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CacheState<T>
    where
        T: Clone,
    {
        self.state.borrow().clone()
    }

    /// Read the cached value without cloning it
    pub fn inspect<R>(&self, f: impl FnOnce(&CacheState<T>) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Run `read` and store its outcome.
    ///
    /// Sets `loading` while the read is in flight. Success replaces `data`
    /// and clears `error`; failure clears `data` and records the error. When
    /// a newer load or a `reset()` started in the meantime the outcome is
    /// discarded and `false` is returned.
    pub async fn load<F>(&self, read: F) -> bool
    where
        F: Future<Output = Result<T>>,
    {
        let request = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let outcome = read.await;

        if self.latest_request.load(Ordering::SeqCst) != request {
            debug!(store = self.name, request, "Discarding stale fetch result");
            return false;
        }

        match outcome {
            Ok(data) => self.state.send_modify(|state| {
                state.data = Some(data);
                state.loading = false;
                state.error = None;
            }),
            Err(e) => {
                warn!(store = self.name, "Fetch failed: {}", e);
                let info = ErrorInfo::from(&e);
                self.state.send_modify(|state| {
                    state.data = None;
                    state.loading = false;
                    state.error = Some(info);
                });
            }
        }
        true
    }

    /// Mutate the cached value in place.
    ///
    /// `f` reports whether it changed anything; subscribers are only woken
    /// when it did. No-op while nothing is cached.
    pub fn patch<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.state
            .send_if_modified(|state| state.data.as_mut().is_some_and(f))
    }

    /// Back to the empty state, invalidating in-flight loads
    pub fn reset(&self) {
        self.latest_request.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(CacheState::default());
        debug!(store = self.name, "Store reset");
    }
}
