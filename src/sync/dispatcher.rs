//! Message dispatcher
//!
//! Decodes push-channel envelopes into [`LiveEvent`]s and routes them to the
//! handlers registered for their kind. Handler failures are isolated: an
//! `Err` or a panic is reported to the [`FailureSink`] and the remaining
//! handlers still run.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::anyhow;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::models::{Envelope, EventKind, LiveEvent};

type Handler = Arc<dyn Fn(&LiveEvent) -> anyhow::Result<()> + Send + Sync>;
type Registry = RwLock<HashMap<EventKind, Vec<(u64, Handler)>>>;

/// Receives handler failures
pub trait FailureSink: Send + Sync {
    fn report(&self, kind: EventKind, error: &anyhow::Error);
}

/// Reports handler failures as tracing errors
#[derive(Debug, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, kind: EventKind, error: &anyhow::Error) {
        error!(kind = %kind, "Message handler failed: {:#}", error);
    }
}

/// Outcome of dispatching one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReport {
    /// Malformed envelope or payload
    Dropped,
    /// Well-formed envelope of a kind this client does not know
    Ignored,
    /// Routed to the registered handlers
    Delivered { handled: usize, failed: usize },
}

/// Kind-keyed handler registry
pub struct MessageDispatcher {
    registry: Arc<Registry>,
    next_id: AtomicU64,
    sink: Arc<dyn FailureSink>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn FailureSink>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            sink,
        }
    }

    /// Register a handler for `kind`.
    ///
    /// Handlers for the same kind run in registration order. The handler stays
    /// registered until [`Subscription::unsubscribe`] is called.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&LiveEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            kind,
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registry.read().get(&kind).map_or(0, Vec::len)
    }

    /// Decode a raw text frame and dispatch it
    pub fn dispatch_raw(&self, raw: &str) -> DispatchReport {
        match serde_json::from_str::<Envelope>(raw) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => {
                warn!("Dropping malformed envelope: {}", e);
                DispatchReport::Dropped
            }
        }
    }

    /// Dispatch a parsed envelope
    pub fn dispatch(&self, envelope: Envelope) -> DispatchReport {
        let Some(kind) = EventKind::from_wire(&envelope.kind) else {
            debug!(kind = %envelope.kind, "Ignoring unknown event kind");
            return DispatchReport::Ignored;
        };

        match LiveEvent::decode(kind, envelope.data) {
            Ok(event) => self.deliver(&event),
            Err(e) => {
                warn!(kind = %kind, "Dropping undecodable payload: {}", e);
                DispatchReport::Dropped
            }
        }
    }

    /// Run every handler registered for the event's kind
    pub fn deliver(&self, event: &LiveEvent) -> DispatchReport {
        let kind = event.kind();

        // Snapshot so handlers may (un)subscribe without deadlocking
        let handlers: Vec<Handler> = self
            .registry
            .read()
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        let mut handled = 0;
        let mut failed = 0;

        for handler in handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event)))
                .unwrap_or_else(|payload| {
                    Err(anyhow!("handler panicked: {}", panic_message(payload.as_ref())))
                });

            match outcome {
                Ok(()) => handled += 1,
                Err(e) => {
                    failed += 1;
                    self.sink.report(kind, &e);
                }
            }
        }

        DispatchReport::Delivered { handled, failed }
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Registration token returned by [`MessageDispatcher::on`]
#[must_use = "a handler stays registered until unsubscribe() is called"]
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };

        let mut registry = registry.write();
        let Some(entries) = registry.get_mut(&self.kind) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != self.id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            registry.remove(&self.kind);
        }
        removed
    }
}
