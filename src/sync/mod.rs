//! Real-time synchronization engine
//!
//! A reconnecting push-channel client, the dispatcher that decodes and
//! routes its frames, and the bootstrap that gates events on the active
//! date range before merging them into the stores.

pub mod backoff;
pub mod bootstrap;
pub mod connection;
pub mod dispatcher;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use bootstrap::{SyncHandle, SyncTargets};
pub use connection::{ConnectionManager, ConnectionState};
pub use dispatcher::{DispatchReport, FailureSink, MessageDispatcher, Subscription, TracingSink};
pub use transport::{Socket, Transport, WebSocketTransport};
