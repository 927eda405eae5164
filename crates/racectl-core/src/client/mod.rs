//! Offline-first client engine
//!
//! Mutations taken while disconnected are applied optimistically to local
//! caches and appended to a durable queue; the coordinator later replays
//! them against the reconciliation service and merges the authoritative
//! records back by natural key.

mod cache;
mod connectivity;
mod coordinator;
mod http;
mod queue;
mod reconcile;
mod remote;
mod session;

pub use cache::RecordCache;
pub use connectivity::{Connectivity, SharedConnectivity};
pub use coordinator::{DrainReport, RejectedItem, SkipReason, SyncCoordinator, SyncOutcome};
pub use http::HttpRemote;
pub use queue::SyncQueue;
pub use reconcile::{reconcile, Reconciled};
pub use remote::RemoteService;
pub use session::Session;
