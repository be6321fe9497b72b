//! Host monitoring core.
//!
//! Collects host snapshots through a [`SystemProvider`], checks them against
//! the configured thresholds and emits named events to subscribers. The
//! [`MonitorEngine`] owns the lifecycle; [`MonitorRuntime`] drives it on a
//! Tokio task.

pub mod alerts;
mod collector;
mod engine;
mod events;
mod metrics;
pub mod processes;
mod provider;
mod runtime;

pub use alerts::{evaluate, Breach};
pub use collector::{Collection, CollectorConfig, SnapshotCollector, DEFAULT_LEASE_FILE};
pub use engine::{CycleReport, EngineState, MonitorEngine, MonitorEngineBuilder};
pub use events::{Event, EventEmitter, EventKind, Listener};
pub use metrics::{DiskUsage, HostFacts, Lease, ProcessInfo, ServiceStatuses, Snapshot};
pub use processes::{ProcessQuery, SortKey};
pub use provider::{Clock, SystemClock, SystemProvider};
pub use runtime::{MonitorHandle, MonitorRuntime};
