use std::collections::BTreeMap;
use std::path::Path;

use super::metrics::{DiskUsage, HostFacts, Lease, ProcessInfo, ServiceStatuses};
use crate::error::{MonitorError, Result};

/// Trait for host data providers
///
/// Abstracts the OS calls and utilities the monitor samples from. The OS
/// implementation lives in the platform layer; tests supply their own.
/// Methods are blocking and are run on the blocking pool by the collector.
pub trait SystemProvider: Send + Sync + 'static {
    /// Hostname, uptime, load average and memory
    fn host_facts(&self) -> Result<HostFacts>;

    /// Usage per mount point
    fn disk_usage(&self) -> Result<BTreeMap<String, DiskUsage>> {
        Err(MonitorError::provider_unavailable("disks", "not supported"))
    }

    /// Unordered process table
    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        Err(MonitorError::provider_unavailable("processes", "not supported"))
    }

    /// Leases from the DHCP server lease file at `path`
    fn dhcp_leases(&self, _path: &Path) -> Result<Vec<Lease>> {
        Err(MonitorError::provider_unavailable("leases", "not supported"))
    }

    fn service_statuses(&self) -> Result<ServiceStatuses> {
        Err(MonitorError::provider_unavailable("services", "not supported"))
    }
}

/// Time source for event timestamps
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
