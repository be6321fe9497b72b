//! OS-backed [`SystemProvider`].

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use sysinfo::{MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

use super::{df, dhcp, services};
use crate::core::system_monitor::{
    DiskUsage, HostFacts, Lease, ProcessInfo, ServiceStatuses, SystemProvider,
};
use crate::error::{MonitorError, Result};

/// Reads host data from the running system.
///
/// Host facts and the process table come from `sysinfo`; disks, leases and
/// services from `df`, the lease file and `service`.
pub struct OsProvider {
    system: Mutex<System>,
}

impl OsProvider {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_memory(MemoryRefreshKind::everything())
            .with_processes(process_refresh_kind());

        Self {
            system: Mutex::new(System::new_with_specifics(refresh_kind)),
        }
    }
}

impl Default for OsProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn process_refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing().with_cpu().with_memory()
}

impl SystemProvider for OsProvider {
    fn host_facts(&self) -> Result<HostFacts> {
        let hostname = System::host_name()
            .ok_or_else(|| MonitorError::collection_failed("hostname is not available"))?;
        let load = System::load_average();
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut system = self.system.lock();
        system.refresh_memory();

        Ok(HostFacts {
            hostname,
            uptime_secs: System::uptime(),
            loadavg: [load.one, load.five, load.fifteen],
            cpus,
            total_memory: system.total_memory(),
            free_memory: system.available_memory(),
        })
    }

    fn disk_usage(&self) -> Result<BTreeMap<String, DiskUsage>> {
        df::read_disk_usage()
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let mut system = self.system.lock();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, process_refresh_kind());

        let processes = system
            .processes()
            .values()
            .map(|process| ProcessInfo {
                pid: process.pid().as_u32(),
                parent_pid: process.parent().map(|pid| pid.as_u32()),
                name: process.name().to_string_lossy().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_bytes: process.memory(),
                status: format!("{:?}", process.status()),
            })
            .collect();

        Ok(processes)
    }

    fn dhcp_leases(&self, path: &Path) -> Result<Vec<Lease>> {
        dhcp::read_dhcp_leases(path)
    }

    fn service_statuses(&self) -> Result<ServiceStatuses> {
        services::read_service_statuses()
    }
}
