use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tokio::time::timeout;

use crate::error::{MonitorError, Result};

use super::metrics::*;
use super::processes::ProcessQuery;
use super::provider::SystemProvider;

/// Default lease file of the ISC DHCP server
pub const DEFAULT_LEASE_FILE: &str = "/var/lib/dhcp/dhcpd.leases";

/// Configuration for snapshot collection
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub collect_disks: bool,
    pub collect_processes: bool,
    pub collect_leases: bool,
    pub collect_services: bool,
    pub processes: ProcessQuery,
    pub lease_file: PathBuf,
    /// Upper bound for a single provider call
    pub provider_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            collect_disks: true,
            collect_processes: true,
            collect_leases: false,
            collect_services: false,
            processes: ProcessQuery::default(),
            lease_file: PathBuf::from(DEFAULT_LEASE_FILE),
            provider_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of one collection: the snapshot plus the optional providers that
/// failed while building it
#[derive(Debug)]
pub struct Collection {
    pub snapshot: Snapshot,
    pub warnings: Vec<MonitorError>,
}

/// Collects snapshots from a [`SystemProvider`]
#[derive(Clone)]
pub struct SnapshotCollector {
    provider: Arc<dyn SystemProvider>,
    config: CollectorConfig,
}

impl SnapshotCollector {
    /// Create a new SnapshotCollector with default configuration
    pub fn new(provider: Arc<dyn SystemProvider>) -> Self {
        Self::with_config(provider, CollectorConfig::default())
    }

    /// Create a new SnapshotCollector with custom configuration
    pub fn with_config(provider: Arc<dyn SystemProvider>, config: CollectorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect one snapshot.
    ///
    /// Host facts are read first; failing host facts fail the whole
    /// collection. Enabled optional providers then run concurrently, and a
    /// failing one leaves its fact absent and adds a warning.
    pub async fn collect(&self) -> Result<Collection> {
        let host = self
            .run_blocking("host", |p: &dyn SystemProvider| p.host_facts())
            .await
            .map_err(|e| {
                log::error!("Failed to read host facts: {}", e);
                match e {
                    failed @ MonitorError::CollectionFailed(_) => failed,
                    other => MonitorError::collection_failed(other.to_string()),
                }
            })?;

        let query = self.config.processes.clone();
        let lease_file = self.config.lease_file.clone();

        let (disks, processes, leases, services) = tokio::join!(
            self.optional("disks", self.config.collect_disks, |p: &dyn SystemProvider| {
                p.disk_usage()
            }),
            self.optional(
                "processes",
                self.config.collect_processes,
                move |p: &dyn SystemProvider| p.processes().map(|list| query.apply(list)),
            ),
            self.optional(
                "leases",
                self.config.collect_leases,
                move |p: &dyn SystemProvider| p.dhcp_leases(&lease_file),
            ),
            self.optional(
                "services",
                self.config.collect_services,
                |p: &dyn SystemProvider| p.service_statuses(),
            ),
        );

        let mut warnings = Vec::new();
        let snapshot = Snapshot {
            host,
            disks: settle(disks, &mut warnings),
            processes: settle(processes, &mut warnings),
            leases: settle(leases, &mut warnings),
            services: settle(services, &mut warnings),
        };

        Ok(Collection { snapshot, warnings })
    }

    /// Query the process table directly.
    ///
    /// The sort key is checked before the provider is touched.
    pub async fn processes(
        &self,
        sort: &str,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<ProcessInfo>> {
        let query = ProcessQuery::parse(sort, limit, reverse)?;
        self.run_blocking("processes", move |p: &dyn SystemProvider| {
            p.processes().map(|list| query.apply(list))
        })
        .await
    }

    async fn optional<T, F>(&self, source: &'static str, enabled: bool, read: F) -> Option<Result<T>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SystemProvider) -> Result<T> + Send + 'static,
    {
        if !enabled {
            return None;
        }

        let result = self.run_blocking(source, read).await.map_err(|e| match e {
            unavailable @ MonitorError::ProviderUnavailable { .. } => unavailable,
            other => MonitorError::provider_unavailable(source, other.to_string()),
        });
        Some(result)
    }

    async fn run_blocking<T, F>(&self, source: &'static str, read: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SystemProvider) -> Result<T> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let handle = task::spawn_blocking(move || read(provider.as_ref()));

        match timeout(self.config.provider_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MonitorError::provider_unavailable(
                source,
                format!("provider task failed: {}", e),
            )),
            Err(_) => Err(MonitorError::provider_unavailable(
                source,
                format!("timed out after {:?}", self.config.provider_timeout),
            )),
        }
    }
}

fn settle<T>(outcome: Option<Result<T>>, warnings: &mut Vec<MonitorError>) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{}", e);
            warnings.push(e);
            None
        }
    }
}
