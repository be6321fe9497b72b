use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mandatory host facts, read every cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostFacts {
    pub hostname: String,
    #[serde(rename = "uptime")]
    pub uptime_secs: u64,
    pub loadavg: [f64; 3], // 1, 5, 15 min
    pub cpus: usize,
    #[serde(rename = "totalmem")]
    pub total_memory: u64,
    #[serde(rename = "freemem")]
    pub free_memory: u64,
}

/// Usage of one mounted filesystem (bytes)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub status: String,
}

/// One entry of a DHCP server lease table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub ip: String,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub starts: Option<NaiveDateTime>,
    pub ends: Option<NaiveDateTime>,
    pub state: Option<String>,
}

/// Service name to running state; `None` when the state is unknown
pub type ServiceStatuses = BTreeMap<String, Option<bool>>;

/// One cycle's collected host facts.
///
/// Optional facts are `None` when their provider was disabled or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub host: HostFacts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disks: Option<BTreeMap<String, DiskUsage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leases: Option<Vec<Lease>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<ServiceStatuses>,
}

impl Snapshot {
    pub fn from_host(host: HostFacts) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Snapshot fields as an event payload
    pub fn to_payload(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                log::warn!("Snapshot did not serialize to a record");
                Map::new()
            }
        }
    }
}
