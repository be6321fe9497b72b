//! Threshold evaluation.
//!
//! Compares a snapshot against the configured thresholds and reports every
//! breached condition. Conditions are independent; several may fire at once.

use serde::Serialize;

use super::events::EventKind;
use super::metrics::Snapshot;
use crate::core::config::ThresholdSet;

/// A breached threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breach {
    pub kind: EventKind,
    pub value: f64,
    /// Resolved (absolute) threshold the value was compared to
    pub threshold: f64,
    /// Mount point, for free disk breaches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
}

impl Breach {
    fn new(kind: EventKind, value: f64, threshold: f64) -> Self {
        Self {
            kind,
            value,
            threshold,
            mount: None,
        }
    }
}

const LOAD_KINDS: [EventKind; 3] = [EventKind::LoadAvg1, EventKind::LoadAvg5, EventKind::LoadAvg15];

/// Evaluate a snapshot against thresholds.
///
/// Fractional memory and disk limits are resolved against the snapshot's
/// totals. Absent optional facts never count as breaches.
pub fn evaluate(snapshot: &Snapshot, thresholds: &ThresholdSet) -> Vec<Breach> {
    let mut breaches = Vec::new();
    let host = &snapshot.host;

    // Load average
    for ((kind, value), threshold) in LOAD_KINDS
        .iter()
        .zip(host.loadavg)
        .zip(thresholds.loadavg)
    {
        if value > threshold {
            breaches.push(Breach::new(*kind, value, threshold));
        }
    }

    // Free memory
    let free_memory = host.free_memory as f64;
    let memory_limit = thresholds.freemem.resolve(host.total_memory as f64);
    if free_memory < memory_limit {
        breaches.push(Breach::new(EventKind::FreeMem, free_memory, memory_limit));
    }

    // Free disk, per filesystem
    if let Some(disks) = &snapshot.disks {
        for (mount, usage) in disks {
            let free = usage.free as f64;
            let limit = thresholds.freedisk.resolve(usage.total as f64);
            if free < limit {
                breaches.push(Breach {
                    mount: Some(mount.clone()),
                    ..Breach::new(EventKind::FreeDisk, free, limit)
                });
            }
        }
    }

    // Uptime; 0 disables the check
    let uptime_limit = thresholds.uptime;
    if uptime_limit > 0 && host.uptime_secs > uptime_limit {
        breaches.push(Breach::new(
            EventKind::Uptime,
            host.uptime_secs as f64,
            uptime_limit as f64,
        ));
    }

    breaches
}
