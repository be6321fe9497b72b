//! Process list ordering.
//!
//! Sorting, reversing and truncating a raw process table.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::metrics::ProcessInfo;
use crate::error::{MonitorError, Result};

/// Key a process list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Cpu,
    Mem,
    Pid,
    Name,
}

impl FromStr for SortKey {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(SortKey::Cpu),
            "mem" => Ok(SortKey::Mem),
            "pid" => Ok(SortKey::Pid),
            "name" => Ok(SortKey::Name),
            other => Err(MonitorError::invalid_argument(format!(
                "unknown sort key '{}', expected one of cpu, mem, pid, name",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Cpu => "cpu",
            SortKey::Mem => "mem",
            SortKey::Pid => "pid",
            SortKey::Name => "name",
        };
        f.write_str(name)
    }
}

/// How to order and cut down a process list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessQuery {
    pub sort: SortKey,
    /// 0 keeps every process
    pub limit: usize,
    pub reverse: bool,
}

impl Default for ProcessQuery {
    fn default() -> Self {
        Self {
            sort: SortKey::Cpu,
            limit: 10,
            reverse: false,
        }
    }
}

impl ProcessQuery {
    /// Build a query from a textual sort key
    pub fn parse(sort: &str, limit: usize, reverse: bool) -> Result<Self> {
        Ok(Self {
            sort: sort.parse()?,
            limit,
            reverse,
        })
    }

    /// Order and truncate `processes`.
    ///
    /// `cpu` and `mem` sort heaviest first, `pid` and `name` ascending;
    /// `reverse` flips the order before the limit is applied.
    pub fn apply(&self, mut processes: Vec<ProcessInfo>) -> Vec<ProcessInfo> {
        processes.sort_by(|a, b| {
            let ordering = match self.sort {
                SortKey::Cpu => b
                    .cpu_percent
                    .partial_cmp(&a.cpu_percent)
                    .unwrap_or(Ordering::Equal),
                SortKey::Mem => b.memory_bytes.cmp(&a.memory_bytes),
                SortKey::Pid => a.pid.cmp(&b.pid),
                SortKey::Name => a.name.cmp(&b.name),
            };
            ordering.then_with(|| a.pid.cmp(&b.pid))
        });

        if self.reverse {
            processes.reverse();
        }
        if self.limit > 0 {
            processes.truncate(self.limit);
        }
        processes
    }
}
