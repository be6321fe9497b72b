//! Disk usage from `df`.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::system_monitor::DiskUsage;
use crate::error::{MonitorError, Result};

/// One POSIX `df -kP` row: device, 1K-blocks, used, available, capacity, mount
static DF_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)%\s+(.+?)\s*$").expect("valid df pattern")
});

/// Run `df -kP` and parse its output
pub fn read_disk_usage() -> Result<BTreeMap<String, DiskUsage>> {
    if cfg!(windows) {
        return Err(MonitorError::provider_unavailable(
            "disks",
            "df is not available on this platform",
        ));
    }

    run_df(OsStr::new("df"))
}

/// `df` exits non-zero when any single mount is unreadable, so rows printed
/// alongside a failure status are still used
fn run_df(program: &OsStr) -> Result<BTreeMap<String, DiskUsage>> {
    let output = Command::new(program).arg("-kP").output()?;
    let disks = parse_df_output(&String::from_utf8_lossy(&output.stdout));

    if !output.status.success() {
        if disks.is_empty() {
            return Err(MonitorError::provider_unavailable(
                "disks",
                format!("df exited with {}", output.status),
            ));
        }
        log::debug!(
            "df exited with {}, keeping {} readable filesystem(s)",
            output.status,
            disks.len()
        );
    }

    Ok(disks)
}

/// Parse `df -kP` output into mount point → usage in bytes.
///
/// The header and any line that does not look like a filesystem row are
/// skipped.
pub fn parse_df_output(output: &str) -> BTreeMap<String, DiskUsage> {
    let mut disks = BTreeMap::new();

    for line in output.lines() {
        let Some(caps) = DF_ROW.captures(line) else {
            continue;
        };

        let blocks = |i: usize| caps[i].parse::<u64>().ok().map(|kb| kb.saturating_mul(1024));
        let (Some(total), Some(used), Some(free)) = (blocks(2), blocks(3), blocks(4)) else {
            continue;
        };
        let percent = caps[5].parse::<f32>().unwrap_or(0.0);

        disks.insert(
            caps[6].to_string(),
            DiskUsage {
                total,
                used,
                free,
                percent,
            },
        );
    }

    disks
}
