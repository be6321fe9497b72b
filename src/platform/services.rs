//! Service status from `service --status-all`.

use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::system_monitor::ServiceStatuses;
use crate::error::{MonitorError, Result};

static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[\s*([+\-?])\s*\]\s+(\S+)").expect("valid status pattern"));

pub fn read_service_statuses() -> Result<ServiceStatuses> {
    if !cfg!(target_os = "linux") {
        return Err(MonitorError::provider_unavailable(
            "services",
            "service status is only supported on Linux",
        ));
    }

    let output = Command::new("service").arg("--status-all").output()?;
    if !output.status.success() {
        return Err(MonitorError::provider_unavailable(
            "services",
            format!("service exited with {}", output.status),
        ));
    }

    // Some init scripts report their state on stderr
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(parse_service_statuses(&text))
}

/// `[ + ]` running, `[ - ]` stopped, `[ ? ]` unknown
pub fn parse_service_statuses(output: &str) -> ServiceStatuses {
    output
        .lines()
        .filter_map(|line| STATUS_LINE.captures(line))
        .map(|caps| {
            let running = match &caps[1] {
                "+" => Some(true),
                "-" => Some(false),
                _ => None,
            };
            (caps[2].to_string(), running)
        })
        .collect()
}
