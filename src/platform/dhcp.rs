//! ISC DHCP server lease file parsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::system_monitor::Lease;
use crate::error::Result;

static LEASE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^lease\s+(\S+)\s*\{").expect("valid lease pattern"));

const LEASE_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Read and parse the lease file at `path`
pub fn read_dhcp_leases(path: &Path) -> Result<Vec<Lease>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_dhcp_leases(&content))
}

/// Parse `dhcpd.leases` content.
///
/// The server appends a new block whenever a lease changes, so a later block
/// for an address replaces the earlier one. Unknown statements are ignored.
pub fn parse_dhcp_leases(content: &str) -> Vec<Lease> {
    let mut leases: Vec<Lease> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut current: Option<Lease> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(caps) = LEASE_START.captures(line) {
            current = Some(Lease {
                ip: caps[1].to_string(),
                ..Default::default()
            });
            continue;
        }

        let Some(lease) = current.as_mut() else {
            continue;
        };

        if line.starts_with('}') {
            if let Some(lease) = current.take() {
                match positions.get(&lease.ip) {
                    Some(&index) => leases[index] = lease,
                    None => {
                        positions.insert(lease.ip.clone(), leases.len());
                        leases.push(lease);
                    }
                }
            }
            continue;
        }

        let statement = line.trim_end_matches(';');
        if let Some(rest) = statement.strip_prefix("starts ") {
            lease.starts = lease_time(rest);
        } else if let Some(rest) = statement.strip_prefix("ends ") {
            lease.ends = lease_time(rest);
        } else if let Some(rest) = statement.strip_prefix("binding state ") {
            lease.state = Some(rest.trim().to_string());
        } else if let Some(rest) = statement.strip_prefix("hardware ethernet ") {
            lease.mac = Some(rest.trim().to_lowercase());
        } else if let Some(rest) = statement.strip_prefix("client-hostname ") {
            lease.hostname = Some(rest.trim().trim_matches('"').to_string());
        }
    }

    leases
}

/// `<weekday> <yyyy/mm/dd> <hh:mm:ss>`, or `never`
fn lease_time(value: &str) -> Option<NaiveDateTime> {
    let mut parts = value.split_whitespace();
    let _weekday = parts.next()?;
    let date = parts.next()?;
    let time = parts.next()?;
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), LEASE_TIME_FORMAT).ok()
}
