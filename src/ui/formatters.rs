use chrono::{DateTime, Local};
use colored::*;
use humansize::{format_size as human_format_size, DECIMAL};
use serde_json::Value;

use crate::core::system_monitor::{Event, EventKind};

/// Format a byte count with decimal units (kB, MB, GB)
pub fn format_size(bytes: u64) -> String {
    human_format_size(bytes, DECIMAL)
}

/// Format a Unix timestamp (seconds) as local HH:MM:SS
pub fn format_time(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

/// Format seconds as e.g. `2d 3h 4m`
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// One-line, colored rendering of an event
pub fn format_event(event: &Event) -> String {
    let time = format_time(event.timestamp).dimmed();
    let label = format!("{:<20}", event.kind.as_str());

    let (label, detail) = match event.kind {
        EventKind::Regular => (label.green(), host_summary(event)),
        EventKind::Config => (label.cyan(), config_summary(event)),
        kind if kind.is_threshold() => (label.yellow().bold(), breach_summary(event)),
        _ => (label.cyan().bold(), String::new()),
    };

    format!("{} {} {}", time, label, detail).trim_end().to_string()
}

fn host_summary(event: &Event) -> String {
    let loadavg = event
        .get("loadavg")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_f64)
                .map(|v| format!("{:.2}", v))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    format!(
        "{}  load {}  mem {} free of {}  up {}",
        event.get("hostname").and_then(Value::as_str).unwrap_or("?"),
        loadavg,
        format_size(u64_field(event, "freemem")),
        format_size(u64_field(event, "totalmem")),
        format_duration(u64_field(event, "uptime"))
    )
}

fn breach_summary(event: &Event) -> String {
    match event.kind {
        EventKind::LoadAvg1 | EventKind::LoadAvg5 | EventKind::LoadAvg15 => {
            let index = match event.kind {
                EventKind::LoadAvg1 => 0,
                EventKind::LoadAvg5 => 1,
                _ => 2,
            };
            let value = event
                .get("loadavg")
                .and_then(|v| v.get(index))
                .and_then(Value::as_f64)
                .unwrap_or_default();
            format!("load {:.2}", value)
        }
        EventKind::FreeMem => format!("free memory {}", format_size(u64_field(event, "freemem"))),
        EventKind::FreeDisk => {
            let mount = event.get("mount").and_then(Value::as_str).unwrap_or("?");
            let free = event
                .get("disks")
                .and_then(|disks| disks.get(mount))
                .and_then(|disk| disk.get("free"))
                .and_then(Value::as_u64)
                .unwrap_or_default();
            format!("{} has {} free", mount, format_size(free))
        }
        EventKind::Uptime => format!("up {}", format_duration(u64_field(event, "uptime"))),
        _ => String::new(),
    }
}

fn config_summary(event: &Event) -> String {
    format!(
        "interval {}ms{}",
        u64_field(event, "interval"),
        if event.get("silent").and_then(Value::as_bool) == Some(true) {
            ", silent"
        } else {
            ""
        }
    )
}

fn u64_field(event: &Event, key: &str) -> u64 {
    event.get(key).and_then(Value::as_u64).unwrap_or_default()
}
