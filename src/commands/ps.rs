//! `hostmon ps`: one-off process listing.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::system_monitor::{ProcessInfo, SnapshotCollector};
use crate::platform::OsProvider;
use crate::ui::format_size;

/// Execute the ps command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let sort = matches
        .get_one::<String>("sort")
        .context("Sort argument is required")?;
    let limit = matches.get_one::<usize>("limit").copied().unwrap_or(10);
    let reverse = matches.get_flag("reverse");
    let json_output = matches.get_flag("json");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let processes = runtime.block_on(async {
        let collector = SnapshotCollector::new(Arc::new(OsProvider::new()));

        // CPU usage needs two samples
        collector.processes(sort, limit, reverse).await?;
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        collector.processes(sort, limit, reverse).await
    })?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&processes)?);
    } else {
        print_table(&processes);
    }

    Ok(())
}

fn print_table(processes: &[ProcessInfo]) {
    println!(
        "{}",
        format!(
            "{:>8} {:<28} {:>7} {:>10} {}",
            "PID", "NAME", "CPU%", "MEM", "STATUS"
        )
        .bold()
    );

    for process in processes {
        println!(
            "{:>8} {:<28} {:>7.1} {:>10} {}",
            process.pid,
            truncate(&process.name, 28),
            process.cpu_percent,
            format_size(process.memory_bytes),
            process.status.dimmed()
        );
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}
