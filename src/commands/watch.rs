//! `hostmon watch`: run the monitor and print its events.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use colored::*;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::core::system_monitor::{
    CollectorConfig, Event, MonitorEngine, MonitorHandle, MonitorRuntime, ProcessQuery,
};
use crate::platform::OsProvider;
use crate::ui::format_event;

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let options = build_options(matches);
    let collector = build_collector_config(matches);
    let json_output = matches.get_flag("json");
    let once = matches.get_flag("once");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(options, collector, json_output, once))
}

/// Map command line flags onto a monitor options record
fn build_options(matches: &ArgMatches) -> Value {
    let mut options = Map::new();

    if matches.get_flag("once") {
        options.insert("interval".into(), json!(0));
    } else if let Some(&interval) = matches.get_one::<u64>("interval") {
        options.insert("interval".into(), json!(interval));
    }
    if matches.get_flag("silent") {
        options.insert("silent".into(), json!(true));
    }
    if matches.get_flag("immediate") {
        options.insert("immediate".into(), json!(true));
    }

    let mut threshold = Map::new();
    if let Some(values) = matches.get_many::<f64>("loadavg") {
        let values: Vec<f64> = values.copied().collect();
        let limit = match values.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        threshold.insert("loadavg".into(), limit);
    }
    if let Some(&freemem) = matches.get_one::<f64>("freemem") {
        threshold.insert("freemem".into(), json!(freemem));
    }
    if let Some(&freedisk) = matches.get_one::<f64>("freedisk") {
        threshold.insert("freedisk".into(), json!(freedisk));
    }
    if let Some(&uptime) = matches.get_one::<u64>("uptime") {
        threshold.insert("uptime".into(), json!(uptime));
    }
    if !threshold.is_empty() {
        options.insert("threshold".into(), Value::Object(threshold));
    }

    Value::Object(options)
}

fn build_collector_config(matches: &ArgMatches) -> CollectorConfig {
    let mut config = CollectorConfig {
        collect_disks: !matches.get_flag("no-disks"),
        collect_processes: !matches.get_flag("no-processes"),
        collect_services: matches.get_flag("services"),
        processes: ProcessQuery {
            limit: matches.get_one::<usize>("top").copied().unwrap_or(10),
            ..Default::default()
        },
        ..Default::default()
    };

    if let Some(file) = matches.get_one::<String>("leases") {
        config.collect_leases = true;
        config.lease_file = PathBuf::from(file);
    }

    config
}

async fn run(options: Value, collector: CollectorConfig, json_output: bool, once: bool) -> Result<()> {
    let provider = Arc::new(OsProvider::new());
    let mut engine = MonitorEngine::builder(provider)
        .collector_config(collector)
        .build();
    engine.on_any(move |event| print_event(event, json_output));

    let mut monitor = MonitorRuntime::spawn(engine);
    let handle = monitor.handle();

    if once {
        let outcome = run_once(&handle, options).await;
        monitor.shutdown().await;
        return outcome;
    }

    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    handle
        .start(Some(options))
        .await
        .context("Failed to start monitor")?;

    if !json_output {
        println!("{}", "Press Ctrl+C to stop".dimmed());
    }

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            error = monitor.next_error() => match error {
                Some(e) => eprintln!("{} {}", "error:".red().bold(), e),
                None => break,
            },
        }
    }

    if let Err(e) = handle.destroy().await {
        log::warn!("Destroy reported: {}", e);
    }
    monitor.shutdown().await;

    Ok(())
}

/// Validate the options, run exactly one cycle and tear down
async fn run_once(handle: &MonitorHandle, options: Value) -> Result<()> {
    handle
        .configure(options)
        .await
        .context("Invalid monitor options")?;

    let report = handle.sample().await.context("Cycle failed")?;
    for e in &report.listener_errors {
        eprintln!("{} {}", "error:".red().bold(), e);
    }

    handle.destroy().await?;
    Ok(())
}

fn print_event(event: &Event, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string(&event.to_value())?);
    } else {
        println!("{}", format_event(event));
    }
    Ok(())
}
