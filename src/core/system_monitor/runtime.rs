//! Owner task for a [`MonitorEngine`].
//!
//! The engine lives inside one spawned task. Public operations arrive as
//! commands over a channel and are handled one at a time, interleaved with
//! timer ticks, so configuration and state are never touched concurrently.
//! A cycle runs to completion inside the task; ticks that come due meanwhile
//! are skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::config::Config;
use crate::error::{MonitorError, Result};

use super::collector::SnapshotCollector;
use super::engine::{CycleReport, EngineState, MonitorEngine};
use super::events::{Event, EventKind, Listener};
use super::metrics::ProcessInfo;

const COMMAND_BUFFER: usize = 32;

enum Command {
    Start {
        options: Option<Value>,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<Result<()>>,
    },
    Reset {
        reply: oneshot::Sender<Result<()>>,
    },
    Destroy {
        reply: oneshot::Sender<Result<()>>,
    },
    Configure {
        options: Value,
        reply: oneshot::Sender<Result<Arc<Config>>>,
    },
    Config {
        reply: oneshot::Sender<Arc<Config>>,
    },
    State {
        reply: oneshot::Sender<EngineState>,
    },
    Subscribe {
        kind: Option<EventKind>,
        listener: Listener,
        reply: oneshot::Sender<()>,
    },
    Sample {
        reply: oneshot::Sender<Result<CycleReport>>,
    },
}

/// Cloneable handle for talking to a running monitor
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    collector: SnapshotCollector,
}

impl MonitorHandle {
    pub async fn start(&self, options: Option<Value>) -> Result<()> {
        self.request(|reply| Command::Start { options, reply }).await?
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    pub async fn destroy(&self) -> Result<()> {
        self.request(|reply| Command::Destroy { reply }).await?
    }

    pub async fn configure(&self, options: Value) -> Result<Arc<Config>> {
        self.request(|reply| Command::Configure { options, reply })
            .await?
    }

    pub async fn config(&self) -> Result<Arc<Config>> {
        self.request(|reply| Command::Config { reply }).await
    }

    pub async fn state(&self) -> Result<EngineState> {
        self.request(|reply| Command::State { reply }).await
    }

    pub async fn on<F>(&self, kind: EventKind, listener: F) -> Result<()>
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.subscribe(Some(kind), Box::new(listener)).await
    }

    pub async fn on_any<F>(&self, listener: F) -> Result<()>
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.subscribe(None, Box::new(listener)).await
    }

    /// Run one cycle now, outside the timer
    pub async fn sample(&self) -> Result<CycleReport> {
        self.request(|reply| Command::Sample { reply }).await?
    }

    /// Query the process table; does not go through the owner task
    pub async fn processes(
        &self,
        sort: &str,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<ProcessInfo>> {
        self.collector.processes(sort, limit, reverse).await
    }

    async fn subscribe(&self, kind: Option<EventKind>, listener: Listener) -> Result<()> {
        self.request(|reply| Command::Subscribe {
            kind,
            listener,
            reply,
        })
        .await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::RuntimeClosed)?;
        response.await.map_err(|_| MonitorError::RuntimeClosed)
    }
}

/// A monitor engine running in its own task.
///
/// Cycle failures (host facts unreadable, listener errors, overruns) are
/// delivered on the error channel.
pub struct MonitorRuntime {
    handle: MonitorHandle,
    errors: mpsc::UnboundedReceiver<MonitorError>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorRuntime {
    /// Spawn the owner task on the current Tokio runtime.
    pub fn spawn(engine: MonitorEngine) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let handle = MonitorHandle {
            commands: commands_tx,
            collector: engine.collector().clone(),
        };
        let task = tokio::spawn(engine_task(
            engine,
            commands_rx,
            errors_tx,
            shutdown_tx.subscribe(),
        ));

        Self {
            handle,
            errors: errors_rx,
            shutdown_tx,
            task,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Wait for the next cycle error
    pub async fn next_error(&mut self) -> Option<MonitorError> {
        self.errors.recv().await
    }

    pub fn try_next_error(&mut self) -> Option<MonitorError> {
        self.errors.try_recv().ok()
    }

    /// Stop the owner task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            log::error!("Monitor task ended abnormally: {}", e);
        }
    }
}

async fn engine_task(
    mut engine: MonitorEngine,
    mut commands: mpsc::Receiver<Command>,
    errors: mpsc::UnboundedSender<MonitorError>,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::debug!("Monitor task started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut engine, command).await,
                None => break,
            },
            _ = engine.next_tick() => {
                run_scheduled_cycle(&mut engine, &errors).await;
            }
            _ = shutdown.recv() => break,
        }
    }

    log::debug!("Monitor task shutting down");
}

async fn handle_command(engine: &mut MonitorEngine, command: Command) {
    // A dropped reply receiver only means the caller stopped waiting
    match command {
        Command::Start { options, reply } => {
            let _ = reply.send(engine.start(options.as_ref()));
        }
        Command::Stop { reply } => {
            let _ = reply.send(engine.stop());
        }
        Command::Reset { reply } => {
            let _ = reply.send(engine.reset());
        }
        Command::Destroy { reply } => {
            let _ = reply.send(engine.destroy());
        }
        Command::Configure { options, reply } => {
            let _ = reply.send(engine.configure(&options));
        }
        Command::Config { reply } => {
            let _ = reply.send(engine.config());
        }
        Command::State { reply } => {
            let _ = reply.send(engine.state());
        }
        Command::Subscribe {
            kind,
            listener,
            reply,
        } => {
            engine.subscribe(kind, listener);
            let _ = reply.send(());
        }
        Command::Sample { reply } => {
            let _ = reply.send(engine.run_cycle().await);
        }
    }
}

async fn run_scheduled_cycle(engine: &mut MonitorEngine, errors: &mpsc::UnboundedSender<MonitorError>) {
    let interval_ms = engine.config().interval_ms;
    let started = Instant::now();

    match engine.run_cycle().await {
        Ok(report) => {
            for e in report.listener_errors {
                let _ = errors.send(e);
            }
        }
        Err(e) => {
            log::error!("Cycle aborted: {}", e);
            let _ = errors.send(e);
        }
    }

    let elapsed = started.elapsed();
    if interval_ms > 0 && elapsed > Duration::from_millis(interval_ms) {
        let overrun = MonitorError::CycleOverrun {
            elapsed_ms: elapsed.as_millis() as u64,
            interval_ms,
        };
        log::warn!("{}", overrun);
        let _ = errors.send(overrun);
    }
}
