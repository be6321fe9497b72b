//! Monitor engine.
//!
//! Owns the lifecycle state, the configuration and the cycle timer, and runs
//! the collect → evaluate → emit cycle. The engine itself is not shared: all
//! operations take `&mut self`, and [`super::runtime::MonitorRuntime`] is the
//! single task that owns it when the timer should fire on its own.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::core::config::Config;
use crate::error::{MonitorError, Result};

use super::alerts::{evaluate, Breach};
use super::collector::{Collection, CollectorConfig, SnapshotCollector};
use super::events::{Event, EventEmitter, EventKind, Listener};
use super::metrics::ProcessInfo;
use super::provider::{Clock, SystemClock, SystemProvider};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    Destroyed,
}

enum Timer {
    Idle,
    /// A single cycle, for a zero interval
    Once,
    Every {
        first: Instant,
        period: Duration,
        ticker: Option<Interval>,
    },
}

/// What one cycle did
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Events delivered to every listener
    pub emitted: Vec<EventKind>,
    pub breaches: Vec<Breach>,
    /// Optional providers that failed
    pub warnings: Vec<MonitorError>,
    pub listener_errors: Vec<MonitorError>,
}

/// Builder for [`MonitorEngine`]
pub struct MonitorEngineBuilder {
    provider: Arc<dyn SystemProvider>,
    collector: CollectorConfig,
    defaults: Config,
    clock: Arc<dyn Clock>,
}

impl MonitorEngineBuilder {
    pub fn collector_config(mut self, config: CollectorConfig) -> Self {
        self.collector = config;
        self
    }

    /// Configuration used initially and restored by `reset()`
    pub fn defaults(mut self, defaults: Config) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> MonitorEngine {
        MonitorEngine {
            state: EngineState::Stopped,
            config: Arc::new(self.defaults.clone()),
            defaults: self.defaults,
            collector: SnapshotCollector::with_config(self.provider, self.collector),
            emitter: EventEmitter::new(self.clock),
            timer: Timer::Idle,
        }
    }
}

/// Sampling, threshold and event engine
pub struct MonitorEngine {
    state: EngineState,
    config: Arc<Config>,
    defaults: Config,
    collector: SnapshotCollector,
    emitter: EventEmitter,
    timer: Timer,
}

impl MonitorEngine {
    /// Engine with default configuration and the wall clock
    pub fn new(provider: Arc<dyn SystemProvider>) -> Self {
        Self::builder(provider).build()
    }

    pub fn builder(provider: Arc<dyn SystemProvider>) -> MonitorEngineBuilder {
        MonitorEngineBuilder {
            provider,
            collector: CollectorConfig::default(),
            defaults: Config::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Current configuration (read-only)
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn collector(&self) -> &SnapshotCollector {
        &self.collector
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.emitter.on(kind, listener);
    }

    pub fn on_any<F>(&mut self, listener: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.emitter.on_any(listener);
    }

    pub(crate) fn subscribe(&mut self, kind: Option<EventKind>, listener: Listener) {
        self.emitter.subscribe(kind, listener);
    }

    /// Start (or restart) sampling.
    ///
    /// Options are validated before anything changes, so a rejected call
    /// leaves the engine as it was. `start` is only emitted on the transition
    /// into `Running`.
    pub fn start(&mut self, options: Option<&Value>) -> Result<()> {
        self.ensure_alive()?;
        let update = match options {
            Some(options) => Some(self.config.apply(options)?),
            None => None,
        };

        self.timer = Timer::Idle;

        let mut outcome = Ok(());
        if let Some((config, patch)) = update {
            keep_first(&mut outcome, self.replace_config(config, patch.to_value()));
        }

        self.arm_timer();

        if self.state != EngineState::Running {
            self.state = EngineState::Running;
            log::info!(
                "Monitor started (interval {}ms, silent: {})",
                self.config.interval_ms,
                self.config.silent
            );
            keep_first(&mut outcome, self.emit(EventKind::Start, Map::new()));
        }

        outcome
    }

    /// Stop sampling. Emits `stop` only when the engine was running.
    pub fn stop(&mut self) -> Result<()> {
        self.timer = Timer::Idle;

        if self.state == EngineState::Running {
            self.state = EngineState::Stopped;
            log::info!("Monitor stopped");
            self.emit(EventKind::Stop, Map::new())?;
        }

        Ok(())
    }

    /// Emit `reset` and restore the default configuration.
    ///
    /// A running engine re-arms its timer with the defaults.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_alive()?;

        let mut outcome = self.emit(EventKind::Reset, Map::new());
        let defaults = self.defaults.clone();
        let options = defaults.to_value();
        keep_first(&mut outcome, self.replace_config(defaults, options));

        if self.is_running() {
            self.arm_timer();
        }

        outcome
    }

    /// Emit `destroy`, stop, and refuse any further start.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == EngineState::Destroyed {
            return Ok(());
        }

        let mut outcome = self.emit(EventKind::Destroy, Map::new());
        keep_first(&mut outcome, self.stop());
        self.state = EngineState::Destroyed;
        log::info!("Monitor destroyed");

        outcome
    }

    /// Validate and merge `options` into the current configuration.
    ///
    /// A running engine whose interval changed re-arms its timer.
    pub fn configure(&mut self, options: &Value) -> Result<Arc<Config>> {
        self.ensure_alive()?;

        let (config, patch) = self.config.apply(options)?;
        let rearm = self.is_running()
            && (config.interval_ms != self.config.interval_ms
                || config.immediate != self.config.immediate);

        let outcome = self.replace_config(config, patch.to_value());
        if rearm {
            self.arm_timer();
        }
        outcome?;

        Ok(self.config())
    }

    /// Wait until the timer wants the next cycle.
    ///
    /// Never completes while no timer is armed. Cancel safe.
    pub async fn next_tick(&mut self) {
        if let Timer::Once = self.timer {
            self.timer = Timer::Idle;
            return;
        }

        match &mut self.timer {
            Timer::Every {
                first,
                period,
                ticker,
            } => {
                let ticker = ticker.get_or_insert_with(|| {
                    let mut interval = time::interval_at(*first, *period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    interval
                });
                ticker.tick().await;
            }
            Timer::Idle | Timer::Once => std::future::pending::<()>().await,
        }
    }

    /// Run one collect → evaluate → emit cycle.
    ///
    /// Fails only when host facts cannot be read; in that case nothing is
    /// emitted. Listener failures are reported without stopping the
    /// remaining emissions.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.ensure_alive()?;
        let config = Arc::clone(&self.config);

        let Collection { snapshot, warnings } = self.collector.collect().await?;

        let mut report = CycleReport {
            warnings,
            ..Default::default()
        };
        let payload = snapshot.to_payload();

        if !config.silent {
            self.deliver(&mut report, EventKind::Regular, payload.clone());
        }

        for breach in evaluate(&snapshot, &config.thresholds) {
            let mut payload = payload.clone();
            if let Some(mount) = &breach.mount {
                payload.insert("mount".into(), Value::from(mount.as_str()));
            }
            self.deliver(&mut report, breach.kind, payload);
            report.breaches.push(breach);
        }

        log::debug!(
            "Cycle done: {} event(s), {} breach(es), {} unavailable source(s)",
            report.emitted.len(),
            report.breaches.len(),
            report.warnings.len()
        );

        Ok(report)
    }

    /// Query the process table, independent of the cycle
    pub async fn processes(
        &self,
        sort: &str,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<ProcessInfo>> {
        self.collector.processes(sort, limit, reverse).await
    }

    fn arm_timer(&mut self) {
        let config = &self.config;
        self.timer = if config.interval_ms == 0 {
            Timer::Once
        } else {
            let period = config.interval();
            let now = Instant::now();
            Timer::Every {
                first: if config.immediate { now } else { now + period },
                period,
                ticker: None,
            }
        };
    }

    fn replace_config(&mut self, config: Config, options: Value) -> Result<()> {
        self.config = Arc::new(config);

        let mut payload = match self.config.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        payload.insert("options".into(), options);
        self.emit(EventKind::Config, payload).map(|_| ())
    }

    fn deliver(&mut self, report: &mut CycleReport, kind: EventKind, payload: Map<String, Value>) {
        match self.emitter.emit(kind, payload) {
            Ok(_) => report.emitted.push(kind),
            Err(e) => report.listener_errors.push(e),
        }
    }

    fn emit(&mut self, kind: EventKind, payload: Map<String, Value>) -> Result<()> {
        self.emitter.emit(kind, payload).map(|_| ())
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state == EngineState::Destroyed {
            return Err(MonitorError::AlreadyDestroyed);
        }
        Ok(())
    }
}

fn keep_first(outcome: &mut Result<()>, next: Result<()>) {
    if outcome.is_ok() {
        *outcome = next;
    }
}
