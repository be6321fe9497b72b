// Shared fixtures: a scriptable provider, a fixed clock and an event recorder

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hostmon::core::system_monitor::{
    Clock, CollectorConfig, DiskUsage, Event, EventKind, HostFacts, MonitorEngine, ProcessInfo,
    SystemProvider,
};
use hostmon::{MonitorError, Result};
use parking_lot::Mutex;

pub struct FakeHost {
    pub facts: Mutex<HostFacts>,
    /// `None` makes the disk provider fail
    pub disks: Mutex<Option<BTreeMap<String, DiskUsage>>>,
    pub processes: Mutex<Vec<ProcessInfo>>,
    pub fail_host: AtomicBool,
    /// Paused-clock time a host read takes; needs `start_paused`
    host_delay: Mutex<Duration>,
    pub host_calls: AtomicUsize,
}

impl FakeHost {
    /// 4 cores, 1000 bytes of memory with 400 free, up one hour
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            facts: Mutex::new(HostFacts {
                hostname: "test-host".into(),
                uptime_secs: 3600,
                loadavg: [0.5, 0.5, 0.5],
                cpus: 4,
                total_memory: 1000,
                free_memory: 400,
            }),
            disks: Mutex::new(Some(BTreeMap::new())),
            processes: Mutex::new(Vec::new()),
            fail_host: AtomicBool::new(false),
            host_delay: Mutex::new(Duration::ZERO),
            host_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_loadavg(&self, loadavg: [f64; 3]) {
        self.facts.lock().loadavg = loadavg;
    }

    pub fn set_disk(&self, mount: &str, total: u64, free: u64) {
        let usage = DiskUsage {
            total,
            used: total - free,
            free,
            percent: ((total - free) as f32 / total as f32) * 100.0,
        };
        self.disks
            .lock()
            .get_or_insert_with(BTreeMap::new)
            .insert(mount.to_string(), usage);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.host_delay.lock() = delay;
    }

    pub fn fail_disks(&self) {
        *self.disks.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.host_calls.load(Ordering::SeqCst)
    }
}

impl SystemProvider for FakeHost {
    fn host_facts(&self) -> Result<HostFacts> {
        self.host_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.host_delay.lock();
        if !delay.is_zero() {
            // Runs on the blocking pool, which holds the paused clock still
            tokio::runtime::Handle::current().block_on(tokio::time::advance(delay));
        }
        if self.fail_host.load(Ordering::SeqCst) {
            return Err(MonitorError::collection_failed("host facts unreadable"));
        }
        Ok(self.facts.lock().clone())
    }

    fn disk_usage(&self) -> Result<BTreeMap<String, DiskUsage>> {
        self.disks
            .lock()
            .clone()
            .ok_or_else(|| MonitorError::provider_unavailable("disks", "df failed"))
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        Ok(self.processes.lock().clone())
    }
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Records every delivered event
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn attach(&self, engine: &mut MonitorEngine) {
        let events = Arc::clone(&self.events);
        engine.on_any(move |event| {
            events.lock().push(event.clone());
            Ok(())
        });
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    pub fn of(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of(kind).len()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Engine over `host` with a fixed clock, only disks collected
pub fn engine_with(host: &Arc<FakeHost>) -> (MonitorEngine, Recorder) {
    let collector = CollectorConfig {
        collect_processes: false,
        provider_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let mut engine = MonitorEngine::builder(host.clone())
        .collector_config(collector)
        .clock(Arc::new(FixedClock(1_700_000_000_500)))
        .build();

    let recorder = Recorder::default();
    recorder.attach(&mut engine);
    (engine, recorder)
}
