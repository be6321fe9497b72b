//! Event types and the synchronous publish/subscribe channel.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::provider::Clock;
use crate::error::{MonitorError, Result};

/// Kinds of events the monitor emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "destroy")]
    Destroy,
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "config")]
    Config,
    #[serde(rename = "regular")]
    Regular,
    #[serde(rename = "threshold-loadavg1")]
    LoadAvg1,
    #[serde(rename = "threshold-loadavg5")]
    LoadAvg5,
    #[serde(rename = "threshold-loadavg15")]
    LoadAvg15,
    #[serde(rename = "threshold-freemem")]
    FreeMem,
    #[serde(rename = "threshold-freedisk")]
    FreeDisk,
    #[serde(rename = "threshold-uptime")]
    Uptime,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::Start,
        EventKind::Stop,
        EventKind::Destroy,
        EventKind::Reset,
        EventKind::Config,
        EventKind::Regular,
        EventKind::LoadAvg1,
        EventKind::LoadAvg5,
        EventKind::LoadAvg15,
        EventKind::FreeMem,
        EventKind::FreeDisk,
        EventKind::Uptime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Destroy => "destroy",
            EventKind::Reset => "reset",
            EventKind::Config => "config",
            EventKind::Regular => "regular",
            EventKind::LoadAvg1 => "threshold-loadavg1",
            EventKind::LoadAvg5 => "threshold-loadavg5",
            EventKind::LoadAvg15 => "threshold-loadavg15",
            EventKind::FreeMem => "threshold-freemem",
            EventKind::FreeDisk => "threshold-freedisk",
            EventKind::Uptime => "threshold-uptime",
        }
    }

    pub fn is_threshold(&self) -> bool {
        matches!(
            self,
            EventKind::LoadAvg1
                | EventKind::LoadAvg5
                | EventKind::LoadAvg15
                | EventKind::FreeMem
                | EventKind::FreeDisk
                | EventKind::Uptime
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MonitorError::invalid_argument(format!("unknown event kind '{}'", s)))
    }
}

/// A timestamped event record
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Full record, including `type` and `timestamp`
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

/// Event callback. Returning an error aborts delivery of that event.
pub type Listener = Box<dyn FnMut(&Event) -> anyhow::Result<()> + Send>;

/// Synchronous publish/subscribe channel.
///
/// Listeners run on the emitting call, in registration order.
pub struct EventEmitter {
    listeners: Vec<(Option<EventKind>, Listener)>,
    clock: Arc<dyn Clock>,
}

impl EventEmitter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            listeners: Vec::new(),
            clock,
        }
    }

    /// Subscribe to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.listeners.push((Some(kind), Box::new(listener)));
    }

    /// Subscribe to every event
    pub fn on_any<F>(&mut self, listener: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.listeners.push((None, Box::new(listener)));
    }

    pub(crate) fn subscribe(&mut self, kind: Option<EventKind>, listener: Listener) {
        self.listeners.push((kind, listener));
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|(filter, _)| filter.map_or(true, |k| k == kind))
            .count()
    }

    /// Stamp `payload` and deliver it.
    ///
    /// `type` is filled in from `kind` unless the payload carries one;
    /// `timestamp` is always overwritten.
    pub fn emit(&mut self, kind: EventKind, payload: Map<String, Value>) -> Result<Event> {
        let timestamp = self.clock.now_millis().div_euclid(1000);

        let mut record = payload;
        record
            .entry("type")
            .or_insert_with(|| Value::from(kind.as_str()));
        record.insert("timestamp".into(), Value::from(timestamp));

        let event = Event {
            kind,
            timestamp,
            payload: record,
        };

        for (filter, listener) in self.listeners.iter_mut() {
            if filter.is_some_and(|k| k != kind) {
                continue;
            }
            if let Err(e) = listener(&event) {
                log::error!("Listener for '{}' failed: {:#}", kind, e);
                return Err(MonitorError::listener(kind.as_str(), format!("{:#}", e)));
            }
        }

        Ok(event)
    }
}
