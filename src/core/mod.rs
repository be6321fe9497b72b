// Core monitoring logic

pub mod config;
pub mod system_monitor;

// Re-export commonly used items
pub use config::{validate, Config, ConfigPatch, Limit, ThresholdSet};
pub use system_monitor::{MonitorEngine, MonitorRuntime};
