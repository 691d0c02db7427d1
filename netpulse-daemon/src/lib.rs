#![forbid(unsafe_code)]

// Runtime around netpulse-core: where samples come from, when they are taken,
// and how results reach a renderer.
pub mod config_manager;
pub mod errors; // Error types for the monitor runtime
pub mod event_system;
pub mod host;
pub mod sampler;
pub mod scheduler;

pub use config_manager::{ConfigManager, ConfigResponse};
pub use errors::{MonitorError, Result};
pub use event_system::{EventSystem, MonitorEvent};
pub use host::{MemoryHost, SettingsHost};
pub use sampler::{FnSampler, Sampler, SimulatedSampler};
pub use scheduler::Scheduler;
