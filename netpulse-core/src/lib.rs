#![forbid(unsafe_code)]

//! Netpulse core: network quality analysis
//!
//! - Per-metric sample histories (`history`)
//! - Composite 0–100 quality score (`quality`)
//! - Sustained latency trend and transient spike detectors (`trend`, `spike`)
//! - Live chart buffer and the read model handed to renderers (`chart`, `summary`)
//! - `NetworkAnalyzer`, the single owner of all of the above
//!
//! The core does no I/O: samples come in, scores and events come out.

pub mod analyzer;
pub mod chart;
pub mod config;
pub mod error;
pub mod history;
pub mod quality;
pub mod spike;
pub mod summary;
pub mod trend;
pub mod types;

pub use analyzer::{EventLogs, NetworkAnalyzer, TickReport};
pub use config::{AnalyzerConfig, CoreConfig};
pub use error::{Error, Result};
pub use quality::{QualityBreakdown, QualityScorer};
pub use spike::{SpikeDetector, SpikeEvent, SpikeTransition};
pub use summary::Snapshot;
pub use trend::{TrendDetector, TrendEvent, TrendTransition};
pub use types::{Metric, Sample, TimestampMs};
