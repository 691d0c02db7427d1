//! Read model handed to renderers, plus the small classifications the
//! dashboard shows next to the raw numbers.

use serde::{Deserialize, Serialize};

use crate::chart::ChartPoint;
use crate::history::MetricHistory;
use crate::spike::SpikeEvent;
use crate::trend::{ActiveTrend, TrendEvent};
use crate::types::{Sample, TimestampMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityClass {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityClass {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => QualityClass::Excellent,
            70..=89 => QualityClass::Good,
            50..=69 => QualityClass::Fair,
            _ => QualityClass::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityClass::Excellent => "excellent",
            QualityClass::Good => "good",
            QualityClass::Fair => "fair",
            QualityClass::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyLevel {
    Normal,
    Medium,
    High,
    Critical,
}

impl LatencyLevel {
    pub fn from_latency(latency: f64) -> Self {
        if latency > 100.0 {
            LatencyLevel::Critical
        } else if latency > 70.0 {
            LatencyLevel::High
        } else if latency > 50.0 {
            LatencyLevel::Medium
        } else {
            LatencyLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyLevel::Normal => "normal",
            LatencyLevel::Medium => "medium",
            LatencyLevel::High => "high",
            LatencyLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeSeverity {
    Low,
    Medium,
    High,
}

impl SpikeSeverity {
    pub fn from_value(value: f64) -> Self {
        if value < 40.0 {
            SpikeSeverity::Low
        } else if value < 100.0 {
            SpikeSeverity::Medium
        } else {
            SpikeSeverity::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    InsufficientData,
    VeryStable,
    Stable,
    Moderate,
    Unstable,
}

impl Stability {
    /// Needs at least 10 latency samples; rates the mean of the latency and
    /// jitter standard deviations.
    pub fn assess(latency: &MetricHistory, jitter: &MetricHistory) -> Self {
        if latency.len() < 10 {
            return Stability::InsufficientData;
        }
        let score = (latency.std_deviation() + jitter.std_deviation()) / 2.0;
        if score < 5.0 {
            Stability::VeryStable
        } else if score < 15.0 {
            Stability::Stable
        } else if score < 30.0 {
            Stability::Moderate
        } else {
            Stability::Unstable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::InsufficientData => "Insufficient data",
            Stability::VeryStable => "Very stable",
            Stability::Stable => "Stable",
            Stability::Moderate => "Moderate",
            Stability::Unstable => "Unstable",
        }
    }
}

/// `"just now"`, `"12s ago"`, `"3m ago"`.
pub fn age_text(age_ms: u64) -> String {
    if age_ms < 1_000 {
        "just now".to_string()
    } else if age_ms < 60_000 {
        format!("{}s ago", age_ms / 1_000)
    } else {
        format!("{}m ago", age_ms / 60_000)
    }
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 { format!("{n} {one}") } else { format!("{n} {many}") }
}

/// Human text for how long monitoring has been running.
pub fn elapsed_text(elapsed_ms: u64) -> String {
    let minutes = elapsed_ms / 60_000;
    if minutes < 1 {
        return "just started".to_string();
    }
    if minutes < 60 {
        return format!("last {}", plural(minutes, "minute", "minutes"));
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("last {}", plural(hours, "hour", "hours"))
    } else {
        format!("last {} {}", plural(hours, "hour", "hours"), plural(rest, "minute", "minutes"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeView {
    pub value: f64,
    pub baseline: f64,
    pub severity: SpikeSeverity,
    pub age: String,
    pub active: bool,
    pub history: Vec<f64>,
}

impl SpikeView {
    pub fn new(spike: &SpikeEvent, now: TimestampMs) -> Self {
        Self {
            value: spike.value,
            baseline: spike.baseline,
            severity: SpikeSeverity::from_value(spike.value),
            age: age_text(now.since(spike.timestamp)),
            active: spike.active,
            history: spike.history.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub latency: f64,
    pub jitter: f64,
    pub packet_loss: f64,
    pub quality_score: f64,
}

/// Everything a renderer needs after a tick. Never fed back into the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: TimestampMs,
    pub latest: Option<Sample>,
    pub quality_score: Option<u8>,
    pub quality_class: Option<QualityClass>,
    pub latency_level: Option<LatencyLevel>,
    pub averages: Averages,
    pub sample_count: usize,
    pub stability: Stability,
    /// Newest first.
    pub trends: Vec<TrendEvent>,
    pub active_trend: Option<ActiveTrend>,
    /// Newest first.
    pub spikes: Vec<SpikeView>,
    pub elapsed: String,
    /// On-screen chart series, oldest first; includes interpolated points.
    pub chart: Vec<ChartPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    #[test]
    fn quality_classes() {
        assert_eq!(QualityClass::from_score(100), QualityClass::Excellent);
        assert_eq!(QualityClass::from_score(90), QualityClass::Excellent);
        assert_eq!(QualityClass::from_score(89), QualityClass::Good);
        assert_eq!(QualityClass::from_score(50), QualityClass::Fair);
        assert_eq!(QualityClass::from_score(49), QualityClass::Poor);
    }

    #[test]
    fn latency_levels() {
        assert_eq!(LatencyLevel::from_latency(50.0), LatencyLevel::Normal);
        assert_eq!(LatencyLevel::from_latency(50.5), LatencyLevel::Medium);
        assert_eq!(LatencyLevel::from_latency(71.0), LatencyLevel::High);
        assert_eq!(LatencyLevel::from_latency(101.0), LatencyLevel::Critical);
    }

    #[test]
    fn ages_and_elapsed() {
        assert_eq!(age_text(999), "just now");
        assert_eq!(age_text(12_500), "12s ago");
        assert_eq!(age_text(185_000), "3m ago");
        assert_eq!(elapsed_text(59_999), "just started");
        assert_eq!(elapsed_text(60_000), "last 1 minute");
        assert_eq!(elapsed_text(45 * 60_000), "last 45 minutes");
        assert_eq!(elapsed_text(60 * 60_000), "last 1 hour");
        assert_eq!(elapsed_text(121 * 60_000), "last 2 hours 1 minute");
        assert_eq!(elapsed_text(135 * 60_000), "last 2 hours 15 minutes");
    }

    #[test]
    fn stability_needs_ten_samples() {
        let mut lat = MetricHistory::new(Metric::Latency, 100);
        let mut jit = MetricHistory::new(Metric::Jitter, 100);
        for _ in 0..9 {
            lat.record(20.0).unwrap();
            jit.record(1.0).unwrap();
        }
        assert_eq!(Stability::assess(&lat, &jit), Stability::InsufficientData);
        lat.record(20.0).unwrap();
        assert_eq!(Stability::assess(&lat, &jit), Stability::VeryStable);
        for v in [200.0, 5.0, 250.0, 10.0] {
            lat.record(v).unwrap();
        }
        assert_eq!(Stability::assess(&lat, &jit), Stability::Unstable);
    }
}
