use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Accepted polling interval range in milliseconds (inclusive).
pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// Trend detector thresholds. Latencies in ms, durations in ms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfig {
    /// Minimum step between consecutive samples that opens a trend, and minimum rise for a trend to be recorded.
    pub trend_threshold: f64,
    /// Latency at or below which an open trend ends immediately.
    pub baseline_threshold: f64,
    /// Latency at or below which an open trend ends once no new peak was seen for `normalized_hold_ms`.
    pub normalized_threshold: f64,
    pub normalized_hold_ms: u64,
    pub max_trend_duration_ms: u64,
    /// After `max_trend_duration_ms`, the trend ends when latency drops below `peak * peak_decay`.
    pub peak_decay: f64,
    pub min_trend_duration_ms: u64,
    pub log_capacity: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            trend_threshold: 30.0,
            baseline_threshold: 40.0,
            normalized_threshold: 60.0,
            normalized_hold_ms: 3000,
            max_trend_duration_ms: 10_000,
            peak_decay: 0.8,
            min_trend_duration_ms: 100,
            log_capacity: 10,
        }
    }
}

/// Spike detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpikeConfig {
    /// Non-zero chart points required before detection starts.
    pub warmup_samples: usize,
    /// Number of most recent non-zero chart points averaged into the baseline.
    pub baseline_window: usize,
    pub spike_multiplier: f64,
    /// "Normal" latency; anything above twice this is a candidate regardless of baseline.
    pub normal_latency: f64,
    pub minimum_spike_value: f64,
    /// Escalation factor over the active spike's value.
    pub update_factor: f64,
    /// An active spike closes once latency is back within `baseline * return_factor`.
    pub return_factor: f64,
    pub cooldown_ms: u64,
    /// Sparkline ring capacity attached to every spike.
    pub history_size: usize,
    pub log_capacity: usize,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            warmup_samples: 10,
            baseline_window: 10,
            spike_multiplier: 1.8,
            normal_latency: 30.0,
            minimum_spike_value: 45.0,
            update_factor: 1.1,
            return_factor: 1.2,
            cooldown_ms: 5000,
            history_size: 30,
            log_capacity: 30,
        }
    }
}

/// Weights and shape constants of the composite quality score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub current_latency_weight: f64,
    pub historical_weight: f64,
    pub spike_weight: f64,
    pub packet_loss_weight: f64,
    /// Latency penalty divisor: `(100 - latency) / latency_divisor`.
    pub latency_divisor: f64,
    pub spike_impact_divisor: f64,
    pub recent_loss_window: usize,
    pub recent_loss_factor: f64,
    pub loss_penalty: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            current_latency_weight: 0.25,
            historical_weight: 0.25,
            spike_weight: 0.30,
            packet_loss_weight: 0.20,
            latency_divisor: 0.8,
            spike_impact_divisor: 1000.0,
            recent_loss_window: 10,
            recent_loss_factor: 1.5,
            loss_penalty: 20.0,
        }
    }
}

/// Shape of the live chart buffer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub visible_points: usize,
    pub padding_points: usize,
    /// Spacing of the pre-filled labels.
    pub prefill_spacing_ms: u64,
}

impl Default for ChartConfig {
    fn default() -> Self { Self { visible_points: 50, padding_points: 10, prefill_spacing_ms: 200 } }
}

impl ChartConfig {
    pub fn total_points(&self) -> usize { self.visible_points + self.padding_points }
}

/// Every tunable of the analysis core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Retained values per metric history; the oldest value is evicted first.
    pub history_capacity: usize,
    pub trend: TrendConfig,
    pub spike: SpikeConfig,
    pub quality: QualityConfig,
    pub chart: ChartConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 3600,
            trend: TrendConfig::default(),
            spike: SpikeConfig::default(),
            quality: QualityConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::config("history_capacity must be > 0"));
        }
        if self.trend.log_capacity == 0 || self.spike.log_capacity == 0 {
            return Err(Error::config("event log capacity must be > 0"));
        }
        if self.spike.history_size == 0 || self.spike.baseline_window == 0 {
            return Err(Error::config("spike history_size and baseline_window must be > 0"));
        }
        if self.chart.total_points() < self.spike.history_size.max(self.spike.baseline_window) {
            return Err(Error::config("chart buffer is smaller than the spike windows"));
        }
        let q = &self.quality;
        let weights = q.current_latency_weight + q.historical_weight + q.spike_weight + q.packet_loss_weight;
        if (weights - 1.0).abs() > 1e-6 {
            return Err(Error::config(format!("quality weights must sum to 1.0, got {weights}")));
        }
        if q.latency_divisor <= 0.0 || q.spike_impact_divisor <= 0.0 {
            return Err(Error::config("quality divisors must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Sampling interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Period of the elapsed-time refresh.
    #[serde(default = "default_ui_refresh_secs")]
    pub ui_refresh_secs: u64,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

fn default_log_level() -> String { "info".into() }
fn default_interval_ms() -> u64 { DEFAULT_INTERVAL_MS }
fn default_ui_refresh_secs() -> u64 { 60 }

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            interval_ms: default_interval_ms(),
            ui_refresh_secs: default_ui_refresh_secs(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder { CoreConfigBuilder::default() }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&data).map_err(|e| Error::config(format!("toml parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let s = toml::to_string_pretty(self).map_err(|e| Error::config(format!("toml encode error: {e}")))?;
        fs::write(path, s)?;
        Ok(())
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("NETPULSE_LOG_LEVEL") { cfg.log_level = v; }
        if let Ok(v) = std::env::var("NETPULSE_INTERVAL_MS") {
            cfg.interval_ms = v.trim().parse().map_err(|_| Error::config(format!("invalid NETPULSE_INTERVAL_MS: {v}")))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let allowed = ["trace","debug","info","warn","error"];
        if !allowed.contains(&self.log_level.as_str()) {
            return Err(Error::config(format!("invalid log_level: {}", self.log_level)));
        }
        validate_interval(self.interval_ms)?;
        if self.ui_refresh_secs == 0 {
            return Err(Error::config("ui_refresh_secs must be > 0"));
        }
        self.analyzer.validate()
    }
}

/// Check a polling interval against the accepted range.
pub fn validate_interval(interval_ms: u64) -> Result<()> {
    if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval_ms) {
        return Err(Error::config(format!(
            "Please enter a value between {MIN_INTERVAL_MS} and {MAX_INTERVAL_MS} milliseconds"
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    inner: CoreConfig,
}

impl CoreConfigBuilder {
    pub fn log_level(mut self, level: impl Into<String>) -> Self { self.inner.log_level = level.into(); self }
    pub fn interval_ms(mut self, ms: u64) -> Self { self.inner.interval_ms = ms; self }
    pub fn ui_refresh_secs(mut self, secs: u64) -> Self { self.inner.ui_refresh_secs = secs; self }
    pub fn analyzer(mut self, analyzer: AnalyzerConfig) -> Self { self.inner.analyzer = analyzer; self }
    pub fn build(self) -> Result<CoreConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
