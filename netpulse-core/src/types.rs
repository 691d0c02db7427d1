use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

/// One measurement tuple as delivered by the host sampler.
///
/// Field names on the wire follow the host (`packetLoss`). Decoding is
/// lenient: numeric strings are accepted and anything that is not a number
/// becomes `NaN`, which the history then rejects per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Round-trip latency in milliseconds.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub latency: f64,
    /// Jitter in milliseconds.
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub jitter: f64,
    /// Packet loss in percent (0..=100).
    #[serde(rename = "packetLoss", default = "nan", deserialize_with = "lenient_f64")]
    pub packet_loss: f64,
}

impl Sample {
    pub fn new(latency: f64, jitter: f64, packet_loss: f64) -> Self { Self { latency, jitter, packet_loss } }

    /// Decode the JSON document returned by the host's `get_ping_data`.
    pub fn from_json(json: &str) -> crate::Result<Self> { Ok(serde_json::from_str(json)?) }
}

fn nan() -> f64 { f64::NAN }

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

/// The metric series kept by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Latency,
    Jitter,
    PacketLoss,
    QualityScore,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Latency => "latency",
            Metric::Jitter => "jitter",
            Metric::PacketLoss => "packet_loss",
            Metric::QualityScore => "quality_score",
        }
    }

    /// Whether `value` is acceptable for this metric.
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() { return false; }
        match self {
            Metric::Latency | Metric::Jitter => value >= 0.0,
            Metric::PacketLoss | Metric::QualityScore => (0.0..=100.0).contains(&value),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

impl TimestampMs {
    pub fn now() -> Self {
        let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(d.as_millis() as u64)
    }

    pub fn as_duration(&self) -> Duration { Duration::from_millis(self.0) }

    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn since(&self, earlier: TimestampMs) -> u64 { self.0.saturating_sub(earlier.0) }

    pub fn add_ms(&self, ms: u64) -> Self { Self(self.0.saturating_add(ms)) }

    pub fn sub_ms(&self, ms: u64) -> Self { Self(self.0.saturating_sub(ms)) }

    /// Local wall-clock `HH:MM:SS`, the format used for chart labels.
    pub fn clock_label(&self) -> String {
        use chrono::TimeZone;
        match chrono::Local.timestamp_millis_opt(self.0 as i64).single() {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }
}

impl From<u64> for TimestampMs {
    fn from(v: u64) -> Self { Self(v) }
}

impl fmt::Display for TimestampMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
