use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::Metric;

/// Ordered series of recorded values for one metric.
///
/// Bounded ring: once `capacity` values are held the oldest is evicted.
/// A running sum keeps `average()` constant time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricHistory {
    metric: Metric,
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl MetricHistory {
    pub fn new(metric: Metric, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { metric, values: VecDeque::with_capacity(capacity.min(4096)), capacity, sum: 0.0 }
    }

    pub fn metric(&self) -> Metric { self.metric }
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
    pub fn last(&self) -> Option<f64> { self.values.back().copied() }

    /// Append `value`. Values the metric does not accept leave the history unchanged.
    pub fn record(&mut self, value: f64) -> Result<()> {
        if !self.metric.accepts(value) {
            warn!(metric = %self.metric, value, "invalid value received");
            return Err(Error::invalid_sample(self.metric, value));
        }
        if self.values.len() == self.capacity {
            if let Some(old) = self.values.pop_front() { self.sum -= old; }
        }
        self.values.push_back(value);
        self.sum += value;
        Ok(())
    }

    /// Arithmetic mean, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.values.is_empty() { return 0.0; }
        self.sum / self.values.len() as f64
    }

    pub fn min(&self) -> Option<f64> { self.values.iter().copied().reduce(f64::min) }

    /// Population standard deviation, `0.0` when empty.
    pub fn std_deviation(&self) -> f64 {
        if self.values.is_empty() { return 0.0; }
        let avg = self.average();
        let var = self.values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / self.values.len() as f64;
        var.sqrt()
    }

    /// Oldest to newest.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = f64> + ExactSizeIterator + '_ { self.values.iter().copied() }

    pub fn to_vec(&self) -> Vec<f64> { self.values.iter().copied().collect() }
}

/// The four per-metric series the analyzer maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricHistories {
    pub latency: MetricHistory,
    pub jitter: MetricHistory,
    pub packet_loss: MetricHistory,
    pub quality_score: MetricHistory,
}

impl MetricHistories {
    pub fn new(capacity: usize) -> Self {
        Self {
            latency: MetricHistory::new(Metric::Latency, capacity),
            jitter: MetricHistory::new(Metric::Jitter, capacity),
            packet_loss: MetricHistory::new(Metric::PacketLoss, capacity),
            quality_score: MetricHistory::new(Metric::QualityScore, capacity),
        }
    }

    pub fn get(&self, metric: Metric) -> &MetricHistory {
        match metric {
            Metric::Latency => &self.latency,
            Metric::Jitter => &self.jitter,
            Metric::PacketLoss => &self.packet_loss,
            Metric::QualityScore => &self.quality_score,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut MetricHistory {
        match metric {
            Metric::Latency => &mut self.latency,
            Metric::Jitter => &mut self.jitter,
            Metric::PacketLoss => &mut self.packet_loss,
            Metric::QualityScore => &mut self.quality_score,
        }
    }

    pub fn record(&mut self, metric: Metric, value: f64) -> Result<()> { self.get_mut(metric).record(value) }

    pub fn average(&self, metric: Metric) -> f64 { self.get(metric).average() }
}
