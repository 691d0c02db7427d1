//! Fixed-size display series shared by the renderer and the spike detector.
//!
//! Real samples and interpolated points both land here; the histories only
//! ever see real samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::types::TimestampMs;

/// One plotted point with its `HH:MM:SS` axis label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartBuffer {
    labels: VecDeque<String>,
    values: VecDeque<f64>,
    padding: usize,
}

impl ChartBuffer {
    /// Pre-fill with zeros labelled backwards from `now`.
    pub fn new(cfg: &ChartConfig, now: TimestampMs) -> Self {
        let total = cfg.total_points().max(1);
        let mut labels = VecDeque::with_capacity(total);
        let mut values = VecDeque::with_capacity(total);
        for i in 0..total {
            let t = now.sub_ms((total - i) as u64 * cfg.prefill_spacing_ms);
            labels.push_back(t.clock_label());
            values.push_back(0.0);
        }
        Self { labels, values, padding: cfg.padding_points }
    }

    pub fn push(&mut self, value: f64, now: TimestampMs) {
        self.labels.pop_front();
        self.values.pop_front();
        self.labels.push_back(now.clock_label());
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = f64> + '_ { self.values.iter().copied() }

    /// The last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn non_zero_count(&self) -> usize { self.values.iter().filter(|v| **v > 0.0).count() }

    /// Mean of the last `n` non-zero points.
    pub fn recent_non_zero_mean(&self, n: usize) -> Option<f64> {
        let recent: Vec<f64> = self.values.iter().rev().filter(|v| **v > 0.0).take(n).copied().collect();
        if recent.is_empty() { return None; }
        Some(recent.iter().sum::<f64>() / recent.len() as f64)
    }

    /// Points the renderer shows; the leading padding scrolls in off-screen.
    pub fn visible(&self) -> Vec<ChartPoint> {
        self.labels
            .iter()
            .zip(self.values.iter())
            .skip(self.padding)
            .map(|(label, value)| ChartPoint { label: label.clone(), value: *value })
            .collect()
    }
}
