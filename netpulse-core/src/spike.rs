//! Transient latency spike detection.
//!
//! The baseline is the mean of the most recent non-zero chart points, so
//! interpolated points shape it too. A candidate opens a spike only when
//! no spike is open and the newest logged spike is past the cooldown. An
//! open spike escalates in place when latency climbs more than
//! `update_factor` above it and closes once latency is back near baseline
//! or the cooldown passes without a new peak. Closed spikes stay in the
//! log; only their `active` tag is cleared.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chart::ChartBuffer;
use crate::config::SpikeConfig;
use crate::types::TimestampMs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub value: f64,
    pub baseline: f64,
    /// Sparkline of chart points around the spike, oldest first.
    pub history: VecDeque<f64>,
    pub timestamp: TimestampMs,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpikeTransition {
    None,
    Opened(SpikeEvent),
    Escalated(SpikeEvent),
    Closed(SpikeEvent),
}

#[derive(Debug, Clone)]
pub struct SpikeDetector {
    cfg: SpikeConfig,
    /// Newest first.
    log: VecDeque<SpikeEvent>,
}

impl SpikeDetector {
    pub fn new(cfg: SpikeConfig) -> Self {
        let cap = cfg.log_capacity;
        Self { cfg, log: VecDeque::with_capacity(cap + 1) }
    }

    /// Newest first.
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &SpikeEvent> + ExactSizeIterator + '_ { self.log.iter() }

    /// The `n` newest spikes.
    pub fn recent(&self, n: usize) -> Vec<SpikeEvent> { self.log.iter().take(n).cloned().collect() }

    pub fn active(&self) -> Option<&SpikeEvent> { self.log.front().filter(|s| s.active) }

    /// Current baseline, or `None` while warming up.
    pub fn baseline(&self, chart: &ChartBuffer) -> Option<f64> {
        if chart.non_zero_count() < self.cfg.warmup_samples {
            return None;
        }
        chart.recent_non_zero_mean(self.cfg.baseline_window)
    }

    /// Feed one real latency sample; `chart` must already contain it.
    pub fn observe(&mut self, latency: f64, chart: &ChartBuffer, now: TimestampMs) -> SpikeTransition {
        let Some(baseline) = self.baseline(chart) else { return SpikeTransition::None };
        let cfg = &self.cfg;

        if let Some(spike) = self.log.front_mut().filter(|s| s.active) {
            let mut escalated = false;
            if latency > spike.value * cfg.update_factor {
                spike.value = latency;
                spike.history = chart.tail(cfg.history_size).into();
                spike.timestamp = now;
                escalated = true;
                debug!(value = latency, "latency spike escalated");
            }
            if latency <= baseline * cfg.return_factor || now.since(spike.timestamp) > cfg.cooldown_ms {
                spike.active = false;
                debug!(value = spike.value, baseline, "latency spike closed");
                return SpikeTransition::Closed(spike.clone());
            }
            return if escalated { SpikeTransition::Escalated(spike.clone()) } else { SpikeTransition::None };
        }

        let candidate = (latency > baseline * cfg.spike_multiplier || latency > cfg.normal_latency * 2.0)
            && latency >= cfg.minimum_spike_value;
        if !candidate {
            return SpikeTransition::None;
        }
        if let Some(last) = self.log.front() {
            if now.since(last.timestamp) <= cfg.cooldown_ms {
                debug!(value = latency, "latency spike suppressed by cooldown");
                return SpikeTransition::None;
            }
        }

        let spike = SpikeEvent {
            value: latency,
            baseline,
            history: chart.tail(cfg.history_size).into(),
            timestamp: now,
            active: true,
        };
        info!(value = latency, baseline, "latency spike detected");
        self.log.push_front(spike.clone());
        while self.log.len() > cfg.log_capacity {
            self.log.pop_back();
        }
        SpikeTransition::Opened(spike)
    }

    /// Append `latency` to the open spike's sparkline. No-op when no spike is open.
    pub fn extend_history(&mut self, latency: f64) -> bool {
        let size = self.cfg.history_size;
        match self.log.front_mut().filter(|s| s.active) {
            Some(spike) => {
                spike.history.push_back(latency);
                while spike.history.len() > size {
                    spike.history.pop_front();
                }
                true
            }
            None => false,
        }
    }
}

impl Default for SpikeDetector {
    fn default() -> Self { Self::new(SpikeConfig::default()) }
}
