//! Sustained latency trend detection.
//!
//! At most one trend is open at a time. A trend opens on a single step of
//! at least `trend_threshold` between consecutive real samples, follows the
//! peak while it rises, and closes when latency returns to baseline, settles
//! under the normalized threshold for long enough, or decays after running
//! for too long. Closed trends that are long and tall enough are kept in a
//! bounded FIFO log.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrendConfig;
use crate::types::TimestampMs;

/// A recorded trend. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEvent {
    pub from: f64,
    pub to: f64,
    pub duration_ms: u64,
    pub started_at: TimestampMs,
}

impl TrendEvent {
    pub fn rise(&self) -> f64 { self.to - self.from }

    /// `"20.0 → 65.0 ms"`
    pub fn range_text(&self) -> String { format!("{:.1} → {:.1} ms", self.from, self.to) }

    /// `"+45.0 ms for 1.00s"`
    pub fn rise_text(&self) -> String {
        format!("+{:.1} ms for {:.2}s", self.rise(), self.duration_ms as f64 / 1000.0)
    }
}

/// The open trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTrend {
    pub start_time: TimestampMs,
    pub start_value: f64,
    pub current_value: f64,
    pub peak_value: f64,
    /// When the peak was last raised.
    pub last_high: TimestampMs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendTransition {
    None,
    Opened,
    Peaked,
    /// Carries the logged event, or `None` when the trend was too short or too flat.
    Closed(Option<TrendEvent>),
}

fn round1(v: f64) -> f64 { (v * 10.0).round() / 10.0 }

#[derive(Debug, Clone)]
pub struct TrendDetector {
    cfg: TrendConfig,
    previous: Option<f64>,
    active: Option<ActiveTrend>,
    log: VecDeque<TrendEvent>,
}

impl TrendDetector {
    pub fn new(cfg: TrendConfig) -> Self {
        let cap = cfg.log_capacity;
        Self { cfg, previous: None, active: None, log: VecDeque::with_capacity(cap + 1) }
    }

    pub fn active(&self) -> Option<&ActiveTrend> { self.active.as_ref() }

    /// Oldest first.
    pub fn events(&self) -> impl DoubleEndedIterator<Item = &TrendEvent> + ExactSizeIterator + '_ { self.log.iter() }

    pub fn previous_latency(&self) -> Option<f64> { self.previous }

    /// Feed one real latency sample.
    pub fn observe(&mut self, latency: f64, now: TimestampMs) -> TrendTransition {
        let transition = match self.previous {
            None => TrendTransition::None,
            Some(previous) => self.step(previous, latency, now),
        };
        self.previous = Some(latency);
        transition
    }

    fn step(&mut self, previous: f64, latency: f64, now: TimestampMs) -> TrendTransition {
        if self.active.is_none() {
            if latency - previous < self.cfg.trend_threshold {
                return TrendTransition::None;
            }
            debug!(from = previous, to = latency, "latency trend opened");
            self.active = Some(ActiveTrend {
                start_time: now,
                start_value: previous,
                current_value: latency,
                peak_value: latency,
                last_high: now,
            });
            return TrendTransition::Opened;
        }

        let cfg = &self.cfg;
        let Some(trend) = self.active.as_mut() else { return TrendTransition::None };

        trend.current_value = latency;
        let mut peaked = false;
        if latency > trend.peak_value {
            trend.peak_value = latency;
            trend.last_high = now;
            peaked = true;
        }

        let duration = now.since(trend.start_time);
        let since_high = now.since(trend.last_high);
        let ended = latency <= cfg.baseline_threshold
            || (latency <= cfg.normalized_threshold && since_high >= cfg.normalized_hold_ms)
            || (duration >= cfg.max_trend_duration_ms && latency < trend.peak_value * cfg.peak_decay);

        if !ended {
            return if peaked { TrendTransition::Peaked } else { TrendTransition::None };
        }

        let Some(trend) = self.active.take() else { return TrendTransition::None };
        if duration >= cfg.min_trend_duration_ms && trend.peak_value - trend.start_value >= cfg.trend_threshold {
            let event = TrendEvent {
                from: round1(trend.start_value),
                to: round1(trend.peak_value),
                duration_ms: duration,
                started_at: trend.start_time,
            };
            info!(from = event.from, to = event.to, duration_ms = event.duration_ms, "latency trend recorded");
            self.log.push_back(event.clone());
            while self.log.len() > self.cfg.log_capacity {
                self.log.pop_front();
            }
            TrendTransition::Closed(Some(event))
        } else {
            debug!(duration_ms = duration, "latency trend discarded");
            TrendTransition::Closed(None)
        }
    }
}

impl Default for TrendDetector {
    fn default() -> Self { Self::new(TrendConfig::default()) }
}
