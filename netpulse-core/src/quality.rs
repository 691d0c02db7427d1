//! Composite 0–100 connection quality score.
//!
//! Four sub-scores blended by [`QualityConfig`] weights:
//! - current latency (linear penalty, 0 at 180 ms with the default divisor)
//! - historical performance (recency-weighted latency average)
//! - spike impact (convex penalty on deviations above the best latency seen)
//! - packet loss (recent window weighted over the older remainder)
//!
//! The scorer is pure; it must be called after the current sample has been
//! appended to the histories it reads.

use serde::{Deserialize, Serialize};

use crate::config::QualityConfig;
use crate::history::MetricHistory;

/// Deviation (ms) below which the spike penalty is linear.
const SMALL_DEVIATION: f64 = 20.0;
/// Deviation (ms) from which the spike penalty is quadratic.
const LARGE_DEVIATION: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeCounts {
    pub small: u32,
    pub medium: u32,
    pub large: u32,
}

impl SpikeCounts {
    fn count(&mut self, deviation: f64) {
        if deviation >= LARGE_DEVIATION {
            self.large += 1;
        } else if deviation >= SMALL_DEVIATION {
            self.medium += 1;
        } else {
            self.small += 1;
        }
    }
}

/// Sub-scores behind a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub current_latency: f64,
    pub historical: f64,
    pub spikes: f64,
    pub packet_loss: f64,
    pub spike_counts: SpikeCounts,
    pub score: u8,
}

/// Penalty for a single deviation above baseline.
pub fn deviation_impact(deviation: f64) -> f64 {
    if deviation < SMALL_DEVIATION {
        deviation * 0.5
    } else if deviation < LARGE_DEVIATION {
        deviation.powf(1.5) * 0.1
    } else {
        deviation.powi(2) * 0.05
    }
}

fn latency_score(latency: f64, divisor: f64) -> f64 {
    ((100.0 - latency) / divisor).clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

/// Stateless scorer parameterised by [`QualityConfig`].
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    cfg: QualityConfig,
}

impl QualityScorer {
    pub fn new(cfg: QualityConfig) -> Self { Self { cfg } }

    pub fn score(&self, latency: f64, latencies: &MetricHistory, losses: &MetricHistory) -> u8 {
        self.breakdown(latency, latencies, losses).score
    }

    pub fn breakdown(&self, latency: f64, latencies: &MetricHistory, losses: &MetricHistory) -> QualityBreakdown {
        let cfg = &self.cfg;
        let current_latency = latency_score(latency, cfg.latency_divisor);
        let historical = self.historical_score(latencies);
        let (spikes, spike_counts) = self.spike_score(latency, latencies);
        let packet_loss = self.packet_loss_score(losses);

        let blended = current_latency * cfg.current_latency_weight
            + historical * cfg.historical_weight
            + spikes * cfg.spike_weight
            + packet_loss * cfg.packet_loss_weight;
        let score = blended.round().clamp(0.0, 100.0) as u8;

        QualityBreakdown { current_latency, historical, spikes, packet_loss, spike_counts, score }
    }

    /// Later samples weigh more: weight of the i-th of N values is (i+1)/N.
    fn historical_score(&self, latencies: &MetricHistory) -> f64 {
        let n = latencies.len();
        if n == 0 { return 0.0; }
        let weighted_sum: f64 = latencies
            .values()
            .enumerate()
            .map(|(i, v)| v * (i + 1) as f64 / n as f64)
            .sum();
        let weighted_avg = weighted_sum / (n + 1) as f64 * 2.0;
        latency_score(weighted_avg, self.cfg.latency_divisor)
    }

    fn spike_score(&self, latency: f64, latencies: &MetricHistory) -> (f64, SpikeCounts) {
        let mut counts = SpikeCounts::default();
        let n = latencies.len();
        if n == 0 { return (0.0, counts); }

        let baseline = latencies.min().map_or(latency, |m| m.min(latency));
        let mut impact = 0.0;
        for (i, value) in latencies.values().enumerate() {
            let deviation = value - baseline;
            if deviation > 0.0 {
                let recency = (i + 1) as f64 / n as f64;
                counts.count(deviation);
                impact += deviation_impact(deviation) * recency;
            }
        }

        // The current sample counts once more, at double weight.
        let current_deviation = latency - baseline;
        if current_deviation > 0.0 {
            impact += deviation_impact(current_deviation) * 2.0;
            counts.count(current_deviation);
        }

        ((100.0 - impact / self.cfg.spike_impact_divisor).max(0.0), counts)
    }

    fn packet_loss_score(&self, losses: &MetricHistory) -> f64 {
        if losses.is_empty() { return 100.0; }
        let all = losses.to_vec();
        let split = all.len().saturating_sub(self.cfg.recent_loss_window);
        let (historical, recent) = all.split_at(split);

        let recent_avg = mean(recent) * self.cfg.recent_loss_factor;
        let historical_avg = mean(historical);
        let combined = (recent_avg + historical_avg) / 2.0;
        (100.0 - combined * self.cfg.loss_penalty).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    fn history(metric: Metric, values: &[f64]) -> MetricHistory {
        let mut h = MetricHistory::new(metric, 1000);
        for v in values { h.record(*v).unwrap(); }
        h
    }

    #[test]
    fn packet_loss_defaults_to_full_score() {
        let scorer = QualityScorer::default();
        let lat = history(Metric::Latency, &[20.0]);
        let loss = history(Metric::PacketLoss, &[]);
        let b = scorer.breakdown(20.0, &lat, &loss);
        assert_eq!(b.packet_loss, 100.0);
    }

    #[test]
    fn perfect_line_scores_high() {
        let scorer = QualityScorer::default();
        let lat = history(Metric::Latency, &[20.0; 20]);
        let loss = history(Metric::PacketLoss, &[0.0; 20]);
        let b = scorer.breakdown(20.0, &lat, &loss);
        assert_eq!(b.current_latency, 100.0);
        assert_eq!(b.spikes, 100.0);
        assert_eq!(b.packet_loss, 100.0);
        assert_eq!(b.spike_counts, SpikeCounts::default());
        // historical: sum((i+1)/20 * 20) = 210, /21*2 = 20 -> 100
        assert!((b.historical - 100.0).abs() < 1e-9);
        assert_eq!(b.score, 100);
    }

    #[test]
    fn current_latency_reaches_zero_at_180() {
        assert_eq!(latency_score(180.0, 0.8), 0.0);
        assert_eq!(latency_score(500.0, 0.8), 0.0);
        assert!((latency_score(60.0, 0.8) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn impact_tiers() {
        assert_eq!(deviation_impact(10.0), 5.0);
        assert!((deviation_impact(25.0) - 25f64.powf(1.5) * 0.1).abs() < 1e-9);
        assert_eq!(deviation_impact(60.0), 180.0);
    }

    #[test]
    fn recent_losses_weigh_more() {
        let scorer = QualityScorer::default();
        let mut early = vec![1.0; 10];
        early.extend(vec![0.0; 10]);
        let mut late = vec![0.0; 10];
        late.extend(vec![1.0; 10]);
        let lat = history(Metric::Latency, &[20.0]);
        let early = scorer.breakdown(20.0, &lat, &history(Metric::PacketLoss, &early)).packet_loss;
        let late = scorer.breakdown(20.0, &lat, &history(Metric::PacketLoss, &late)).packet_loss;
        // early: (0*1.5 + 1)/2 = 0.5 -> 90; late: (1*1.5 + 0)/2 = 0.75 -> 85
        assert!((early - 90.0).abs() < 1e-9);
        assert!((late - 85.0).abs() < 1e-9);
    }

    #[test]
    fn spikes_are_counted_by_tier() {
        let scorer = QualityScorer::default();
        let lat = history(Metric::Latency, &[20.0, 30.0, 50.0, 90.0]);
        let loss = history(Metric::PacketLoss, &[0.0]);
        let b = scorer.breakdown(90.0, &lat, &loss);
        // history deviations 10, 30, 70 plus the current 70
        assert_eq!(b.spike_counts, SpikeCounts { small: 1, medium: 1, large: 2 });
        assert!(b.spikes < 100.0);
    }
}
