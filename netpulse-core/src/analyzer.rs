//! Single owner of all analysis state.
//!
//! One real sample flows: histories → quality score → chart buffer → trend
//! detector → spike detector. Interpolated points only touch the chart.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::chart::ChartBuffer;
use crate::config::AnalyzerConfig;
use crate::history::{MetricHistories, MetricHistory};
use crate::quality::{QualityBreakdown, QualityScorer};
use crate::spike::{SpikeDetector, SpikeEvent, SpikeTransition};
use crate::summary::{Averages, LatencyLevel, QualityClass, Snapshot, SpikeView, Stability};
use crate::trend::{ActiveTrend, TrendDetector, TrendEvent, TrendTransition};
use crate::types::{Metric, Sample, TimestampMs};

/// What one real sample did to the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// `None` when latency was rejected and the tick was not scored.
    pub score: Option<u8>,
    pub trend: TrendTransition,
    pub spike: SpikeTransition,
    /// Metrics whose value was rejected this tick.
    pub rejected: Vec<Metric>,
}

impl TickReport {
    fn unscored(rejected: Vec<Metric>) -> Self {
        Self { score: None, trend: TrendTransition::None, spike: SpikeTransition::None, rejected }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkAnalyzer {
    histories: MetricHistories,
    scorer: QualityScorer,
    chart: ChartBuffer,
    trends: TrendDetector,
    spikes: SpikeDetector,
    /// Last real latency; zero until the first valid sample.
    last_latency: f64,
    last_sample: Option<Sample>,
    last_breakdown: Option<QualityBreakdown>,
    started_at: TimestampMs,
}

impl NetworkAnalyzer {
    pub fn new(cfg: AnalyzerConfig, now: TimestampMs) -> Self {
        Self {
            histories: MetricHistories::new(cfg.history_capacity),
            scorer: QualityScorer::new(cfg.quality.clone()),
            chart: ChartBuffer::new(&cfg.chart, now),
            trends: TrendDetector::new(cfg.trend.clone()),
            spikes: SpikeDetector::new(cfg.spike),
            last_latency: 0.0,
            last_sample: None,
            last_breakdown: None,
            started_at: now,
        }
    }

    pub fn histories(&self) -> &MetricHistories { &self.histories }
    pub fn history(&self, metric: Metric) -> &MetricHistory { self.histories.get(metric) }
    pub fn average(&self, metric: Metric) -> f64 { self.histories.average(metric) }
    pub fn chart(&self) -> &ChartBuffer { &self.chart }
    pub fn last_latency(&self) -> f64 { self.last_latency }
    pub fn last_breakdown(&self) -> Option<&QualityBreakdown> { self.last_breakdown.as_ref() }
    pub fn quality_score(&self) -> Option<u8> { self.last_breakdown.map(|b| b.score) }
    pub fn active_trend(&self) -> Option<&ActiveTrend> { self.trends.active() }
    pub fn active_spike(&self) -> Option<&SpikeEvent> { self.spikes.active() }
    pub fn started_at(&self) -> TimestampMs { self.started_at }

    /// Oldest first.
    pub fn trend_events(&self) -> Vec<TrendEvent> { self.trends.events().cloned().collect() }

    /// Newest first.
    pub fn spike_events(&self) -> Vec<SpikeEvent> { self.spikes.events().cloned().collect() }

    /// Run one real sample through the pipeline.
    pub fn ingest(&mut self, sample: Sample, now: TimestampMs) -> TickReport {
        let mut rejected = Vec::new();
        for (metric, value) in [
            (Metric::Latency, sample.latency),
            (Metric::Jitter, sample.jitter),
            (Metric::PacketLoss, sample.packet_loss),
        ] {
            if self.histories.record(metric, value).is_err() {
                rejected.push(metric);
            }
        }
        self.last_sample = Some(sample);
        if rejected.contains(&Metric::Latency) {
            return TickReport::unscored(rejected);
        }

        let latency = sample.latency;
        let breakdown = self.scorer.breakdown(latency, &self.histories.latency, &self.histories.packet_loss);
        if let Err(e) = self.histories.record(Metric::QualityScore, f64::from(breakdown.score)) {
            warn!(error = %e, "quality score not recorded");
        }
        self.last_breakdown = Some(breakdown);
        trace!(?breakdown, "quality score computed");

        self.last_latency = latency;
        self.chart.push(latency, now);

        let trend = self.trends.observe(latency, now);
        let spike = self.spikes.observe(latency, &self.chart, now);
        if spike == SpikeTransition::None {
            self.spikes.extend_history(latency);
        }

        debug!(latency, score = breakdown.score, "sample ingested");
        TickReport { score: Some(breakdown.score), trend, spike, rejected }
    }

    /// Push a synthetic point next to the last real latency; display only.
    /// Returns the plotted value, or `None` before the first real sample.
    pub fn interpolate(&mut self, variation: f64, now: TimestampMs) -> Option<f64> {
        if self.last_latency == 0.0 {
            return None;
        }
        let value = (self.last_latency + variation).max(0.0);
        self.chart.push(value, now);
        Some(value)
    }

    pub fn snapshot(&self, now: TimestampMs) -> Snapshot {
        let score = self.quality_score();
        Snapshot {
            taken_at: now,
            latest: self.last_sample,
            quality_score: score,
            quality_class: score.map(QualityClass::from_score),
            latency_level: (self.last_latency > 0.0).then(|| LatencyLevel::from_latency(self.last_latency)),
            averages: Averages {
                latency: self.average(Metric::Latency),
                jitter: self.average(Metric::Jitter),
                packet_loss: self.average(Metric::PacketLoss),
                quality_score: self.average(Metric::QualityScore),
            },
            sample_count: self.histories.latency.len(),
            stability: Stability::assess(&self.histories.latency, &self.histories.jitter),
            trends: self.trends.events().rev().cloned().collect(),
            active_trend: self.trends.active().cloned(),
            spikes: self.spikes.events().map(|s| SpikeView::new(s, now)).collect(),
            elapsed: crate::summary::elapsed_text(now.since(self.started_at)),
            chart: self.chart.visible(),
        }
    }
}

impl Default for NetworkAnalyzer {
    fn default() -> Self { Self::new(AnalyzerConfig::default(), TimestampMs::now()) }
}

/// Serializable dump of the logs, for renderers that poll instead of subscribing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogs {
    pub trends: Vec<TrendEvent>,
    pub spikes: Vec<SpikeEvent>,
}

impl From<&NetworkAnalyzer> for EventLogs {
    fn from(a: &NetworkAnalyzer) -> Self { Self { trends: a.trend_events(), spikes: a.spike_events() } }
}
