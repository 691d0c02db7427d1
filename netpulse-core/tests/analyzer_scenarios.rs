//! End-to-end behaviour of the analyzer on scripted latency streams.

use netpulse_core::{
    AnalyzerConfig, Metric, NetworkAnalyzer, Sample, SpikeTransition, TimestampMs, TrendEvent, TrendTransition,
};
use proptest::prelude::*;

const TICK_MS: u64 = 200;

fn run(values: &[f64]) -> (NetworkAnalyzer, Vec<netpulse_core::TickReport>) {
    let mut a = NetworkAnalyzer::new(AnalyzerConfig::default(), TimestampMs(0));
    let reports = values
        .iter()
        .enumerate()
        .map(|(i, v)| a.ingest(Sample::new(*v, 2.0, 0.0), TimestampMs(1_000 + i as u64 * TICK_MS)))
        .collect();
    (a, reports)
}

#[test]
fn dashboard_sequence_emits_single_trend() {
    let (a, reports) = run(&[20.0, 20.0, 20.0, 60.0, 65.0, 62.0, 58.0, 42.0, 38.0, 35.0]);
    assert_eq!(reports[3].trend, TrendTransition::Opened);
    let events = a.trend_events();
    assert_eq!(
        events,
        vec![TrendEvent { from: 20.0, to: 65.0, duration_ms: 5 * TICK_MS, started_at: TimestampMs(1_600) }]
    );
}

#[test]
fn sustained_jump_then_drop_records_trend() {
    let mut values = vec![20.0; 5];
    values.extend([60.0; 3]);
    values.extend([20.0; 3]);
    let (a, _) = run(&values);
    let events = a.trend_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].to - events[0].from >= 30.0);
    assert!(events[0].duration_ms >= 100);
}

#[test]
fn small_jump_never_trends() {
    let mut values = vec![20.0; 5];
    values.extend([30.0; 5]);
    values.extend([20.0; 5]);
    let (a, _) = run(&values);
    assert!(a.trend_events().is_empty());
}

#[test]
fn spikes_within_cooldown_share_one_entry() {
    let mut values = vec![20.0; 12];
    values.push(100.0);
    values.push(130.0);
    let (a, reports) = run(&values);
    assert!(matches!(reports[12].spike, SpikeTransition::Opened(_)));
    assert!(matches!(reports[13].spike, SpikeTransition::Escalated(_)));
    let spikes = a.spike_events();
    assert_eq!(spikes.len(), 1);
    assert_eq!(spikes[0].value, 130.0);
    assert!(spikes[0].active);
}

#[test]
fn quality_history_tracks_every_scored_tick() {
    let (a, reports) = run(&[20.0, 25.0, 90.0, 30.0]);
    assert_eq!(a.history(Metric::QualityScore).len(), 4);
    let scores: Vec<f64> = reports.iter().map(|r| f64::from(r.score.unwrap())).collect();
    assert_eq!(a.history(Metric::QualityScore).to_vec(), scores);
}

#[test]
fn constant_stream_above_twice_normal_reopens_after_cooldown() {
    // 61 ms clears the absolute rule (2 x 30 ms) and the 45 ms floor on every tick
    let (a, reports) = run(&[61.0; 60]);
    assert!(matches!(reports[9].spike, SpikeTransition::Opened(_)));
    assert!(matches!(reports[10].spike, SpikeTransition::Closed(_)));
    assert!(matches!(reports[35].spike, SpikeTransition::Opened(_)));
    let spikes = a.spike_events();
    assert_eq!(spikes.len(), 2);
    assert!(spikes.iter().all(|s| s.value == 61.0 && !s.active));
}

#[test]
fn constant_stream_at_twice_normal_stays_quiet() {
    let (a, _) = run(&[60.0; 60]);
    assert!(a.spike_events().is_empty());
}

proptest! {
    #[test]
    fn quality_score_stays_in_range(
        samples in prop::collection::vec((0.0f64..2_000.0, 0.0f64..200.0, 0.0f64..=100.0), 1..80)
    ) {
        let mut a = NetworkAnalyzer::new(AnalyzerConfig::default(), TimestampMs(0));
        for (i, (lat, jit, loss)) in samples.into_iter().enumerate() {
            let r = a.ingest(Sample::new(lat, jit, loss), TimestampMs(i as u64 * TICK_MS));
            let score = r.score.unwrap();
            prop_assert!(score <= 100);
        }
    }

    #[test]
    fn logs_never_exceed_capacity(latencies in prop::collection::vec(0.0f64..400.0, 1..400)) {
        let mut a = NetworkAnalyzer::new(AnalyzerConfig::default(), TimestampMs(0));
        for (i, lat) in latencies.into_iter().enumerate() {
            a.ingest(Sample::new(lat, 1.0, 0.0), TimestampMs(i as u64 * 1_000));
            prop_assert!(a.trend_events().len() <= 10);
            prop_assert!(a.spike_events().len() <= 30);
            prop_assert!(a.spike_events().iter().skip(1).all(|s| !s.active));
        }
    }

    #[test]
    fn constant_stream_is_uneventful(level in 1.0f64..=60.0, n in 1usize..120) {
        let mut a = NetworkAnalyzer::new(AnalyzerConfig::default(), TimestampMs(0));
        for i in 0..n {
            a.ingest(Sample::new(level, 1.0, 0.0), TimestampMs(i as u64 * TICK_MS));
        }
        prop_assert!(a.trend_events().is_empty());
        prop_assert!(a.active_trend().is_none());
        prop_assert!(a.spike_events().is_empty());
    }
}
