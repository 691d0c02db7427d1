use netpulse_core::{config::CoreConfig, types::TimestampMs, NetworkAnalyzer, Sample};

fn main() {
    let cfg = CoreConfig::default();
    println!("log_level={} interval_ms={}", cfg.log_level, cfg.interval_ms);

    let mut analyzer = NetworkAnalyzer::new(cfg.analyzer, TimestampMs(0));
    let script = [20.0, 20.0, 20.0, 60.0, 65.0, 62.0, 58.0, 42.0, 38.0, 35.0];
    for (i, latency) in script.into_iter().enumerate() {
        let now = TimestampMs(i as u64 * cfg.interval_ms);
        let report = analyzer.ingest(Sample::new(latency, 2.0, 0.05), now);
        println!("t={now} latency={latency} score={:?} trend={:?}", report.score, report.trend);
    }
    for t in analyzer.trend_events() {
        println!("trend {} ({})", t.range_text(), t.rise_text());
    }
}
