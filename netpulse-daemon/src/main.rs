#![forbid(unsafe_code)]

use std::{io::BufRead, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use netpulse_core::{summary::SpikeSeverity, CoreConfig, EventLogs};
use netpulse_daemon::{
    ConfigManager, EventSystem, MemoryHost, MonitorEvent, Sampler, Scheduler, SimulatedSampler,
};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "netpulse", version, about = "Live network quality monitor")]
struct Cli {
    /// Sampling interval in milliseconds (100..=2000)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// TOML config; NETPULSE_* environment variables are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration_secs: Option<u64>,
    #[arg(long)]
    log_level: Option<String>,
    /// Event kinds to log, comma separated (e.g. sampled,spike_opened)
    #[arg(long, value_delimiter = ',')]
    events: Option<Vec<String>>,
    /// Seed the simulated sampler for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Write the trend and spike logs as JSON on exit
    #[arg(long)]
    dump_logs: Option<PathBuf>,
    /// Accept new intervals on stdin, one per line
    #[arg(long)]
    interactive: bool,
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut cfg = match &cli.config {
        Some(path) => CoreConfig::load_from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => CoreConfig::from_env().context("reading NETPULSE_* environment")?,
    };
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
    if let Some(ms) = cli.interval_ms {
        cfg.interval_ms = ms;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_event(ev: &MonitorEvent) {
    match ev {
        MonitorEvent::Sampled(snap) => info!(
            latency = ?snap.latest.map(|s| s.latency),
            score = ?snap.quality_score,
            class = ?snap.quality_class.map(|c| c.as_str()),
            at = ?snap.chart.last().map(|p| p.label.as_str()),
            stability = snap.stability.as_str(),
            samples = snap.sample_count,
            "sample"
        ),
        MonitorEvent::Interpolated { value } => debug!(value, "interpolated point"),
        MonitorEvent::TrendRecorded(t) => info!(range = %t.range_text(), rise = %t.rise_text(), "latency trend"),
        MonitorEvent::SpikeOpened(s) | MonitorEvent::SpikeEscalated(s) => info!(
            kind = ev.kind(),
            value = s.value,
            baseline = s.baseline,
            severity = ?SpikeSeverity::from_value(s.value),
            "latency spike"
        ),
        MonitorEvent::SpikeClosed(s) => info!(value = s.value, "spike settled"),
        MonitorEvent::Elapsed { text } => info!("monitoring: {text}"),
        MonitorEvent::IntervalChanged { interval_ms } => info!(interval_ms, "interval changed"),
        MonitorEvent::FetchFailed { reason } => warn!(%reason, "fetch failed"),
    }
}

async fn render(events: EventSystem, filter: Option<Vec<String>>) {
    let mut rx = events.subscribe();
    loop {
        match rx.recv().await {
            Ok(ev) => {
                if events.matches(&ev, &filter).await {
                    log_event(&ev);
                }
            }
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "renderer lagged behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Blocking stdin reads live on their own thread so runtime shutdown never waits on them.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(l) => {
                    if tx.blocking_send(l).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read error: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Each line is a new interval request, like the settings dialog.
async fn apply_interval_requests(manager: ConfigManager, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(ms) = trimmed.parse::<u64>() else {
            warn!("Please enter a value between 100 and 2000 milliseconds");
            continue;
        };
        let resp = manager.apply(ms).await;
        if resp.success {
            info!(interval_ms = resp.interval_ms, "settings saved");
        } else {
            warn!(interval_ms = resp.interval_ms, "{}", resp.message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    init_tracing(&cfg.log_level);

    let events = EventSystem::default();
    let sampler: Arc<dyn Sampler> = Arc::new(match cli.seed {
        Some(seed) => SimulatedSampler::with_seed(seed),
        None => SimulatedSampler::new(),
    });
    let scheduler = Arc::new(Scheduler::from_config(&cfg, sampler, events.clone()));
    let host = Arc::new(MemoryHost::new(cfg.interval_ms));
    let manager = ConfigManager::new(cfg.interval_ms, host, scheduler.clone(), events.clone());

    let renderer = tokio::spawn(render(events.clone(), cli.events.clone()));
    scheduler.restart(Duration::from_millis(cfg.interval_ms))?;
    info!(interval_ms = cfg.interval_ms, "starting netpulse");
    let requests = cli.interactive.then(|| tokio::spawn(apply_interval_requests(manager, spawn_stdin_reader())));

    match cli.duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?,
    }

    scheduler.stop();
    if let Some(task) = requests {
        task.abort();
    }
    renderer.abort();

    let last = scheduler.snapshot();
    info!(
        samples = last.sample_count,
        score = ?last.quality_score,
        avg_latency = last.averages.latency,
        trends = last.trends.len(),
        spikes = last.spikes.len(),
        "netpulse stopped"
    );

    if let Some(path) = &cli.dump_logs {
        let logs = scheduler.with_analyzer(|a| EventLogs::from(a));
        let json = serde_json::to_string_pretty(&logs)?;
        tokio::fs::write(path, json).await.with_context(|| format!("writing {}", path.display()))?;
        info!("event logs written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpulse_core::{AnalyzerConfig, Sample};
    use netpulse_daemon::FnSampler;

    fn manager() -> ConfigManager {
        let events = EventSystem::new(64);
        let sampler = FnSampler::new(|| async { Ok(Sample::new(25.0, 1.0, 0.0)) });
        let scheduler = Arc::new(Scheduler::new(
            AnalyzerConfig::default(),
            Duration::from_secs(60),
            Arc::new(sampler),
            events.clone(),
        ));
        let host = Arc::new(MemoryHost::new(200));
        ConfigManager::new(200, host, scheduler, events).with_settle(Duration::ZERO)
    }

    #[tokio::test]
    async fn interval_requests_end_when_input_closes() {
        let m = manager();
        let (tx, rx) = mpsc::channel(4);
        for line in ["abc", "", "50", " 750 "] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);
        apply_interval_requests(m.clone(), rx).await;
        assert_eq!(m.interval_ms().await, 750);
    }

    #[tokio::test]
    async fn aborting_request_task_does_not_wait_for_input() {
        let (_tx, rx) = mpsc::channel::<String>(1);
        let task = tokio::spawn(apply_interval_requests(manager(), rx));
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
