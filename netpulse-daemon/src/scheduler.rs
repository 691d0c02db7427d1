#![forbid(unsafe_code)]

//! Drives the analyzer from three periodic timers.
//!
//! - sampling: one real fetch per interval, at most one in flight
//! - interpolation: a display-only point every quarter interval
//! - ui refresh: elapsed-time text, independent of the interval
//!
//! Restarting swaps all three timers at once. A fetch already in flight is
//! never cancelled; only future firings move to the new cadence.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use netpulse_core::{
    config::validate_interval, summary::elapsed_text, AnalyzerConfig, CoreConfig, NetworkAnalyzer, Sample,
    Snapshot, SpikeTransition, TimestampMs, TrendTransition,
};
use parking_lot::Mutex;
use rand::Rng;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    errors::Result,
    event_system::{EventSystem, MonitorEvent},
    sampler::Sampler,
};

struct Shared {
    // never held across an await
    analyzer: Mutex<NetworkAnalyzer>,
    sampler: Arc<dyn Sampler>,
    events: EventSystem,
    in_flight: AtomicBool,
    epoch: TimestampMs,
    started: Instant,
}

impl Shared {
    /// Wall-clock epoch advanced by the runtime clock, so paused test time moves it too.
    fn now(&self) -> TimestampMs {
        self.epoch.add_ms(self.started.elapsed().as_millis() as u64)
    }

    fn apply(&self, sample: Sample) {
        let now = self.now();
        let (report, snapshot) = {
            let mut analyzer = self.analyzer.lock();
            let report = analyzer.ingest(sample, now);
            (report, analyzer.snapshot(now))
        };
        if report.score.is_none() {
            debug!(rejected = ?report.rejected, "latency rejected; tick not scored");
        }

        if let TrendTransition::Closed(Some(ev)) = report.trend {
            self.events.publish(MonitorEvent::TrendRecorded(ev));
        }
        match report.spike {
            SpikeTransition::Opened(ev) => { self.events.publish(MonitorEvent::SpikeOpened(ev)); }
            SpikeTransition::Escalated(ev) => { self.events.publish(MonitorEvent::SpikeEscalated(ev)); }
            SpikeTransition::Closed(ev) => { self.events.publish(MonitorEvent::SpikeClosed(ev)); }
            SpikeTransition::None => {}
        }
        self.events.publish(MonitorEvent::Sampled(Box::new(snapshot)));
    }
}

/// Owns the reentrancy flag for one sampling cycle; releasing happens on drop,
/// whether the fetch succeeded, failed or the task was torn down.
struct CycleGuard(Arc<Shared>);

impl CycleGuard {
    fn try_acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(shared.clone()))
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

async fn run_cycle(guard: CycleGuard) {
    let shared = &guard.0;
    match shared.sampler.fetch().await {
        Ok(sample) => shared.apply(sample),
        Err(e) => {
            warn!(error = %e, "sample fetch failed; tick skipped");
            shared.events.publish(MonitorEvent::FetchFailed { reason: e.to_string() });
        }
    }
}

async fn sampling_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        match CycleGuard::try_acquire(&shared) {
            // own task, so a restart aborting this loop leaves the cycle running
            Some(guard) => { tokio::spawn(run_cycle(guard)); }
            None => debug!("previous sampling cycle still in flight; tick dropped"),
        }
    }
}

async fn interpolation_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if shared.in_flight.load(Ordering::Acquire) {
            continue;
        }
        let variation: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        let now = shared.now();
        let plotted = shared.analyzer.lock().interpolate(variation, now);
        if let Some(value) = plotted {
            shared.events.publish(MonitorEvent::Interpolated { value });
        }
    }
}

async fn ui_refresh_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let now = shared.now();
        let started_at = shared.analyzer.lock().started_at();
        let text = elapsed_text(now.since(started_at));
        debug!(%text, "elapsed time refreshed");
        shared.events.publish(MonitorEvent::Elapsed { text });
    }
}

struct Timers {
    interval: Duration,
    handles: [JoinHandle<()>; 3],
}

impl Drop for Timers {
    fn drop(&mut self) {
        for h in &self.handles {
            h.abort();
        }
    }
}

pub struct Scheduler {
    shared: Arc<Shared>,
    ui_refresh: Duration,
    timers: Mutex<Option<Timers>>,
}

impl Scheduler {
    pub fn new(analyzer: AnalyzerConfig, ui_refresh: Duration, sampler: Arc<dyn Sampler>, events: EventSystem) -> Self {
        let epoch = TimestampMs::now();
        Self {
            shared: Arc::new(Shared {
                analyzer: Mutex::new(NetworkAnalyzer::new(analyzer, epoch)),
                sampler,
                events,
                in_flight: AtomicBool::new(false),
                epoch,
                started: Instant::now(),
            }),
            ui_refresh: ui_refresh.max(Duration::from_millis(1)),
            timers: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &CoreConfig, sampler: Arc<dyn Sampler>, events: EventSystem) -> Self {
        Self::new(cfg.analyzer.clone(), Duration::from_secs(cfg.ui_refresh_secs), sampler, events)
    }

    /// Start or restart all timers at `interval`. Must be called inside a tokio runtime.
    pub fn restart(&self, interval: Duration) -> Result<()> {
        validate_interval(interval.as_millis() as u64)?;
        let mut timers = self.timers.lock();
        // dropping the old set aborts its tasks before the new ones exist
        let previous = timers.take().map(|t| t.interval);
        let s = &self.shared;
        *timers = Some(Timers {
            interval,
            handles: [
                tokio::spawn(sampling_loop(s.clone(), interval)),
                tokio::spawn(interpolation_loop(s.clone(), interval / 4)),
                tokio::spawn(ui_refresh_loop(s.clone(), self.ui_refresh)),
            ],
        });
        info!(interval_ms = interval.as_millis() as u64, ?previous, "timers (re)started");
        Ok(())
    }

    pub fn stop(&self) {
        if self.timers.lock().take().is_some() {
            info!("timers stopped");
        }
    }

    pub fn is_running(&self) -> bool { self.timers.lock().is_some() }
    pub fn interval(&self) -> Option<Duration> { self.timers.lock().as_ref().map(|t| t.interval) }
    pub fn in_flight(&self) -> bool { self.shared.in_flight.load(Ordering::Acquire) }
    pub fn events(&self) -> &EventSystem { &self.shared.events }

    /// Run one sampling cycle now, outside the timer. Returns `false` when a
    /// cycle was already in flight and this one was dropped.
    pub async fn sample_now(&self) -> bool {
        match CycleGuard::try_acquire(&self.shared) {
            Some(guard) => {
                run_cycle(guard).await;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.shared.now();
        self.shared.analyzer.lock().snapshot(now)
    }

    pub fn with_analyzer<R>(&self, f: impl FnOnce(&NetworkAnalyzer) -> R) -> R {
        f(&self.shared.analyzer.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::FnSampler;
    use netpulse_core::Metric;

    fn scheduler(sampler: FnSampler) -> Scheduler {
        Scheduler::new(AnalyzerConfig::default(), Duration::from_secs(60), Arc::new(sampler), EventSystem::new(64))
    }

    #[tokio::test]
    async fn sample_now_honours_guard() {
        let s = scheduler(FnSampler::new(|| async { Ok(Sample::new(25.0, 1.0, 0.0)) }));
        assert!(s.sample_now().await);
        assert!(!s.in_flight());

        let held = CycleGuard::try_acquire(&s.shared);
        assert!(held.is_some());
        assert!(!s.sample_now().await);
        drop(held);
        assert!(s.sample_now().await);
        assert_eq!(s.with_analyzer(|a| a.history(Metric::Latency).len()), 2);
    }

    #[tokio::test]
    async fn restart_rejects_out_of_range_interval() {
        let s = scheduler(FnSampler::new(|| async { Ok(Sample::new(25.0, 1.0, 0.0)) }));
        assert!(s.restart(Duration::from_millis(50)).is_err());
        assert!(!s.is_running());
        s.restart(Duration::from_millis(200)).unwrap();
        assert_eq!(s.interval(), Some(Duration::from_millis(200)));
        s.stop();
        assert!(!s.is_running());
    }
}
