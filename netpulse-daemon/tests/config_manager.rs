use std::{sync::Arc, time::Duration};

use netpulse_core::{AnalyzerConfig, Sample};
use tokio_test::assert_ok;
use netpulse_daemon::{
    ConfigManager, EventSystem, FnSampler, MemoryHost, MonitorError, MonitorEvent, Scheduler, SettingsHost,
};

struct Rig {
    host: Arc<MemoryHost>,
    scheduler: Arc<Scheduler>,
    manager: ConfigManager,
    events: EventSystem,
}

fn rig() -> Rig {
    let events = EventSystem::new(256);
    let sampler = FnSampler::new(|| async { Ok(Sample::new(25.0, 1.0, 0.0)) });
    let scheduler = Arc::new(Scheduler::new(
        AnalyzerConfig::default(),
        Duration::from_secs(60),
        Arc::new(sampler),
        events.clone(),
    ));
    let host = Arc::new(MemoryHost::new(200));
    let manager = ConfigManager::new(200, host.clone(), scheduler.clone(), events.clone());
    Rig { host, scheduler, manager, events }
}

#[tokio::test(start_paused = true)]
async fn out_of_range_is_rejected_without_side_effects() {
    let r = rig();
    assert_ok!(r.scheduler.restart(Duration::from_millis(200)));

    for bad in [0, 99, 2_001, 10_000] {
        match r.manager.update_interval(bad).await {
            Err(MonitorError::ConfigRejected(msg)) => {
                assert_eq!(msg, "Please enter a value between 100 and 2000 milliseconds")
            }
            other => panic!("expected rejection for {bad}, got {other:?}"),
        }
    }
    assert_eq!(r.manager.interval_ms().await, 200);
    assert_eq!(r.host.get().await.version, 0);
    assert_eq!(r.scheduler.interval(), Some(Duration::from_millis(200)));
}

#[tokio::test(start_paused = true)]
async fn accepted_interval_restarts_timers() {
    let r = rig();
    let mut rx = r.events.subscribe();
    assert_ok!(r.scheduler.restart(Duration::from_millis(200)));

    assert!(r.manager.update_interval(1_000).await.unwrap());
    assert_eq!(r.manager.interval_ms().await, 1_000);
    assert_eq!(r.host.interval().await.unwrap(), 1_000);
    assert_eq!(r.scheduler.interval(), Some(Duration::from_millis(1_000)));

    let mut changed = false;
    while let Ok(ev) = rx.try_recv() {
        if let MonitorEvent::IntervalChanged { interval_ms } = ev {
            assert_eq!(interval_ms, 1_000);
            changed = true;
        }
    }
    assert!(changed);
}

#[tokio::test(start_paused = true)]
async fn bounds_are_inclusive() {
    let r = rig();
    let manager = r.manager.with_settle(Duration::ZERO);
    assert!(manager.update_interval(100).await.unwrap());
    assert!(manager.update_interval(2_000).await.unwrap());
    assert_eq!(r.host.get().await.version, 2);
}

#[tokio::test]
async fn unreachable_host_keeps_current_interval() {
    let r = rig();
    r.host.set_reachable(false);
    let err = r.manager.update_interval(500).await.unwrap_err();
    assert!(matches!(err, MonitorError::HostUnavailable(_)));
    assert_eq!(err.user_message(), "Failed to update interval. Please try again.");
    assert_eq!(r.manager.interval_ms().await, 200);
    assert!(!r.scheduler.is_running());
}

#[tokio::test]
async fn declined_change_is_not_applied() {
    let r = rig();
    r.host.set_accepting(false);
    assert!(!r.manager.update_interval(500).await.unwrap());
    assert_eq!(r.manager.interval_ms().await, 200);
    assert!(!r.scheduler.is_running());

    let resp = r.manager.apply(500).await;
    assert!(!resp.success);
    assert_eq!(resp.interval_ms, 200);
}

#[tokio::test]
async fn apply_reports_validation_message() {
    let r = rig();
    let resp = r.manager.apply(50).await;
    assert!(!resp.success);
    assert_eq!(resp.message, "Please enter a value between 100 and 2000 milliseconds");
}
