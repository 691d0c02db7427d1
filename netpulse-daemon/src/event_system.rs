#![forbid(unsafe_code)]

use std::sync::Arc;

use netpulse_core::{Snapshot, SpikeEvent, TrendEvent};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

/// Everything a renderer may want to redraw.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A real sample went through the pipeline.
    Sampled(Box<Snapshot>),
    /// Display-only point between real samples.
    Interpolated { value: f64 },
    TrendRecorded(TrendEvent),
    SpikeOpened(SpikeEvent),
    SpikeEscalated(SpikeEvent),
    SpikeClosed(SpikeEvent),
    Elapsed { text: String },
    IntervalChanged { interval_ms: u64 },
    FetchFailed { reason: String },
}

impl MonitorEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sampled(_) => "sampled",
            Self::Interpolated { .. } => "interpolated",
            Self::TrendRecorded(_) => "trend_recorded",
            Self::SpikeOpened(_) => "spike_opened",
            Self::SpikeEscalated(_) => "spike_escalated",
            Self::SpikeClosed(_) => "spike_closed",
            Self::Elapsed { .. } => "elapsed",
            Self::IntervalChanged { .. } => "interval_changed",
            Self::FetchFailed { .. } => "fetch_failed",
        }
    }
}

/// Simple pub/sub for monitor events over a broadcast channel.
#[derive(Clone)]
pub struct EventSystem {
    tx: broadcast::Sender<MonitorEvent>,
    // kinds a subscriber gets when it passes no filter
    default_kinds: Arc<RwLock<Vec<String>>>,
}

impl EventSystem {
    pub fn new(buffer: usize) -> Self {
        let (tx, _rx) = broadcast::channel(buffer);
        let defaults = ["sampled", "trend_recorded", "spike_opened", "spike_escalated", "spike_closed", "elapsed", "interval_changed", "fetch_failed"];
        Self { tx, default_kinds: Arc::new(RwLock::new(defaults.iter().map(|s| s.to_string()).collect())) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> { self.tx.subscribe() }

    /// Returns the number of receivers reached; zero when nobody listens.
    pub fn publish(&self, ev: MonitorEvent) -> usize { self.tx.send(ev).unwrap_or(0) }

    pub async fn set_default_kinds(&self, kinds: Vec<String>) { *self.default_kinds.write().await = kinds; }

    pub async fn matches(&self, ev: &MonitorEvent, filter: &Option<Vec<String>>) -> bool {
        let allow = match filter {
            Some(kinds) => kinds,
            None => &*self.default_kinds.read().await,
        };
        allow.iter().any(|k| k == ev.kind())
    }
}

impl Default for EventSystem {
    fn default() -> Self { Self::new(1024) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let events = EventSystem::new(8);
        assert_eq!(events.publish(MonitorEvent::Interpolated { value: 1.0 }), 0);
        let mut rx = events.subscribe();
        assert_eq!(events.publish(MonitorEvent::IntervalChanged { interval_ms: 300 }), 1);
        match rx.recv().await.unwrap() {
            MonitorEvent::IntervalChanged { interval_ms } => assert_eq!(interval_ms, 300),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn default_filter_hides_interpolation() {
        let events = EventSystem::new(8);
        let interp = MonitorEvent::Interpolated { value: 30.5 };
        let elapsed = MonitorEvent::Elapsed { text: "last 1 minute".into() };
        assert!(!events.matches(&interp, &None).await);
        assert!(events.matches(&elapsed, &None).await);
        assert!(events.matches(&interp, &Some(vec!["interpolated".into()])).await);

        events.set_default_kinds(vec!["interpolated".into()]).await;
        assert!(events.matches(&interp, &None).await);
        assert!(!events.matches(&elapsed, &None).await);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&MonitorEvent::FetchFailed { reason: "timeout".into() }).unwrap();
        assert_eq!(json, r#"{"type":"fetch_failed","reason":"timeout"}"#);
    }
}
