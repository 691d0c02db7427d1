#![forbid(unsafe_code)]

use std::{sync::Arc, time::Duration};

use netpulse_core::config::validate_interval;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    errors::{MonitorError, Result},
    event_system::{EventSystem, MonitorEvent},
    host::SettingsHost,
    scheduler::Scheduler,
};

/// Pause between the host accepting a new interval and the timers restarting.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Outcome of an interval update, shaped for a settings dialog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigResponse {
    pub success: bool,
    pub message: String,
    pub interval_ms: u64,
}

/// Owns the polling interval and applies changes through the host.
#[derive(Clone)]
pub struct ConfigManager {
    interval_ms: Arc<RwLock<u64>>,
    host: Arc<dyn SettingsHost>,
    scheduler: Arc<Scheduler>,
    events: EventSystem,
    settle: Duration,
}

impl ConfigManager {
    pub fn new(initial_ms: u64, host: Arc<dyn SettingsHost>, scheduler: Arc<Scheduler>, events: EventSystem) -> Self {
        Self { interval_ms: Arc::new(RwLock::new(initial_ms)), host, scheduler, events, settle: DEFAULT_SETTLE }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub async fn interval_ms(&self) -> u64 {
        *self.interval_ms.read().await
    }

    /// Validate, round-trip through the host, then store and restart.
    ///
    /// Out-of-range values fail with [`MonitorError::ConfigRejected`] before
    /// the host is contacted. `Ok(false)` means the host declined; in that
    /// case and on any error the current interval and timers are untouched.
    pub async fn update_interval(&self, interval_ms: u64) -> Result<bool> {
        if let Err(e) = validate_interval(interval_ms) {
            warn!(interval_ms, "interval rejected");
            return Err(match e {
                netpulse_core::Error::Config(msg) => MonitorError::rejected(msg),
                other => other.into(),
            });
        }

        let accepted = match self.host.set_interval(interval_ms).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, interval_ms, "failed to update interval on host");
                return Err(e);
            }
        };
        if !accepted {
            warn!(interval_ms, "host declined interval change");
            return Ok(false);
        }

        *self.interval_ms.write().await = interval_ms;
        tokio::time::sleep(self.settle).await;
        self.scheduler.restart(Duration::from_millis(interval_ms))?;
        info!(interval_ms, "sampling interval updated");
        self.events.publish(MonitorEvent::IntervalChanged { interval_ms });
        Ok(true)
    }

    /// [`update_interval`](Self::update_interval) folded into a response, never an error.
    pub async fn apply(&self, interval_ms: u64) -> ConfigResponse {
        match self.update_interval(interval_ms).await {
            Ok(true) => ConfigResponse { success: true, message: "updated".into(), interval_ms },
            Ok(false) => ConfigResponse {
                success: false,
                message: "host declined the change".into(),
                interval_ms: self.interval_ms().await,
            },
            Err(e) => ConfigResponse { success: false, message: e.user_message(), interval_ms: self.interval_ms().await },
        }
    }
}
