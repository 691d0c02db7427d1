#![forbid(unsafe_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{MonitorError, Result};

/// Versioned settings blob as held by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedSettings<T> {
    pub version: u64,
    pub data: T,
}

impl<T> VersionedSettings<T> {
    pub fn new(version: u64, data: T) -> Self {
        Self { version, data }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostSettings {
    pub interval_ms: u64,
}

/// The host process that owns the authoritative polling interval.
#[async_trait]
pub trait SettingsHost: Send + Sync {
    async fn interval(&self) -> Result<u64>;
    /// `Ok(false)` means the host answered but declined the change.
    async fn set_interval(&self, interval_ms: u64) -> Result<bool>;
}

/// In-memory host, useful for tests and the standalone binary.
pub struct MemoryHost {
    inner: Arc<RwLock<VersionedSettings<HostSettings>>>,
    reachable: AtomicBool,
    accepting: AtomicBool,
}

impl MemoryHost {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VersionedSettings::new(0, HostSettings { interval_ms }))),
            reachable: AtomicBool::new(true),
            accepting: AtomicBool::new(true),
        }
    }

    pub async fn get(&self) -> VersionedSettings<HostSettings> {
        self.inner.read().await.clone()
    }

    /// Simulate a broken bridge: every call fails until re-enabled.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MonitorError::host_unavailable("memory host marked unreachable"))
        }
    }
}

#[async_trait]
impl SettingsHost for MemoryHost {
    async fn interval(&self) -> Result<u64> {
        self.ensure_reachable()?;
        Ok(self.inner.read().await.data.interval_ms)
    }

    async fn set_interval(&self, interval_ms: u64) -> Result<bool> {
        self.ensure_reachable()?;
        if !self.accepting.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut guard = self.inner.write().await;
        guard.version += 1;
        guard.data.interval_ms = interval_ms;
        debug!(version = guard.version, interval_ms, "host interval updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepted_update_bumps_version() {
        let host = MemoryHost::new(200);
        assert_eq!(host.interval().await.unwrap(), 200);
        assert!(host.set_interval(750).await.unwrap());
        let s = host.get().await;
        assert_eq!(s, VersionedSettings::new(1, HostSettings { interval_ms: 750 }));
    }

    #[tokio::test]
    async fn declined_and_unreachable_leave_state_alone() {
        let host = MemoryHost::new(200);
        host.set_accepting(false);
        assert!(!host.set_interval(300).await.unwrap());

        host.set_reachable(false);
        assert!(matches!(host.set_interval(300).await, Err(MonitorError::HostUnavailable(_))));
        assert!(host.interval().await.is_err());

        host.set_reachable(true);
        assert_eq!(host.get().await, VersionedSettings::new(0, HostSettings { interval_ms: 200 }));
    }
}
