/// Error types for the monitor runtime
use thiserror::Error;

pub type Result<T, E = MonitorError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// Carries the message shown to the operator verbatim.
    #[error("{0}")]
    ConfigRejected(String),
    #[error("settings host unavailable: {0}")]
    HostUnavailable(String),
    #[error(transparent)]
    Core(#[from] netpulse_core::Error),
}

impl MonitorError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::ConfigRejected(msg.into())
    }

    pub fn host_unavailable(msg: impl Into<String>) -> Self {
        Self::HostUnavailable(msg.into())
    }

    /// Text suitable for a user-facing alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigRejected(msg) => msg.clone(),
            Self::Core(netpulse_core::Error::Config(msg)) => msg.clone(),
            Self::HostUnavailable(_) => "Failed to update interval. Please try again.".into(),
            other => other.to_string(),
        }
    }
}
