use thiserror::Error;

use crate::types::Metric;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config: {0}")]
    Config(String),
    /// A metric value that is not a usable number; the history is left untouched.
    #[error("invalid sample: {metric} = {value}")]
    InvalidSample { metric: Metric, value: f64 },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self { Self::Config(msg.into()) }
    pub fn invalid_sample(metric: Metric, value: f64) -> Self { Self::InvalidSample { metric, value } }
}
