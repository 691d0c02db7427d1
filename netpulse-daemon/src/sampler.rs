#![forbid(unsafe_code)]

//! Sources of real samples.
//!
//! The scheduler only knows the [`Sampler`] trait. Timeouts on a hung fetch
//! belong to the implementation, not to the caller.

use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use netpulse_core::Sample;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::errors::Result;

#[async_trait]
pub trait Sampler: Send + Sync {
    /// Fetch one measurement. An error skips the tick; nothing is recorded.
    async fn fetch(&self) -> Result<Sample>;
}

/// Host-side simulator: integer latency in 20..=50 ms, integer jitter in
/// 1..=5 ms, packet loss uniform in [0, 0.2] % rounded to two decimals.
pub struct SimulatedSampler {
    rng: Mutex<StdRng>,
}

impl SimulatedSampler {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn next_sample(&self) -> Sample {
        let mut rng = self.rng.lock();
        let latency = rng.gen_range(20u32..=50);
        let jitter = rng.gen_range(1u32..=5);
        let loss: f64 = rng.gen_range(0.0..=0.2);
        Sample::new(f64::from(latency), f64::from(jitter), (loss * 100.0).round() / 100.0)
    }
}

impl Default for SimulatedSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for SimulatedSampler {
    async fn fetch(&self) -> Result<Sample> {
        Ok(self.next_sample())
    }
}

type FetchFuture = Pin<Box<dyn Future<Output = Result<Sample>> + Send>>;

/// Adapts a closure returning a future into a [`Sampler`]; handy for scripted tests.
pub struct FnSampler {
    f: Arc<dyn Fn() -> FetchFuture + Send + Sync>,
}

impl FnSampler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Sample>> + Send + 'static,
    {
        Self { f: Arc::new(move || Box::pin(f()) as FetchFuture) }
    }
}

#[async_trait]
impl Sampler for FnSampler {
    async fn fetch(&self) -> Result<Sample> {
        (self.f)().await
    }
}
