//! Metric samplers.
//!
//! A sampler queries one metric domain from the OS. The aggregator owns a set of
//! them and runs each on its own interval. Blocking OS calls run on tokio's
//! blocking pool; samplers never hold aggregator locks.

mod cpu;
mod disk;
mod host;
mod linux;
mod memory;
mod network;
mod sensors;

pub use cpu::CpuSampler;
pub use disk::{DiskSampler, is_pseudo_filesystem};
pub use host::HostSampler;
pub use linux::{parse_diskstats, read_fan_speeds};
pub use memory::MemorySampler;
pub use network::{NetworkSampler, is_virtual_interface};
pub use sensors::{SensorsSampler, filter_useful_temperatures};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::models::DomainSample;

/// Why one collection cycle of one sampler produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("{what} unavailable")]
    Unavailable { what: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
    #[error("collection cancelled")]
    Cancelled,
}

impl SampleError {
    pub fn unavailable(what: impl Into<String>) -> Self {
        SampleError::Unavailable { what: what.into() }
    }
}

/// One metric domain. Implement this to add a domain to the aggregator.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Stable domain identifier, unique within an aggregator.
    fn name(&self) -> &str;

    /// Desired polling cadence.
    fn interval(&self) -> Duration;

    /// Queries the OS once. Returns `Err` only when the domain's primary data
    /// could not be read; optional sub-fields degrade to empty values.
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError>;
}

/// The six built-in samplers configured from `config`.
pub fn default_samplers(config: &AppConfig) -> Vec<Arc<dyn Sampler>> {
    let intervals = &config.intervals;
    vec![
        Arc::new(CpuSampler::new(intervals.cpu())),
        Arc::new(MemorySampler::new(intervals.memory())),
        Arc::new(DiskSampler::new(
            intervals.disk(),
            config.disk.partitions.clone(),
            config.disk.include_all,
        )),
        Arc::new(NetworkSampler::new(
            intervals.network(),
            config.network.interfaces.clone(),
            config.network.exclude_virtual,
        )),
        Arc::new(SensorsSampler::new(intervals.sensors())),
        Arc::new(HostSampler::new(intervals.host())),
    ]
}

pub(crate) fn ensure_live(cancel: &CancellationToken) -> Result<(), SampleError> {
    if cancel.is_cancelled() {
        Err(SampleError::Cancelled)
    } else {
        Ok(())
    }
}
