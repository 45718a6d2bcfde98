// Physical memory and swap sampler

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{MemoryRefreshKind, System};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live, linux};
use crate::models::{DomainSample, MemoryMetrics, SwapMetrics, percent_of};

pub struct MemorySampler {
    interval: Duration,
    sys: Arc<Mutex<System>>,
}

impl MemorySampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sys: Arc::new(Mutex::new(System::new())),
        }
    }
}

/// Swap is optional; a host without it reports zeros.
fn swap_metrics(total: u64, used: u64, free: u64) -> SwapMetrics {
    if total == 0 {
        return SwapMetrics::default();
    }
    SwapMetrics {
        total,
        used,
        free,
        used_percent: percent_of(used, total),
    }
}

#[async_trait]
impl Sampler for MemorySampler {
    fn name(&self) -> &str {
        "memory"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "memory"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|_| SampleError::LockPoisoned("memory sysinfo"))?;
            sys.refresh_memory_specifics(MemoryRefreshKind::everything());

            let total = sys.total_memory();
            if total == 0 {
                return Err(SampleError::unavailable("virtual memory"));
            }
            let available = sys.available_memory();
            let used = sys.used_memory();

            let swap = swap_metrics(sys.total_swap(), sys.used_swap(), sys.free_swap());
            let (buffers, cached) = linux::read_buffers_cached();

            Ok(DomainSample::Memory(MemoryMetrics {
                total,
                used,
                available,
                free: sys.free_memory(),
                used_percent: percent_of(used, total),
                buffers,
                cached,
                swap,
                last_update: chrono::Utc::now(),
            }))
        })
        .await?
    }
}
