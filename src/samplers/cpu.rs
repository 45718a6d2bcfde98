// CPU utilisation sampler

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live, linux};
use crate::models::{CpuMetrics, DomainSample};

struct CpuState {
    sys: System,
    primed: bool,
}

/// Per-core usage; the aggregate is the mean of the cores so both always agree.
pub struct CpuSampler {
    interval: Duration,
    state: Arc<Mutex<CpuState>>,
}

impl CpuSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(CpuState {
                sys: System::new(),
                primed: false,
            })),
        }
    }
}

/// Usage clamped to 0..=100; a non-finite reading counts as idle.
fn core_percent(usage: f32) -> f64 {
    let usage = usage as f64;
    if usage.is_finite() {
        usage.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[async_trait]
impl Sampler for CpuSampler {
    fn name(&self) -> &str {
        "cpu"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "cpu"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = state
                .lock()
                .map_err(|_| SampleError::LockPoisoned("cpu sysinfo"))?;
            if !state.primed {
                // Usage is a delta between two refreshes; the first one only sets the baseline.
                state.sys.refresh_cpu_usage();
                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                state.primed = true;
            }
            state.sys.refresh_cpu_usage();

            let cpus = state.sys.cpus();
            if cpus.is_empty() {
                return Err(SampleError::unavailable("cpu usage"));
            }
            let per_core: Vec<f64> = cpus
                .iter()
                .map(|c| core_percent(c.cpu_usage()))
                .collect();
            let model = linux::read_cpu_model_linux()
                .or_else(|| {
                    cpus.first()
                        .map(|c| c.brand().trim().to_string())
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or_else(|| "Unknown".into());

            let mut metrics = CpuMetrics::from_per_core(per_core, model, chrono::Utc::now());
            metrics.times = linux::read_cpu_times();
            Ok(DomainSample::Cpu(metrics))
        })
        .await?
    }
}
