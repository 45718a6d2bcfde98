// Host identity, uptime and load sampler

use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live, linux};
use crate::models::{DomainSample, HostMetrics, LoadAverage};

pub struct HostSampler {
    interval: Duration,
}

impl HostSampler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

fn load_average() -> Option<LoadAverage> {
    if cfg!(unix) {
        let l = System::load_average();
        Some(LoadAverage {
            one: l.one,
            five: l.five,
            fifteen: l.fifteen,
        })
    } else {
        None
    }
}

#[async_trait]
impl Sampler for HostSampler {
    fn name(&self) -> &str {
        "host"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "host"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        tokio::task::spawn_blocking(|| {
            let hostname = System::host_name()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| SampleError::unavailable("host name"))?;
            let platform = linux::read_os_release_name()
                .or_else(System::name)
                .unwrap_or_else(System::distribution_id);

            Ok(DomainSample::Host(HostMetrics {
                hostname,
                os: std::env::consts::OS.to_string(),
                platform,
                platform_version: System::os_version().unwrap_or_default(),
                kernel_version: System::kernel_version().unwrap_or_default(),
                arch: System::cpu_arch(),
                uptime_secs: System::uptime(),
                boot_time: System::boot_time(),
                load_average: load_average(),
                last_update: chrono::Utc::now(),
            }))
        })
        .await?
    }
}
