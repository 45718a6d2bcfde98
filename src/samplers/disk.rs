// Partition usage and block device IO sampler

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sysinfo::Disks;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live, linux};
use crate::models::{
    DiskIoCounters, DiskIoRate, DiskMetrics, DomainSample, PartitionUsage, percent_of,
};
use crate::rate::RateTracker;

const PSEUDO_FILESYSTEMS: &[&str] = &[
    "proc",
    "sysfs",
    "tmpfs",
    "devtmpfs",
    "squashfs",
    "cgroup",
    "cgroup2",
    "securityfs",
    "debugfs",
    "tracefs",
    "devpts",
    "mqueue",
    "pstore",
    "bpf",
    "configfs",
    "fusectl",
    "hugetlbfs",
    "autofs",
    "overlay",
];

/// Virtual/kernel filesystems that carry no useful capacity data.
pub fn is_pseudo_filesystem(fs_type: &str) -> bool {
    PSEUDO_FILESYSTEMS
        .iter()
        .any(|p| fs_type.eq_ignore_ascii_case(p))
}

/// Usage row for one mount, or `None` when its capacity could not be read.
fn partition_usage(
    device: String,
    mount_point: String,
    fs_type: String,
    total: u64,
    free: u64,
) -> Option<PartitionUsage> {
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(free);
    Some(PartitionUsage {
        device,
        mount_point,
        fs_type,
        total,
        used,
        free,
        used_percent: percent_of(used, total),
    })
}

struct DiskState {
    disks: Disks,
    rates: RateTracker,
}

#[derive(Debug, Clone)]
struct PartitionFilter {
    /// Mount points or device names to keep when `include_all` is false.
    partitions: Vec<String>,
    include_all: bool,
}

impl PartitionFilter {
    fn wanted(&self, device: &str, mount_point: &str) -> bool {
        self.include_all
            || self
                .partitions
                .iter()
                .any(|p| p == mount_point || p == device)
    }
}

pub struct DiskSampler {
    interval: Duration,
    filter: PartitionFilter,
    state: Arc<Mutex<DiskState>>,
}

impl DiskSampler {
    pub fn new(interval: Duration, partitions: Vec<String>, include_all: bool) -> Self {
        Self {
            interval,
            filter: PartitionFilter {
                partitions,
                include_all,
            },
            state: Arc::new(Mutex::new(DiskState {
                disks: Disks::new_with_refreshed_list(),
                rates: RateTracker::new(),
            })),
        }
    }
}

#[async_trait]
impl Sampler for DiskSampler {
    fn name(&self) -> &str {
        "disk"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "disk"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        let state = self.state.clone();
        let filter = self.filter.clone();
        tokio::task::spawn_blocking(move || {
            let mut state = state
                .lock()
                .map_err(|_| SampleError::LockPoisoned("disk sysinfo"))?;
            state.disks.refresh(true);
            if state.disks.list().is_empty() {
                return Err(SampleError::unavailable("disk partitions"));
            }

            let mut partitions = Vec::new();
            let mut fallback_io = BTreeMap::new();
            for d in state.disks.list() {
                let fs_type = d.file_system().to_string_lossy().into_owned();
                if is_pseudo_filesystem(&fs_type) {
                    continue;
                }
                let device = d.name().to_string_lossy().into_owned();
                let mount_point = d.mount_point().to_string_lossy().into_owned();
                if !filter.wanted(&device, &mount_point) {
                    continue;
                }
                let usage = d.usage();
                fallback_io.insert(
                    device.clone(),
                    DiskIoCounters {
                        read_bytes: usage.total_read_bytes,
                        write_bytes: usage.total_written_bytes,
                        read_count: 0,
                        write_count: 0,
                    },
                );
                partitions.extend(partition_usage(
                    device,
                    mount_point,
                    fs_type,
                    d.total_space(),
                    d.available_space(),
                ));
            }

            let io = linux::read_disk_io_counters().unwrap_or(fallback_io);

            let now = Instant::now();
            let mut io_rates = BTreeMap::new();
            for (device, counters) in &io {
                if let Some(rate) = state
                    .rates
                    .observe(device, &counters.as_vec(), now)
                    .and_then(|r| DiskIoRate::from_rates(&r))
                {
                    io_rates.insert(device.clone(), rate);
                }
            }
            state.rates.retain(io.keys().map(String::as_str));

            Ok(DomainSample::Disk(DiskMetrics {
                partitions,
                io,
                io_rates,
                last_update: chrono::Utc::now(),
            }))
        })
        .await?
    }
}
