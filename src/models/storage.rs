// Partition usage and block device IO models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionUsage {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

/// Cumulative IO counters of one physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
}

impl DiskIoCounters {
    pub(crate) fn as_vec(&self) -> [u64; 4] {
        [
            self.read_bytes,
            self.write_bytes,
            self.read_count,
            self.write_count,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoRate {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_count_per_sec: f64,
    pub write_count_per_sec: f64,
}

impl DiskIoRate {
    pub(crate) fn from_rates(rates: &[f64]) -> Option<Self> {
        match *rates {
            [read_bytes, write_bytes, read_count, write_count] => Some(Self {
                read_bytes_per_sec: read_bytes,
                write_bytes_per_sec: write_bytes,
                read_count_per_sec: read_count,
                write_count_per_sec: write_count,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskMetrics {
    pub partitions: Vec<PartitionUsage>,
    /// Keyed by device name (e.g. "sda", "nvme0n1").
    pub io: BTreeMap<String, DiskIoCounters>,
    /// Only devices with a valid rate this cycle are present.
    pub io_rates: BTreeMap<String, DiskIoRate>,
    pub last_update: DateTime<Utc>,
}

impl DiskMetrics {
    pub fn total_read_bytes_per_sec(&self) -> f64 {
        self.io_rates.values().map(|r| r.read_bytes_per_sec).sum()
    }

    pub fn total_write_bytes_per_sec(&self) -> f64 {
        self.io_rates.values().map(|r| r.write_bytes_per_sec).sum()
    }
}
