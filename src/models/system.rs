// CPU, memory and host identity models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetrics {
    /// Per-logical-core usage, 0..=100.
    pub per_core: Vec<f64>,
    /// Mean of `per_core`; never sampled on its own.
    pub total: f64,
    pub core_count: usize,
    pub model: String,
    /// Time breakdown since boot; Linux only.
    #[serde(default)]
    pub times: Option<CpuTimes>,
    pub last_update: DateTime<Utc>,
}

/// Cumulative CPU time since boot in seconds, summed over all cores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuTimes {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
}

impl CpuMetrics {
    /// Builds metrics from per-core percentages, deriving `total` as their mean.
    pub fn from_per_core(per_core: Vec<f64>, model: String, last_update: DateTime<Utc>) -> Self {
        let total = mean(&per_core);
        Self {
            core_count: per_core.len(),
            per_core,
            total,
            model,
            times: None,
            last_update,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub free: u64,
    pub used_percent: f64,
    /// Kernel buffer and page cache sizes in bytes; Linux only.
    #[serde(default)]
    pub buffers: Option<u64>,
    #[serde(default)]
    pub cached: Option<u64>,
    pub swap: SwapMetrics,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetrics {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub arch: String,
    pub uptime_secs: u64,
    /// Boot time, seconds since the unix epoch.
    pub boot_time: u64,
    /// `None` where the OS has no load average.
    pub load_average: Option<LoadAverage>,
    pub last_update: DateTime<Utc>,
}

/// Percentage of `part` in `whole`, 0.0 when `whole` is zero.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
