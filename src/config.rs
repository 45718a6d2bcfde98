use std::time::Duration;

use serde::Deserialize;

use crate::alerts::DEFAULT_ALERT_HISTORY;
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Shortest allowed polling or publish interval.
pub const MIN_INTERVAL_MS: u64 = 100;

const HISTORY_CAPACITY_RANGE: std::ops::RangeInclusive<usize> = 10..=200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub intervals: IntervalsConfig,
    pub disk: DiskConfig,
    pub network: NetworkConfig,
    pub thresholds: ThresholdsConfig,
    pub history: HistoryConfig,
}

/// Per-domain polling cadence and snapshot publish cadence, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntervalsConfig {
    pub cpu_ms: u64,
    pub memory_ms: u64,
    pub disk_ms: u64,
    pub network_ms: u64,
    pub sensors_ms: u64,
    pub host_ms: u64,
    pub publish_ms: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            cpu_ms: 1_000,
            memory_ms: 2_000,
            disk_ms: 5_000,
            network_ms: 2_000,
            sensors_ms: 5_000,
            host_ms: 5_000,
            publish_ms: 500,
        }
    }
}

impl IntervalsConfig {
    pub fn cpu(&self) -> Duration {
        Duration::from_millis(self.cpu_ms)
    }

    pub fn memory(&self) -> Duration {
        Duration::from_millis(self.memory_ms)
    }

    pub fn disk(&self) -> Duration {
        Duration::from_millis(self.disk_ms)
    }

    pub fn network(&self) -> Duration {
        Duration::from_millis(self.network_ms)
    }

    pub fn sensors(&self) -> Duration {
        Duration::from_millis(self.sensors_ms)
    }

    pub fn host(&self) -> Duration {
        Duration::from_millis(self.host_ms)
    }

    pub fn publish(&self) -> Duration {
        Duration::from_millis(self.publish_ms)
    }

    fn named(&self) -> [(&'static str, u64); 7] {
        [
            ("cpu_ms", self.cpu_ms),
            ("memory_ms", self.memory_ms),
            ("disk_ms", self.disk_ms),
            ("network_ms", self.network_ms),
            ("sensors_ms", self.sensors_ms),
            ("host_ms", self.host_ms),
            ("publish_ms", self.publish_ms),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Mount points or device names to report when `include_all` is false.
    pub partitions: Vec<String>,
    pub include_all: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            partitions: Vec::new(),
            include_all: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface names to report; empty reports every interface with an address.
    pub interfaces: Vec<String>,
    pub exclude_virtual: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            exclude_virtual: true,
        }
    }
}

/// Warning/critical lines: cpu and memory in percent, temperature in °C.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub temp_warning: f64,
    pub temp_critical: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu_warning: 70.0,
            cpu_critical: 90.0,
            memory_warning: 80.0,
            memory_critical: 95.0,
            temp_warning: 70.0,
            temp_critical: 85.0,
        }
    }
}

impl ThresholdsConfig {
    /// `(key, warning, critical, is_percent)` for each metric.
    fn named(&self) -> [(&'static str, f64, f64, bool); 3] {
        [
            ("cpu", self.cpu_warning, self.cpu_critical, true),
            ("memory", self.memory_warning, self.memory_critical, true),
            ("temp", self.temp_warning, self.temp_critical, false),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Points kept per trend series.
    pub capacity: usize,
    /// Alert events kept in the alert log.
    pub alert_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            alert_capacity: DEFAULT_ALERT_HISTORY,
        }
    }
}

impl AppConfig {
    /// Loads `$CONFIG_FILE` (must exist), else `./config.toml` if present, else defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string("config.toml") {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
                Err(e) => Err(anyhow::anyhow!("reading config.toml: {e}")),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, ms) in self.intervals.named() {
            anyhow::ensure!(
                ms >= MIN_INTERVAL_MS,
                "intervals.{key} must be >= {MIN_INTERVAL_MS}, got {ms}"
            );
        }
        anyhow::ensure!(
            HISTORY_CAPACITY_RANGE.contains(&self.history.capacity),
            "history.capacity must be between {} and {}, got {}",
            HISTORY_CAPACITY_RANGE.start(),
            HISTORY_CAPACITY_RANGE.end(),
            self.history.capacity
        );
        anyhow::ensure!(
            self.history.alert_capacity > 0,
            "history.alert_capacity must be > 0, got {}",
            self.history.alert_capacity
        );
        for (key, warning, critical, is_percent) in self.thresholds.named() {
            anyhow::ensure!(
                warning.is_finite() && critical.is_finite(),
                "thresholds.{key}_warning and thresholds.{key}_critical must be finite, got {warning} / {critical}"
            );
            anyhow::ensure!(
                !is_percent || ((0.0..=100.0).contains(&warning) && (0.0..=100.0).contains(&critical)),
                "thresholds.{key}_warning and thresholds.{key}_critical must be within 0..=100, got {warning} / {critical}"
            );
            anyhow::ensure!(
                warning < critical,
                "thresholds.{key}_warning must be below thresholds.{key}_critical, got {warning} >= {critical}"
            );
        }
        Ok(())
    }
}
