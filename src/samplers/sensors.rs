// Temperature and fan sampler

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::Components;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live, linux};
use crate::models::{DomainSample, SensorMetrics, TemperatureReading};

/// Sensor families worth showing, matched as lowercase label prefixes.
const PRIORITY_PREFIXES: &[&str] = &[
    "coretemp",
    "k10temp",
    "cpu",
    "nvidia",
    "amdgpu",
    "radeon",
    "iwlwifi",
    "bat",
    "acpitz",
    "soc_thermal",
    "gpu",
];

const MAX_PER_FAMILY: usize = 8;

const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Keeps priority sensor families only, at most eight readings per family, in input order.
pub fn filter_useful_temperatures(temps: Vec<TemperatureReading>) -> Vec<TemperatureReading> {
    let mut per_family: HashMap<&'static str, usize> = HashMap::new();
    temps
        .into_iter()
        .filter(|t| {
            let key = t.label.trim().to_lowercase();
            let Some(family) = PRIORITY_PREFIXES
                .iter()
                .copied()
                .find(|p| key.starts_with(*p)) else {
                return false;
            };
            let count = per_family.entry(family).or_insert(0);
            if *count >= MAX_PER_FAMILY {
                return false;
            }
            *count += 1;
            true
        })
        .collect()
}

pub struct SensorsSampler {
    interval: Duration,
    hwmon_root: PathBuf,
    components: Arc<Mutex<Components>>,
}

impl SensorsSampler {
    pub fn new(interval: Duration) -> Self {
        Self::with_hwmon_root(interval, PathBuf::from(DEFAULT_HWMON_ROOT))
    }

    /// Reads fans from `hwmon_root` instead of the platform default.
    pub fn with_hwmon_root(interval: Duration, hwmon_root: PathBuf) -> Self {
        Self {
            interval,
            hwmon_root,
            components: Arc::new(Mutex::new(Components::new_with_refreshed_list())),
        }
    }
}

#[async_trait]
impl Sampler for SensorsSampler {
    fn name(&self) -> &str {
        "sensors"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "sensors"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        let components = self.components.clone();
        let hwmon_root = self.hwmon_root.clone();
        tokio::task::spawn_blocking(move || {
            let temperatures = {
                let mut components = components
                    .lock()
                    .map_err(|_| SampleError::LockPoisoned("sensors sysinfo"))?;
                components.refresh(true);
                let readings = components
                    .list()
                    .iter()
                    .filter_map(|c| {
                        Some(TemperatureReading {
                            label: c.label().to_string(),
                            celsius: c.temperature().filter(|t| t.is_finite())? as f64,
                            max: c.max().map(f64::from),
                            critical: c.critical().map(f64::from),
                        })
                    })
                    .collect();
                filter_useful_temperatures(readings)
            };

            // Hosts without hwmon simply have no fans to report.
            let fans = match linux::read_fan_speeds(&hwmon_root) {
                Ok(fans) => fans,
                Err(e) => {
                    tracing::trace!(error = %e, root = %hwmon_root.display(), "no fan data");
                    Vec::new()
                }
            };

            Ok(DomainSample::Sensors(SensorMetrics {
                temperatures,
                fans,
                last_update: chrono::Utc::now(),
            }))
        })
        .await?
    }
}
