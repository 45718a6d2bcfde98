// Thermal and fan models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureReading {
    pub label: String,
    pub celsius: f64,
    pub max: Option<f64>,
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanReading {
    /// `<hwmon device name>_fan<N>`
    pub name: String,
    pub rpm: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorMetrics {
    pub temperatures: Vec<TemperatureReading>,
    pub fans: Vec<FanReading>,
    pub last_update: DateTime<Utc>,
}

impl SensorMetrics {
    /// Hottest reading, if any sensor reported.
    pub fn max_temperature(&self) -> Option<f64> {
        self.temperatures
            .iter()
            .map(|t| t.celsius)
            .fold(None, |acc, c| Some(acc.map_or(c, |m: f64| m.max(c))))
    }
}
