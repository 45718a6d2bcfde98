// Bounded trend series for sparkline-style display.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Fixed-capacity FIFO of samples; the oldest value is evicted first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    values: VecDeque<f64>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Most recent value, or 0.0 when empty.
    pub fn latest(&self) -> f64 {
        self.latest_or(0.0)
    }

    pub fn latest_or(&self, default: f64) -> f64 {
        self.values.back().copied().unwrap_or(default)
    }

    /// Copy of the stored values, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Scalar series kept for trend display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    CpuPercent,
    MemoryPercent,
    NetworkRx,
    NetworkTx,
    DiskRead,
    DiskWrite,
}

impl Series {
    pub const ALL: [Series; 6] = [
        Series::CpuPercent,
        Series::MemoryPercent,
        Series::NetworkRx,
        Series::NetworkTx,
        Series::DiskRead,
        Series::DiskWrite,
    ];
}

/// One `HistoryBuffer` per `Series` behind a single lock. Reads hand out copies.
#[derive(Debug)]
pub struct TrendHistory {
    capacity: usize,
    series: RwLock<HashMap<Series, HistoryBuffer>>,
}

impl TrendHistory {
    pub fn new(capacity: usize) -> Self {
        let series = Series::ALL
            .iter()
            .map(|s| (*s, HistoryBuffer::new(capacity)))
            .collect();
        Self {
            capacity: capacity.max(1),
            series: RwLock::new(series),
        }
    }

    pub fn push(&self, series: Series, value: f64) {
        let mut guard = self.series.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(series)
            .or_insert_with(|| HistoryBuffer::new(self.capacity))
            .push(value);
    }

    pub fn values(&self, series: Series) -> Vec<f64> {
        let guard = self.series.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&series).map(|b| b.values()).unwrap_or_default()
    }

    pub fn latest(&self, series: Series) -> f64 {
        let guard = self.series.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&series).map(|b| b.latest()).unwrap_or(0.0)
    }

    pub fn len(&self, series: Series) -> usize {
        let guard = self.series.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&series).map(|b| b.len()).unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TrendHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
