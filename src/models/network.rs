// Network interface models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceInfo {
    pub name: String,
    pub mac_address: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetIoCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

impl NetIoCounters {
    pub(crate) fn as_vec(&self) -> [u64; 6] {
        [
            self.bytes_sent,
            self.bytes_recv,
            self.packets_sent,
            self.packets_recv,
            self.errors_in,
            self.errors_out,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetIoRate {
    pub bytes_sent_per_sec: f64,
    pub bytes_recv_per_sec: f64,
    pub packets_sent_per_sec: f64,
    pub packets_recv_per_sec: f64,
    pub errors_in_per_sec: f64,
    pub errors_out_per_sec: f64,
}

impl NetIoRate {
    pub(crate) fn from_rates(rates: &[f64]) -> Option<Self> {
        match *rates {
            [sent, recv, packets_sent, packets_recv, errors_in, errors_out] => Some(Self {
                bytes_sent_per_sec: sent,
                bytes_recv_per_sec: recv,
                packets_sent_per_sec: packets_sent,
                packets_recv_per_sec: packets_recv,
                errors_in_per_sec: errors_in,
                errors_out_per_sec: errors_out,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub interfaces: Vec<InterfaceInfo>,
    pub io: BTreeMap<String, NetIoCounters>,
    /// Only interfaces with a valid rate this cycle are present.
    pub io_rates: BTreeMap<String, NetIoRate>,
    pub last_update: DateTime<Utc>,
}

impl NetworkMetrics {
    pub fn total_recv_bytes_per_sec(&self) -> f64 {
        self.io_rates.values().map(|r| r.bytes_recv_per_sec).sum()
    }

    pub fn total_sent_bytes_per_sec(&self) -> f64 {
        self.io_rates.values().map(|r| r.bytes_sent_per_sec).sum()
    }
}
