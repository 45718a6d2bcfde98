// Per-domain sample union and the merged snapshot

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CpuMetrics, DiskMetrics, HostMetrics, MemoryMetrics, NetworkMetrics, SensorMetrics};

/// Result shape for samplers outside the six built-in domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetrics {
    pub values: BTreeMap<String, f64>,
    pub last_update: DateTime<Utc>,
}

/// One successful collection from one sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "data", rename_all = "lowercase")]
pub enum DomainSample {
    Cpu(CpuMetrics),
    Memory(MemoryMetrics),
    Disk(DiskMetrics),
    Network(NetworkMetrics),
    Sensors(SensorMetrics),
    Host(HostMetrics),
    Custom(CustomMetrics),
}

impl DomainSample {
    pub fn last_update(&self) -> DateTime<Utc> {
        match self {
            DomainSample::Cpu(m) => m.last_update,
            DomainSample::Memory(m) => m.last_update,
            DomainSample::Disk(m) => m.last_update,
            DomainSample::Network(m) => m.last_update,
            DomainSample::Sensors(m) => m.last_update,
            DomainSample::Host(m) => m.last_update,
            DomainSample::Custom(m) => m.last_update,
        }
    }

    /// Domain name of the variant; also the table key a built-in sample must be
    /// stored under to land in its snapshot slot.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainSample::Cpu(_) => "cpu",
            DomainSample::Memory(_) => "memory",
            DomainSample::Disk(_) => "disk",
            DomainSample::Network(_) => "network",
            DomainSample::Sensors(_) => "sensors",
            DomainSample::Host(_) => "host",
            DomainSample::Custom(_) => "custom",
        }
    }
}

/// Latest known value of every domain at one instant. `None` means the domain
/// has not produced a successful sample yet (or never will on this host).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu: Option<CpuMetrics>,
    pub memory: Option<MemoryMetrics>,
    pub disk: Option<DiskMetrics>,
    pub network: Option<NetworkMetrics>,
    pub sensors: Option<SensorMetrics>,
    pub host: Option<HostMetrics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, CustomMetrics>,
}

impl Snapshot {
    /// Copies every stored sample into its slot, routed by table key. A built-in
    /// variant fills its slot only when stored under its own domain name
    /// (`"cpu"` for `Cpu`, ...); other built-in variants are left out. Custom
    /// samples are keyed by the sampler name they were stored under.
    pub fn compose(table: &HashMap<String, DomainSample>, timestamp: DateTime<Utc>) -> Self {
        let mut snapshot = Snapshot {
            timestamp,
            ..Default::default()
        };
        for (name, sample) in table {
            if let DomainSample::Custom(m) = sample {
                snapshot.custom.insert(name.clone(), m.clone());
                continue;
            }
            if name != sample.kind() {
                tracing::debug!(
                    sampler = %name,
                    kind = sample.kind(),
                    "built-in sample under a foreign name; not composed"
                );
                continue;
            }
            match sample {
                DomainSample::Cpu(m) => snapshot.cpu = Some(m.clone()),
                DomainSample::Memory(m) => snapshot.memory = Some(m.clone()),
                DomainSample::Disk(m) => snapshot.disk = Some(m.clone()),
                DomainSample::Network(m) => snapshot.network = Some(m.clone()),
                DomainSample::Sensors(m) => snapshot.sensors = Some(m.clone()),
                DomainSample::Host(m) => snapshot.host = Some(m.clone()),
                DomainSample::Custom(_) => {}
            }
        }
        snapshot
    }

    /// Number of domains holding a value.
    pub fn present_domains(&self) -> usize {
        [
            self.cpu.is_some(),
            self.memory.is_some(),
            self.disk.is_some(),
            self.network.is_some(),
            self.sensors.is_some(),
            self.host.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count()
            + self.custom.len()
    }
}
