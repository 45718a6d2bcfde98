// Network interface sampler

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sysinfo::Networks;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::{SampleError, Sampler, ensure_live};
use crate::models::{DomainSample, InterfaceInfo, NetIoCounters, NetIoRate, NetworkMetrics};
use crate::rate::RateTracker;

const VIRTUAL_PREFIXES: &[&str] = &[
    "veth", "docker", "br-", "virbr", "tun", "tap", "vnet", "kube", "flannel", "cali", "cni",
];

/// Container/bridge/tunnel interfaces, by name prefix.
pub fn is_virtual_interface(name: &str) -> bool {
    VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p))
}

struct NetworkState {
    networks: Networks,
    rates: RateTracker,
}

pub struct NetworkSampler {
    interval: Duration,
    /// Interface names to keep; empty keeps all.
    interfaces: Arc<Vec<String>>,
    exclude_virtual: bool,
    state: Arc<Mutex<NetworkState>>,
}

impl NetworkSampler {
    pub fn new(interval: Duration, interfaces: Vec<String>, exclude_virtual: bool) -> Self {
        Self {
            interval,
            interfaces: Arc::new(interfaces),
            exclude_virtual,
            state: Arc::new(Mutex::new(NetworkState {
                networks: Networks::new_with_refreshed_list(),
                rates: RateTracker::new(),
            })),
        }
    }
}

fn keep_interface(name: &str, has_addresses: bool, wanted: &[String], exclude_virtual: bool) -> bool {
    if exclude_virtual && is_virtual_interface(name) {
        return false;
    }
    if !has_addresses {
        return false;
    }
    wanted.is_empty() || wanted.iter().any(|w| w == name)
}

#[async_trait]
impl Sampler for NetworkSampler {
    fn name(&self) -> &str {
        "network"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip_all, fields(sampler = "network"))]
    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        ensure_live(cancel)?;
        let state = self.state.clone();
        let wanted = self.interfaces.clone();
        let exclude_virtual = self.exclude_virtual;
        tokio::task::spawn_blocking(move || {
            let mut guard = state
                .lock()
                .map_err(|_| SampleError::LockPoisoned("network sysinfo"))?;
            let NetworkState { networks, rates } = &mut *guard;
            networks.refresh(true);
            if networks.list().is_empty() {
                return Err(SampleError::unavailable("network interfaces"));
            }

            let mut interfaces = Vec::new();
            let mut io = BTreeMap::new();
            for (name, data) in networks.list() {
                let addresses: Vec<String> = data
                    .ip_networks()
                    .iter()
                    .map(|n| format!("{}/{}", n.addr, n.prefix))
                    .collect();
                if !keep_interface(name, !addresses.is_empty(), &wanted, exclude_virtual) {
                    continue;
                }
                interfaces.push(InterfaceInfo {
                    name: name.clone(),
                    mac_address: data.mac_address().to_string(),
                    addresses,
                });
                io.insert(
                    name.clone(),
                    NetIoCounters {
                        bytes_sent: data.total_transmitted(),
                        bytes_recv: data.total_received(),
                        packets_sent: data.total_packets_transmitted(),
                        packets_recv: data.total_packets_received(),
                        errors_in: data.total_errors_on_received(),
                        errors_out: data.total_errors_on_transmitted(),
                    },
                );
            }
            interfaces.sort_by(|a, b| a.name.cmp(&b.name));

            let now = Instant::now();
            let mut io_rates = BTreeMap::new();
            for (name, counters) in &io {
                if let Some(rate) = rates
                    .observe(name, &counters.as_vec(), now)
                    .and_then(|r| NetIoRate::from_rates(&r))
                {
                    io_rates.insert(name.clone(), rate);
                }
            }
            rates.retain(io.keys().map(String::as_str));

            Ok(DomainSample::Network(NetworkMetrics {
                interfaces,
                io,
                io_rates,
                last_update: chrono::Utc::now(),
            }))
        })
        .await?
    }
}
