// Snapshot consumer: trend history and threshold alerts.

use std::sync::Arc;

use crate::aggregator::{Aggregator, CallbackId};
use crate::alerts::{AlertEngine, AlertEvent};
use crate::config::AppConfig;
use crate::history::{Series, TrendHistory};
use crate::models::Snapshot;

pub const CPU_METRIC: &str = "cpu";
pub const MEMORY_METRIC: &str = "memory";
pub const TEMPERATURE_METRIC: &str = "temperature";

/// Feeds published snapshots into the trend history and the alert engine.
#[derive(Debug, Clone)]
pub struct Monitor {
    history: Arc<TrendHistory>,
    alerts: Arc<AlertEngine>,
}

impl Monitor {
    pub fn new(config: &AppConfig) -> Self {
        let alerts = AlertEngine::with_history_capacity(config.history.alert_capacity);
        let t = &config.thresholds;
        alerts.set_thresholds(CPU_METRIC, t.cpu_warning, t.cpu_critical);
        alerts.set_thresholds(MEMORY_METRIC, t.memory_warning, t.memory_critical);
        alerts.set_thresholds(TEMPERATURE_METRIC, t.temp_warning, t.temp_critical);
        Self {
            history: Arc::new(TrendHistory::new(config.history.capacity)),
            alerts: Arc::new(alerts),
        }
    }

    pub fn history(&self) -> &Arc<TrendHistory> {
        &self.history
    }

    pub fn alerts(&self) -> &Arc<AlertEngine> {
        &self.alerts
    }

    /// Updates trends and alerts from one snapshot. Absent domains are skipped, and
    /// so are throughput series on cycles where no rate could be derived.
    pub fn observe(&self, snapshot: &Snapshot) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        if let Some(cpu) = &snapshot.cpu {
            self.history.push(Series::CpuPercent, cpu.total);
            events.extend(self.alerts.check_value(CPU_METRIC, cpu.total));
        }
        if let Some(mem) = &snapshot.memory {
            self.history.push(Series::MemoryPercent, mem.used_percent);
            events.extend(self.alerts.check_value(MEMORY_METRIC, mem.used_percent));
        }
        if let Some(net) = snapshot.network.as_ref().filter(|n| !n.io_rates.is_empty()) {
            self.history
                .push(Series::NetworkRx, net.total_recv_bytes_per_sec());
            self.history
                .push(Series::NetworkTx, net.total_sent_bytes_per_sec());
        }
        if let Some(disk) = snapshot.disk.as_ref().filter(|d| !d.io_rates.is_empty()) {
            self.history
                .push(Series::DiskRead, disk.total_read_bytes_per_sec());
            self.history
                .push(Series::DiskWrite, disk.total_write_bytes_per_sec());
        }
        if let Some(max) = snapshot.sensors.as_ref().and_then(|s| s.max_temperature()) {
            events.extend(self.alerts.check_value(TEMPERATURE_METRIC, max));
        }

        for event in &events {
            log_event(event);
        }
        events
    }

    /// Registers `observe` as a publish callback on `aggregator`.
    pub fn attach(&self, aggregator: &Aggregator) -> CallbackId {
        let monitor = self.clone();
        aggregator.register_snapshot_callback(move |snapshot| {
            monitor.observe(snapshot);
        })
    }
}

fn log_event(event: &AlertEvent) {
    match (event.from, event.to) {
        (_, None) => tracing::info!(
            metric = %event.metric,
            value = event.value,
            "alert cleared"
        ),
        (from, Some(to)) => {
            let from = from.map_or_else(|| "normal".to_string(), |s| s.to_string());
            tracing::warn!(
                metric = %event.metric,
                from = %from,
                to = %to,
                value = event.value,
                threshold = event.threshold,
                "alert raised"
            )
        }
    }
}
