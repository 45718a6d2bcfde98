//! Threshold alerts with a single shared hysteresis band.
//!
//! Each metric identifier is a small state machine (normal, warning, critical).
//! A value at or above the warning line raises an alert, at or above the
//! critical line escalates it, and only a value below the warning line clears
//! it. A critical alert never steps back down to warning on its own.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALERT_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

/// Warning/critical pair for one metric. Callers are expected to install
/// `warning < critical`; the engine does not check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub metric: String,
    pub severity: Severity,
    /// Most recent checked value while the alert is active.
    pub value: f64,
    /// The line that was crossed for the current severity.
    pub threshold: f64,
    pub triggered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message: String,
}

/// Immutable record of a transition into, within, or out of an alert state.
/// `None` on either side means the metric was normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub metric: String,
    pub from: Option<Severity>,
    pub to: Option<Severity>,
    pub value: f64,
    pub threshold: f64,
    pub at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn is_clear(&self) -> bool {
        self.to.is_none()
    }

    pub fn is_raise(&self) -> bool {
        self.from.is_none() && self.to.is_some()
    }
}

#[derive(Debug)]
struct EngineState {
    enabled: bool,
    thresholds: HashMap<String, Thresholds>,
    active: HashMap<String, Alert>,
    history: VecDeque<AlertEvent>,
    history_capacity: usize,
}

impl EngineState {
    fn record(&mut self, event: AlertEvent) {
        self.history.push_back(event);
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }
}

/// Thread-safe alert engine. All reads return copies.
#[derive(Debug)]
pub struct AlertEngine {
    state: RwLock<EngineState>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_ALERT_HISTORY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        let history_capacity = history_capacity.max(1);
        Self {
            state: RwLock::new(EngineState {
                enabled: true,
                thresholds: HashMap::new(),
                active: HashMap::new(),
                history: VecDeque::with_capacity(history_capacity),
                history_capacity,
            }),
        }
    }

    pub fn set_thresholds(&self, metric: &str, warning: f64, critical: f64) {
        let mut state = self.write();
        state
            .thresholds
            .insert(metric.to_string(), Thresholds { warning, critical });
    }

    pub fn thresholds(&self, metric: &str) -> Option<Thresholds> {
        self.read().thresholds.get(metric).copied()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.write().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.read().enabled
    }

    /// Evaluates `value` for `metric` and returns the transition it caused, if any.
    /// Metrics without thresholds and non-finite values are ignored; an active
    /// alert keeps its state and last finite value.
    pub fn check_value(&self, metric: &str, value: f64) -> Option<AlertEvent> {
        if !value.is_finite() {
            return None;
        }
        let mut state = self.write();
        if !state.enabled {
            return None;
        }
        let limits = *state.thresholds.get(metric)?;
        let now = Utc::now();
        let current = state.active.get(metric).map(|a| a.severity);

        let next = match current {
            _ if value < limits.warning => None,
            Some(Severity::Critical) => Some(Severity::Critical),
            _ if value >= limits.critical => Some(Severity::Critical),
            _ => Some(Severity::Warning),
        };

        if next == current {
            if let Some(alert) = state.active.get_mut(metric) {
                alert.value = value;
                alert.updated_at = now;
            }
            return None;
        }

        let event = match next {
            None => {
                let cleared = state.active.remove(metric)?;
                AlertEvent {
                    metric: metric.to_string(),
                    from: Some(cleared.severity),
                    to: None,
                    value,
                    threshold: limits.warning,
                    at: now,
                }
            }
            Some(severity) => {
                let threshold = match severity {
                    Severity::Critical => limits.critical,
                    _ => limits.warning,
                };
                let message = format!(
                    "{metric} {severity}: {value:.1} (threshold: {threshold:.1})"
                );
                let triggered_at = state
                    .active
                    .get(metric)
                    .map(|a| a.triggered_at)
                    .unwrap_or(now);
                state.active.insert(
                    metric.to_string(),
                    Alert {
                        metric: metric.to_string(),
                        severity,
                        value,
                        threshold,
                        triggered_at,
                        updated_at: now,
                        message,
                    },
                );
                AlertEvent {
                    metric: metric.to_string(),
                    from: current,
                    to: Some(severity),
                    value,
                    threshold,
                    at: now,
                }
            }
        };

        state.record(event.clone());
        Some(event)
    }

    /// Active alerts ordered by metric name.
    pub fn active_alerts(&self) -> Vec<Alert> {
        let state = self.read();
        let sorted: BTreeMap<&String, &Alert> = state.active.iter().collect();
        sorted.into_values().cloned().collect()
    }

    pub fn active_alert(&self, metric: &str) -> Option<Alert> {
        self.read().active.get(metric).cloned()
    }

    /// Transition log, oldest first.
    pub fn history(&self) -> Vec<AlertEvent> {
        self.read().history.iter().cloned().collect()
    }

    /// Clears every active alert, logging a clear event for each.
    pub fn clear_all(&self) -> Vec<AlertEvent> {
        let mut state = self.write();
        let now = Utc::now();
        let mut drained: Vec<Alert> = state.active.drain().map(|(_, a)| a).collect();
        drained.sort_by(|a, b| a.metric.cmp(&b.metric));
        let events: Vec<AlertEvent> = drained
            .into_iter()
            .map(|alert| AlertEvent {
                threshold: state
                    .thresholds
                    .get(&alert.metric)
                    .map(|t| t.warning)
                    .unwrap_or(alert.threshold),
                metric: alert.metric,
                from: Some(alert.severity),
                to: None,
                value: alert.value,
                at: now,
            })
            .collect();
        for event in &events {
            state.record(event.clone());
        }
        events
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
