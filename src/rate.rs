// Per-second rates from cumulative OS counters.

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
struct RateSample {
    counters: Vec<u64>,
    at: Instant,
}

/// Keeps the previous counter vector per device/interface and turns each new
/// observation into `(current - previous) / elapsed_secs`.
///
/// No rate is produced for the first observation of a key, for two observations
/// at the same instant, or when any counter went backwards (device replaced,
/// wraparound). In the last case the key is re-baselined on the new values.
#[derive(Debug, Default)]
pub struct RateTracker {
    last: HashMap<String, RateSample>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, key: &str, counters: &[u64], at: Instant) -> Option<Vec<f64>> {
        let Some(prev) = self.last.get_mut(key) else {
            self.last.insert(
                key.to_string(),
                RateSample {
                    counters: counters.to_vec(),
                    at,
                },
            );
            return None;
        };

        let elapsed = at.saturating_duration_since(prev.at).as_secs_f64();
        if elapsed <= 0.0 {
            // Same instant: keep the older baseline so the next cycle spans the full gap.
            return None;
        }

        let discontinuity = prev.counters.len() != counters.len()
            || prev
                .counters
                .iter()
                .zip(counters)
                .any(|(previous, current)| current < previous);

        let rates = if discontinuity {
            tracing::debug!(key, "counter reset detected; re-baselining");
            None
        } else {
            Some(
                prev.counters
                    .iter()
                    .zip(counters)
                    .map(|(previous, current)| (current - previous) as f64 / elapsed)
                    .collect(),
            )
        };

        prev.counters.clear();
        prev.counters.extend_from_slice(counters);
        prev.at = at;
        rates
    }

    /// Forgets keys that are no longer reported.
    pub fn retain<'a, I>(&mut self, live_keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: std::collections::HashSet<&str> = live_keys.into_iter().collect();
        self.last.retain(|k, _| live.contains(k.as_str()));
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
