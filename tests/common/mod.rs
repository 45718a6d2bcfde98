// Shared test helpers: scriptable samplers for aggregator tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hostwatch::models::{CustomMetrics, DomainSample};
use hostwatch::samplers::{SampleError, Sampler};
use tokio_util::sync::CancellationToken;

/// Field names every mock sample carries; all hold the same sequence number.
pub const MOCK_FIELDS: [&str; 4] = ["seq", "a", "b", "c"];

/// Sampler producing `Custom` samples whose fields all equal a per-sampler
/// success counter, so a partially written sample is detectable.
pub struct MockSampler {
    name: String,
    interval: Duration,
    delay: Duration,
    fail_rate: f64,
    failing: Arc<AtomicBool>,
    successes: AtomicU64,
    started: Arc<AtomicU64>,
    finished: Arc<AtomicU64>,
}

impl MockSampler {
    pub fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            delay: Duration::ZERO,
            fail_rate: 0.0,
            failing: Arc::new(AtomicBool::new(false)),
            successes: AtomicU64::new(0),
            started: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Each collection takes `delay` before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Each collection fails with probability `rate`.
    pub fn with_fail_rate(mut self, rate: f64) -> Self {
        self.fail_rate = rate;
        self
    }

    /// Switch that forces every following collection to fail while set.
    pub fn failing_switch(&self) -> Arc<AtomicBool> {
        self.failing.clone()
    }

    /// Number of collections that began.
    pub fn started_counter(&self) -> Arc<AtomicU64> {
        self.started.clone()
    }

    /// Number of collections that ran to completion, successful or not.
    pub fn finished_counter(&self) -> Arc<AtomicU64> {
        self.finished.clone()
    }
}

#[async_trait]
impl Sampler for MockSampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn collect(&self, cancel: &CancellationToken) -> Result<DomainSample, SampleError> {
        if cancel.is_cancelled() {
            return Err(SampleError::Cancelled);
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst)
            || (self.fail_rate > 0.0 && fastrand::f64() < self.fail_rate)
        {
            return Err(SampleError::unavailable(format!("{} (injected)", self.name)));
        }
        let seq = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(mock_sample(seq))
    }
}

pub fn mock_sample(seq: u64) -> DomainSample {
    DomainSample::Custom(CustomMetrics {
        values: MOCK_FIELDS
            .iter()
            .map(|f| (f.to_string(), seq as f64))
            .collect::<BTreeMap<_, _>>(),
        last_update: chrono::Utc::now(),
    })
}

/// Sequence number of a mock sample, or `None` when its fields disagree.
pub fn consistent_seq(metrics: &CustomMetrics) -> Option<u64> {
    let seq = *metrics.values.get("seq")?;
    let whole = MOCK_FIELDS
        .iter()
        .all(|f| metrics.values.get(*f) == Some(&seq));
    whole.then_some(seq as u64)
}

pub fn seq_of(sample: &DomainSample) -> Option<u64> {
    match sample {
        DomainSample::Custom(m) => consistent_seq(m),
        _ => None,
    }
}

pub fn arc(s: MockSampler) -> Arc<dyn Sampler> {
    Arc::new(s)
}
