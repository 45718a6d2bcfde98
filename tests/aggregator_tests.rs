// Aggregator scheduling, publishing and shutdown tests (mock samplers, paused clock)

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{MockSampler, arc, consistent_seq, seq_of};
use hostwatch::aggregator::{Aggregator, AggregatorConfig, AggregatorError};
use hostwatch::models::Snapshot;

fn publish_every(ms: u64) -> AggregatorConfig {
    AggregatorConfig {
        publish_interval: Duration::from_millis(ms),
    }
}

fn counting_callback(agg: &Aggregator) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    agg.register_snapshot_callback(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[tokio::test(start_paused = true)]
async fn test_first_sample_arrives_before_first_interval() {
    let agg = Aggregator::new(
        vec![arc(MockSampler::new("slow_cadence", Duration::from_secs(10)))],
        publish_every(100),
    )
    .unwrap();
    let published: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = published.clone();
    agg.register_snapshot_callback(move |s| sink.lock().unwrap().push(s.clone()));
    agg.start().unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let first = published.lock().unwrap().first().cloned().expect("one publish");
    assert_eq!(
        first.custom.get("slow_cadence").and_then(consistent_seq),
        Some(1)
    );
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_keeps_previous_value() {
    let sampler = MockSampler::new("flaky", Duration::from_millis(100));
    let failing = sampler.failing_switch();
    let started = sampler.started_counter();
    let agg = Aggregator::new(vec![arc(sampler)], publish_every(50)).unwrap();
    agg.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(agg.latest("flaky").as_ref().and_then(seq_of), Some(1));

    failing.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(550)).await;

    assert!(started.load(Ordering::SeqCst) >= 5, "sampler kept polling");
    assert_eq!(agg.latest("flaky").as_ref().and_then(seq_of), Some(1));
    assert_eq!(
        agg.snapshot().custom.get("flaky").and_then(consistent_seq),
        Some(1)
    );
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_never_successful_domain_stays_absent() {
    let sampler = MockSampler::new("broken", Duration::from_millis(100)).with_fail_rate(1.0);
    let agg = Aggregator::new(
        vec![
            arc(sampler),
            arc(MockSampler::new("ok", Duration::from_millis(100))),
        ],
        publish_every(100),
    )
    .unwrap();
    agg.start().unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;

    let snapshot = agg.snapshot();
    assert!(snapshot.custom.contains_key("ok"));
    assert!(!snapshot.custom.contains_key("broken"));
    assert!(agg.latest("broken").is_none());
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_sampler_does_not_delay_others() {
    let agg = Aggregator::new(
        vec![
            arc(MockSampler::new("slow", Duration::from_millis(100)).with_delay(Duration::from_secs(5))),
            arc(MockSampler::new("fast", Duration::from_millis(100))),
        ],
        publish_every(100),
    )
    .unwrap();
    let publishes = counting_callback(&agg);
    agg.start().unwrap();

    tokio::time::sleep(Duration::from_millis(1_050)).await;

    assert!(agg.latest("fast").as_ref().and_then(seq_of).unwrap_or(0) >= 10);
    assert!(agg.latest("slow").is_none());
    assert_eq!(publishes.load(Ordering::SeqCst), 10);
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_writes_or_callbacks_after_shutdown() {
    let sampler =
        MockSampler::new("slow", Duration::from_millis(100)).with_delay(Duration::from_millis(300));
    let finished = sampler.finished_counter();
    let agg = Aggregator::new(
        vec![
            arc(sampler),
            arc(MockSampler::new("fast", Duration::from_millis(20))),
        ],
        publish_every(50),
    )
    .unwrap();
    let publishes = counting_callback(&agg);
    agg.start().unwrap();

    // Lands in the middle of the slow sampler's second collection.
    tokio::time::sleep(Duration::from_millis(450)).await;
    agg.shutdown().await;
    assert!(!agg.is_running());

    let table_at_shutdown = (
        agg.latest("slow").as_ref().and_then(seq_of),
        agg.latest("fast").as_ref().and_then(seq_of),
    );
    let publishes_at_shutdown = publishes.load(Ordering::SeqCst);
    let finished_at_shutdown = finished.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        (
            agg.latest("slow").as_ref().and_then(seq_of),
            agg.latest("fast").as_ref().and_then(seq_of),
        ),
        table_at_shutdown
    );
    assert_eq!(publishes.load(Ordering::SeqCst), publishes_at_shutdown);
    assert_eq!(finished.load(Ordering::SeqCst), finished_at_shutdown);

    // Idempotent.
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_published_snapshots_are_never_torn() {
    let samplers = (0..6)
        .map(|i| {
            arc(MockSampler::new(
                &format!("m{i}"),
                Duration::from_millis(fastrand::u64(1..=20)),
            )
            .with_delay(Duration::from_millis(fastrand::u64(0..=3)))
            .with_fail_rate(fastrand::f64() * 0.5))
        })
        .collect();
    let agg = Aggregator::new(samplers, publish_every(10)).unwrap();
    let published: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = published.clone();
    agg.register_snapshot_callback(move |s| sink.lock().unwrap().push(s.clone()));
    agg.start().unwrap();

    while published.lock().unwrap().len() < 1_000 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    agg.shutdown().await;

    let published = published.lock().unwrap();
    let mut last_seen: HashMap<String, u64> = HashMap::new();
    for snapshot in published.iter().take(1_000) {
        assert!(snapshot.cpu.is_none() && snapshot.host.is_none());
        for (name, metrics) in &snapshot.custom {
            let seq = consistent_seq(metrics)
                .unwrap_or_else(|| panic!("torn sample for {name}: {metrics:?}"));
            let prev = last_seen.insert(name.clone(), seq).unwrap_or(0);
            assert!(seq >= prev, "{name} went backwards: {prev} -> {seq}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_callback_stops_receiving() {
    let agg = Aggregator::new(
        vec![arc(MockSampler::new("a", Duration::from_millis(100)))],
        publish_every(100),
    )
    .unwrap();
    let kept = counting_callback(&agg);
    let dropped = Arc::new(AtomicUsize::new(0));
    let d = dropped.clone();
    let id = agg.register_snapshot_callback(move |_| {
        d.fetch_add(1, Ordering::SeqCst);
    });
    agg.start().unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(agg.unregister_snapshot_callback(id));
    assert!(!agg.unregister_snapshot_callback(id));
    let dropped_before = dropped.load(Ordering::SeqCst);
    assert_eq!(dropped_before, 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(dropped.load(Ordering::SeqCst), dropped_before);
    assert_eq!(kept.load(Ordering::SeqCst), 5);
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_callback_does_not_stop_publishing() {
    let agg = Aggregator::new(
        vec![arc(MockSampler::new("a", Duration::from_millis(100)))],
        publish_every(100),
    )
    .unwrap();
    agg.register_snapshot_callback(|_| panic!("consumer bug"));
    let after = counting_callback(&agg);
    agg.start().unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(after.load(Ordering::SeqCst), 3);
    agg.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_receive_snapshots() {
    let agg = Aggregator::new(
        vec![arc(MockSampler::new("a", Duration::from_millis(100)))],
        publish_every(100),
    )
    .unwrap();
    let mut rx = agg.subscribe();
    agg.start().unwrap();

    let snapshot = rx.recv().await.expect("published snapshot");
    assert_eq!(snapshot.custom.get("a").and_then(consistent_seq), Some(1));
    agg.shutdown().await;
}

#[test]
fn test_construction_rejects_bad_sampler_sets() {
    assert!(matches!(
        Aggregator::new(vec![], AggregatorConfig::default()),
        Err(AggregatorError::NoSamplers)
    ));
    let dup = vec![
        arc(MockSampler::new("x", Duration::from_secs(1))),
        arc(MockSampler::new("x", Duration::from_secs(2))),
    ];
    assert!(matches!(
        Aggregator::new(dup, AggregatorConfig::default()),
        Err(AggregatorError::DuplicateSampler(name)) if name == "x"
    ));
}

#[test]
fn test_construction_rejects_zero_intervals() {
    assert!(matches!(
        Aggregator::new(
            vec![arc(MockSampler::new("stalled", Duration::ZERO))],
            AggregatorConfig::default(),
        ),
        Err(AggregatorError::ZeroInterval(name)) if name == "stalled"
    ));
    assert!(matches!(
        Aggregator::new(
            vec![arc(MockSampler::new("a", Duration::from_secs(1)))],
            publish_every(0),
        ),
        Err(AggregatorError::ZeroInterval(name)) if name == "publish"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_shutdowns_both_wait_for_loops() {
    let sampler =
        MockSampler::new("slow", Duration::from_millis(100)).with_delay(Duration::from_millis(300));
    let agg = Aggregator::new(
        vec![
            arc(sampler),
            arc(MockSampler::new("fast", Duration::from_millis(20))),
        ],
        publish_every(50),
    )
    .unwrap();
    agg.start().unwrap();
    assert_eq!(agg.active_loops(), 3);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let (first, second) = tokio::join!(
        async {
            agg.shutdown().await;
            agg.active_loops()
        },
        async {
            agg.shutdown().await;
            agg.active_loops()
        },
    );
    assert_eq!((first, second), (0, 0));
    assert!(!agg.is_running());
}

#[test]
fn test_domain_accessors() {
    let agg = Aggregator::new(
        vec![
            arc(MockSampler::new("a", Duration::from_secs(1))),
            arc(MockSampler::new("b", Duration::from_secs(3))),
        ],
        AggregatorConfig::default(),
    )
    .unwrap();
    assert_eq!(agg.domain_names(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(agg.sampler_interval("b"), Some(Duration::from_secs(3)));
    assert_eq!(agg.sampler_interval("missing"), None);
    assert!(!agg.is_running());
}

#[tokio::test]
async fn test_collect_once_reports_each_domain() {
    let agg = Aggregator::new(
        vec![
            arc(MockSampler::new("good", Duration::from_secs(1))),
            arc(MockSampler::new("bad", Duration::from_secs(1)).with_fail_rate(1.0)),
        ],
        AggregatorConfig::default(),
    )
    .unwrap();
    let results = agg.collect_once().await;
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["good", "bad"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(agg.latest("good").is_some());
    assert!(agg.latest("bad").is_none());
}
