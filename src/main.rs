use std::time::Duration;

use anyhow::Result;
use hostwatch::aggregator::{Aggregator, AggregatorConfig};
use hostwatch::models::DomainSample;
use hostwatch::monitor::Monitor;
use hostwatch::samplers::{DiskSampler, Sampler, default_samplers};
use hostwatch::{config, version};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

/// How often the running binary logs a one-line status.
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

enum Mode {
    Run,
    SelfTest,
    ListDisks,
}

fn parse_mode() -> Result<Mode> {
    let mut mode = Mode::Run;
    for arg in std::env::args().skip(1) {
        mode = match arg.as_str() {
            "--self-test" => Mode::SelfTest,
            "--list-disks" => Mode::ListDisks,
            "--version" | "-V" => {
                println!("{} {}", version::NAME, version::VERSION);
                std::process::exit(0);
            }
            other => anyhow::bail!(
                "unknown argument {other:?} (expected --self-test, --list-disks or --version)"
            ),
        };
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mode = parse_mode()?;
    let app_config = config::AppConfig::load()?;

    match mode {
        Mode::SelfTest => self_test(&app_config).await,
        Mode::ListDisks => list_disks(&app_config).await,
        Mode::Run => run(&app_config).await,
    }
}

/// Collects every domain once and prints each result, or its error, as JSON.
async fn self_test(app_config: &config::AppConfig) -> Result<()> {
    let aggregator = Aggregator::new(default_samplers(app_config), AggregatorConfig::default())?;
    let mut failed = 0usize;
    for (name, result) in aggregator.collect_once().await {
        let value = match result {
            Ok(sample) => serde_json::to_value(&sample)?,
            Err(e) => {
                failed += 1;
                serde_json::json!({ "domain": name, "error": e.to_string() })
            }
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    tracing::info!(failed, "self-test complete");
    Ok(())
}

async fn list_disks(app_config: &config::AppConfig) -> Result<()> {
    let sampler = DiskSampler::new(
        app_config.intervals.disk(),
        app_config.disk.partitions.clone(),
        app_config.disk.include_all,
    );
    let DomainSample::Disk(disk) = sampler.collect(&CancellationToken::new()).await? else {
        anyhow::bail!("disk sampler returned a non-disk sample");
    };
    for p in &disk.partitions {
        println!(
            "{:<24} {:<24} {:<8} {:>6.1}% of {} bytes",
            p.device, p.mount_point, p.fs_type, p.used_percent, p.total
        );
    }
    Ok(())
}

async fn run(app_config: &config::AppConfig) -> Result<()> {
    tracing::info!(version = version::VERSION, "Starting {}", version::NAME);
    let aggregator = Aggregator::new(
        default_samplers(app_config),
        AggregatorConfig {
            publish_interval: app_config.intervals.publish(),
        },
    )?;
    let monitor = Monitor::new(app_config);
    monitor.attach(&aggregator);
    aggregator.start()?;

    let mut status_tick = tokio::time::interval(STATUS_LOG_INTERVAL);
    status_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately; nothing to report yet.
    status_tick.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
            _ = status_tick.tick() => {
                let snapshot = aggregator.snapshot();
                tracing::info!(
                    domains = snapshot.present_domains(),
                    cpu_percent = snapshot.cpu.as_ref().map(|c| c.total).unwrap_or_default(),
                    memory_percent = snapshot.memory.as_ref().map(|m| m.used_percent).unwrap_or_default(),
                    active_alerts = monitor.alerts().active_alerts().len(),
                    "status"
                );
            }
        }
    }

    aggregator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
