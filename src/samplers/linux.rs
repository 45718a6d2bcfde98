// Linux-specific helpers: /proc, /etc/os-release, hwmon fans, block device IO.

use std::collections::BTreeMap;
use std::path::Path;

use crate::models::{CpuTimes, DiskIoCounters, FanReading};

const SECTOR_SIZE: u64 = 512;

/// USER_HZ; /proc/stat counts in these ticks on every mainstream kernel config.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Read first "model name" from /proc/cpuinfo (Linux). Prefer over sysinfo when it returns "cpu0" etc.
pub(super) fn read_cpu_model_linux() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        for line in content.lines() {
            if line.starts_with("model name") {
                let name = line
                    .find(": ")
                    .map(|i| line[i + 2..].trim())
                    .filter(|s| !s.is_empty() && *s != "cpu0")?;
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Distribution name from /etc/os-release, PRETTY_NAME preferred over NAME.
pub(super) fn read_os_release_name() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/etc/os-release").ok()?;
        return parse_os_release_name(&content);
    }
    #[cfg(not(target_os = "linux"))]
    None
}

fn parse_os_release_name(content: &str) -> Option<String> {
    for key in ["PRETTY_NAME=", "NAME="] {
        if let Some(v) = content
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
        {
            return Some(v.to_string());
        }
    }
    None
}

/// Aggregate CPU time from /proc/stat (Linux).
pub(super) fn read_cpu_times() -> Option<CpuTimes> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/stat").ok()?;
        return parse_proc_stat_cpu_times(&content);
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Reads the summed `cpu ` line. Kernels older than 2.6.11 lack `steal`, which then reads 0.
fn parse_proc_stat_cpu_times(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let ticks: Vec<f64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>().map(|t| t as f64 / CLOCK_TICKS_PER_SEC))
        .collect::<Result<_, _>>()
        .ok()?;
    if ticks.len() < 4 {
        return None;
    }
    let at = |i: usize| ticks.get(i).copied().unwrap_or(0.0);
    Some(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

/// `Buffers` and `Cached` from /proc/meminfo, in bytes (Linux).
pub(super) fn read_buffers_cached() -> (Option<u64>, Option<u64>) {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = std::fs::read_to_string("/proc/meminfo") {
            return parse_meminfo_buffers_cached(&content);
        }
    }
    (None, None)
}

fn parse_meminfo_buffers_cached(content: &str) -> (Option<u64>, Option<u64>) {
    let field = |key: &str| {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix(':')?;
            let kib = rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
            Some(kib * 1024)
        })
    };
    (field("Buffers"), field("Cached"))
}

/// Parses /proc/diskstats into cumulative counters keyed by device name.
/// Malformed lines are skipped.
pub fn parse_diskstats(content: &str) -> BTreeMap<String, DiskIoCounters> {
    let mut out = BTreeMap::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let num = |i: usize| fields[i].parse::<u64>().ok();
        let (Some(reads), Some(sectors_read), Some(writes), Some(sectors_written)) =
            (num(3), num(5), num(7), num(9))
        else {
            continue;
        };
        out.insert(
            fields[2].to_string(),
            DiskIoCounters {
                read_bytes: sectors_read.saturating_mul(SECTOR_SIZE),
                write_bytes: sectors_written.saturating_mul(SECTOR_SIZE),
                read_count: reads,
                write_count: writes,
            },
        );
    }
    out
}

fn is_virtual_block_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram")
}

/// Per physical device IO counters (Linux). `None` when /proc/diskstats is unreadable.
/// Partitions are dropped by keeping only names present under /sys/block.
pub(super) fn read_disk_io_counters() -> Option<BTreeMap<String, DiskIoCounters>> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/diskstats").ok()?;
        let sys_block = Path::new("/sys/block");
        let check_sysfs = sys_block.is_dir();
        let mut counters = parse_diskstats(&content);
        counters.retain(|name, _| {
            !is_virtual_block_device(name) && (!check_sysfs || sys_block.join(name).exists())
        });
        return Some(counters);
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Walks `<root>/hwmon*/` for `fan<N>_input` files. Fans reading 0 RPM and
/// unreadable entries are skipped. Fails only when `root` itself is unreadable.
pub fn read_fan_speeds(root: &Path) -> std::io::Result<Vec<FanReading>> {
    let mut fans = Vec::new();
    for entry in std::fs::read_dir(root)?.flatten() {
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        if !dir_name.starts_with("hwmon") {
            continue;
        }
        let device_path = entry.path();
        let Ok(device_name) = std::fs::read_to_string(device_path.join("name")) else {
            continue;
        };
        let device_name = device_name.trim();
        let Ok(files) = std::fs::read_dir(&device_path) else {
            continue;
        };
        for file in files.flatten() {
            let file_name = file.file_name().to_string_lossy().into_owned();
            let Some(fan_num) = file_name
                .strip_prefix("fan")
                .and_then(|rest| rest.strip_suffix("_input"))
            else {
                continue;
            };
            let Some(rpm) = std::fs::read_to_string(file.path())
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
            else {
                continue;
            };
            if rpm == 0 {
                continue;
            }
            fans.push(FanReading {
                name: format!("{device_name}_fan{fan_num}"),
                rpm,
            });
        }
    }
    fans.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(fans)
}
