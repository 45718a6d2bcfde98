// Config loading, defaults and validation tests

use std::time::Duration;

use hostwatch::config::AppConfig;

const VALID_CONFIG: &str = r#"
[intervals]
cpu_ms = 500
memory_ms = 1000
disk_ms = 10000
network_ms = 1000
sensors_ms = 3000
host_ms = 60000
publish_ms = 250

[disk]
partitions = ["/", "/home"]
include_all = false

[network]
interfaces = ["eth0"]
exclude_virtual = false

[thresholds]
cpu_warning = 60.0
cpu_critical = 80.0
memory_warning = 85.0
memory_critical = 97.0
temp_warning = 75.0
temp_critical = 90.0

[history]
capacity = 120
alert_capacity = 20
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.intervals.cpu(), Duration::from_millis(500));
    assert_eq!(config.intervals.publish(), Duration::from_millis(250));
    assert_eq!(config.intervals.host(), Duration::from_secs(60));
    assert_eq!(config.disk.partitions, vec!["/", "/home"]);
    assert!(!config.disk.include_all);
    assert_eq!(config.network.interfaces, vec!["eth0"]);
    assert!(!config.network.exclude_virtual);
    assert_eq!(config.thresholds.cpu_critical, 80.0);
    assert_eq!(config.history.capacity, 120);
    assert_eq!(config.history.alert_capacity, 20);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults are valid");
    assert_eq!(config.intervals.cpu(), Duration::from_secs(1));
    assert_eq!(config.intervals.memory(), Duration::from_secs(2));
    assert_eq!(config.intervals.disk(), Duration::from_secs(5));
    assert_eq!(config.intervals.network(), Duration::from_secs(2));
    assert_eq!(config.intervals.sensors(), Duration::from_secs(5));
    assert_eq!(config.intervals.host(), Duration::from_secs(5));
    assert_eq!(config.intervals.publish(), Duration::from_millis(500));
    assert!(config.disk.include_all);
    assert!(config.network.exclude_virtual);
    assert_eq!(
        (config.thresholds.cpu_warning, config.thresholds.cpu_critical),
        (70.0, 90.0)
    );
    assert_eq!(
        (config.thresholds.memory_warning, config.thresholds.memory_critical),
        (80.0, 95.0)
    );
    assert_eq!(
        (config.thresholds.temp_warning, config.thresholds.temp_critical),
        (70.0, 85.0)
    );
    assert_eq!(config.history.capacity, 50);
    assert_eq!(config.history.alert_capacity, 100);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[intervals]\ncpu_ms = 2000\n").unwrap();
    assert_eq!(config.intervals.cpu(), Duration::from_secs(2));
    assert_eq!(config.intervals.publish(), Duration::from_millis(500));
}

#[test]
fn test_config_validation_rejects_short_interval() {
    let bad = VALID_CONFIG.replace("publish_ms = 250", "publish_ms = 50");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("intervals.publish_ms"));
}

#[test]
fn test_config_validation_rejects_history_capacity_out_of_range() {
    for cap in ["5", "201"] {
        let bad = VALID_CONFIG.replace("capacity = 120", &format!("capacity = {cap}"));
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("history.capacity"), "{cap}");
    }
}

#[test]
fn test_config_validation_rejects_zero_alert_capacity() {
    let bad = VALID_CONFIG.replace("alert_capacity = 20", "alert_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("history.alert_capacity"));
}

#[test]
fn test_config_validation_rejects_inverted_thresholds() {
    let bad = VALID_CONFIG.replace("cpu_warning = 60.0", "cpu_warning = 85.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("thresholds.cpu_warning"));
}

#[test]
fn test_config_validation_rejects_percent_threshold_above_100() {
    let bad = VALID_CONFIG.replace("memory_critical = 97.0", "memory_critical = 120.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("thresholds.memory"));
}

#[test]
fn test_temperature_thresholds_are_degrees_not_percent() {
    let hot = VALID_CONFIG.replace("temp_critical = 90.0", "temp_critical = 105.0");
    let config = AppConfig::load_from_str(&hot).expect("105 °C is a valid critical line");
    assert_eq!(config.thresholds.temp_critical, 105.0);

    let inverted = VALID_CONFIG.replace("temp_warning = 75.0", "temp_warning = 95.0");
    let err = AppConfig::load_from_str(&inverted).unwrap_err();
    assert!(err.to_string().contains("thresholds.temp_warning"));
}

#[test]
fn test_config_rejects_malformed_toml() {
    assert!(AppConfig::load_from_str("[intervals\ncpu_ms = ").is_err());
    assert!(AppConfig::load_from_str("[intervals]\ncpu_ms = \"fast\"").is_err());
}
