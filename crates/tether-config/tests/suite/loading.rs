use std::time::Duration;

use tether_config::{ConfigError, TetherConfig};

#[test]
fn loads_every_section_from_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tether.toml");
    std::fs::write(
        &path,
        r#"
[binding]
strong_release_delay_ms = 250
moderate_pool_clear_delay_ms = 3000
moderate_pool_capacity = 4
record_metrics = false

[device]
low_memory_threshold_mb = 1024
force_low_memory = true

[pressure]
poll_interval_ms = 500
critical = 0.9

[logging]
level = "debug"
json = true
stderr = false
"#,
    )
    .expect("write config");

    let config = TetherConfig::load_from_path(&path).expect("config should load");

    let settings = config.binding.settings();
    assert_eq!(settings.strong_release_delay, Duration::from_millis(250));
    assert_eq!(settings.moderate_pool_clear_delay, Duration::from_secs(3));
    assert_eq!(settings.moderate_reduce_ratio, 0.25);
    assert!(!settings.record_metrics);
    assert_eq!(config.binding.moderate_pool_capacity(), Some(4));

    assert_eq!(config.device.force_low_memory, Some(true));
    assert_eq!(config.device.threshold_bytes(), 1024 * 1024 * 1024);

    assert_eq!(config.pressure.poll_interval(), Some(Duration::from_millis(500)));
    assert_eq!(config.pressure.thresholds().critical, 0.9);
    assert_eq!(config.pressure.thresholds().moderate, 0.70);

    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(!config.logging.stderr);
}

#[test]
fn empty_file_is_the_default_config() {
    let (config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics("").expect("config should parse");

    assert_eq!(config, TetherConfig::default());
    assert!(diagnostics.is_empty());
}

#[test]
fn missing_file_reports_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.toml");

    let err = TetherConfig::load_from_path(&path).expect_err("missing file");

    match err {
        ConfigError::Io { path: reported, .. } => assert!(reported.ends_with("missing.toml")),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn type_errors_are_reported_without_source_snippets() {
    let err = TetherConfig::load_from_str_with_diagnostics(
        "[binding]\nmoderate_pool_capacity = \"lots\"\n",
    )
    .expect_err("wrong type");

    let ConfigError::Toml(message) = err else {
        panic!("expected toml error, got {err:?}");
    };
    assert!(!message.contains("moderate_pool_capacity = "), "{message}");
}
