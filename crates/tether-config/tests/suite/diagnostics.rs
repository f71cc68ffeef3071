use tether_config::{ConfigValidationError, ConfigWarning, TetherConfig};

#[test]
fn unknown_keys_are_reported_with_full_paths() {
    let text = r#"
[binding]
moderate_pool_capacityy = 4

[telemetry]
enabled = true
"#;

    let (config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["binding.moderate_pool_capacityy", "telemetry"]
    );
    assert!(diagnostics.is_ok());
    assert_eq!(config.binding.moderate_pool_capacity(), Some(16));
}

#[test]
fn reduce_ratios_must_be_fractions() {
    let text = r#"
[binding]
moderate_reduce_ratio = 1.5
low_reduce_ratio = -0.1
"#;

    let (_config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    let paths: Vec<&str> = diagnostics
        .errors
        .iter()
        .filter_map(|error| match error {
            ConfigValidationError::InvalidValue { toml_path, .. } => Some(toml_path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        paths,
        vec!["binding.moderate_reduce_ratio", "binding.low_reduce_ratio"]
    );
}

#[test]
fn pressure_thresholds_must_ascend() {
    let text = r#"
[pressure]
moderate = 0.9
low = 0.8
"#;

    let (_config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.errors,
        vec![ConfigValidationError::PressureThresholdsNotAscending]
    );
}

#[test]
fn out_of_range_thresholds_are_reported_individually() {
    let text = r#"
[pressure]
critical = 1.5
"#;

    let (_config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(diagnostics.errors.len(), 1);
    assert!(matches!(
        &diagnostics.errors[0],
        ConfigValidationError::InvalidValue { toml_path, .. } if toml_path == "pressure.critical"
    ));
}

#[test]
fn zero_poll_interval_warns() {
    let (_config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics("[pressure]\npoll_interval_ms = 0\n")
            .expect("config should parse");

    assert!(diagnostics.is_ok());
    assert!(matches!(
        &diagnostics.warnings[..],
        [ConfigWarning::InvalidValue { toml_path, .. }] if toml_path == "pressure.poll_interval_ms"
    ));
}

#[test]
fn invalid_log_level_warns() {
    let (_config, diagnostics) =
        TetherConfig::load_from_str_with_diagnostics("[logging]\nlevel = \"tether=loud\"\n")
            .expect("config should parse");

    assert_eq!(
        diagnostics.warnings,
        vec![ConfigWarning::LoggingLevelInvalid {
            value: "tether=loud".to_string(),
            normalized: "tether=loud".to_string(),
        }]
    );
}
