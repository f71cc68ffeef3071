use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, TetherConfig};

impl TetherConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it reports as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_binding(self, &mut out);
        validate_pressure(self, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn validate_binding(config: &TetherConfig, out: &mut ValidationDiagnostics) {
    let binding = &config.binding;
    for (toml_path, value) in [
        ("binding.moderate_reduce_ratio", binding.moderate_reduce_ratio),
        ("binding.low_reduce_ratio", binding.low_reduce_ratio),
    ] {
        if !unit_interval(value) {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: toml_path.to_string(),
                message: format!("must be between 0 and 1, got {value}"),
            });
        }
    }

    if binding.moderate_reduce_ratio > binding.low_reduce_ratio {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "binding.moderate_reduce_ratio".to_string(),
            message: "moderate pressure evicts more than low pressure".to_string(),
        });
    }
}

fn validate_pressure(config: &TetherConfig, out: &mut ValidationDiagnostics) {
    let pressure = &config.pressure;

    if pressure.poll_interval_ms == Some(0) {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "pressure.poll_interval_ms".to_string(),
            message: "0 disables pressure sampling; omit the key instead".to_string(),
        });
    }

    let mut in_range = true;
    for (toml_path, value) in [
        ("pressure.moderate", pressure.moderate),
        ("pressure.low", pressure.low),
        ("pressure.critical", pressure.critical),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            in_range = false;
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: toml_path.to_string(),
                message: format!("must be in (0, 1], got {value}"),
            });
        }
    }

    if in_range && !(pressure.moderate < pressure.low && pressure.low < pressure.critical) {
        out.errors
            .push(ConfigValidationError::PressureThresholdsNotAscending);
    }
}

fn validate_logging(config: &TetherConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }
}
