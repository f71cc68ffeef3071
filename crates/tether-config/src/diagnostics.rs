use serde::de::DeserializeOwned;

/// Everything noticed while loading a config besides hard parse failures.
///
/// Callers always get a `TetherConfig` when deserialization succeeds, plus whatever here may
/// affect runtime behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Keys the schema does not know, as dotted TOML paths (`binding.capacityy`).
    pub unknown_keys: Vec<String>,
    /// Values that were accepted but probably not what the author meant.
    pub warnings: Vec<ConfigWarning>,
    /// Values that make the configuration internally inconsistent.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend_validation(&mut self, validation: ValidationDiagnostics) {
        self.warnings.extend(validation.warnings);
        self.errors.extend(validation.errors);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub warnings: Vec<ConfigWarning>,
    pub errors: Vec<ConfigValidationError>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    InvalidValue { toml_path: String, message: String },
    LoggingLevelInvalid { value: String, normalized: String },
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidValue { toml_path: String, message: String },
    PressureThresholdsNotAscending,
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        // Root paths render with a leading `.`.
        unknown.push(path.to_string().trim_start_matches('.').to_string());
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}
