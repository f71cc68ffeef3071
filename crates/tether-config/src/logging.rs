use std::path::PathBuf;
use std::sync::{Mutex, Once};

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;

static TRACING_INIT: Once = Once::new();

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    pub level: String,

    /// Emit logs in JSON format.
    pub json: bool,

    /// Write logs to stderr.
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while other sinks
    /// remain active.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level with `RUST_LOG` merged on top.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let config_directives = Self::normalize_level_directives(&self.level);
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }

    fn make_writer(&self) -> BoxMakeWriter {
        let file = self.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

        match (self.stderr, file) {
            // Debug builds write through `TestWriter` so `cargo test` captures the output.
            (true, Some(file)) if cfg!(debug_assertions) => BoxMakeWriter::new(
                tracing_subscriber::fmt::writer::TestWriter::with_stderr.and(Mutex::new(file)),
            ),
            (true, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
            (true, None) if cfg!(debug_assertions) => {
                BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
            }
            (true, None) => BoxMakeWriter::new(std::io::stderr),
            (false, Some(file)) => BoxMakeWriter::new(Mutex::new(file)),
            (false, None) => BoxMakeWriter::new(std::io::sink),
        }
    }
}

/// Install the global tracing subscriber. Only the first call in a process has an effect.
///
/// Returns `true` if this call installed the subscriber.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let mut installed = false;
    TRACING_INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(config.env_filter());
        let writer = config.make_writer();
        installed = if config.json {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false);
            tracing::subscriber::set_global_default(registry.with(layer)).is_ok()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            tracing::subscriber::set_global_default(registry.with(layer)).is_ok()
        };

        if installed {
            if let Some(path) = config.file.as_ref() {
                tracing::debug!(
                    target = "tether.config",
                    path = %path.display(),
                    "logging to file"
                );
            }
        }
    });
    installed
}
