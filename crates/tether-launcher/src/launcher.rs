use std::sync::Arc;
use std::thread::JoinHandle;

use tether_binding::{DeviceClassifier, FixedDeviceClass, MetricsSink};
use tether_config::{DeviceConfig, TetherConfig};
use tether_memory::SystemDeviceClassifier;
use tokio_util::sync::CancellationToken;

use crate::command::LauncherHandle;
use crate::error::LauncherError;
use crate::service::CoordinationLoop;

const THREAD_NAME: &str = "tether-launcher";

/// The device classifier described by `[device]`.
pub fn classifier_for(config: &DeviceConfig) -> Box<dyn DeviceClassifier> {
    match config.force_low_memory {
        Some(low_memory) => Box::new(FixedDeviceClass(low_memory)),
        None => Box::new(SystemDeviceClassifier::new(config.threshold_bytes())),
    }
}

/// Owns the coordination thread.
///
/// Dropping the launcher stops the thread and waits for it; pending deferred tasks are
/// discarded.
pub struct Launcher {
    handle: LauncherHandle,
    shutdown: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Launcher {
    pub fn spawn(
        config: &TetherConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, LauncherError> {
        let classifier = classifier_for(&config.device);
        Self::spawn_with_classifier(config, classifier.as_ref(), metrics)
    }

    pub fn spawn_with_classifier(
        config: &TetherConfig,
        classifier: &dyn DeviceClassifier,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, LauncherError> {
        let shutdown = CancellationToken::new();
        let (service, handle) =
            CoordinationLoop::new(config, classifier, metrics, shutdown.clone());

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::error!(
                            target = "tether.launcher",
                            error = %err,
                            "failed to build coordination runtime"
                        );
                        return;
                    }
                };
                runtime.block_on(service.run());
            })
            .map_err(LauncherError::Spawn)?;

        Ok(Self {
            handle,
            shutdown,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> LauncherHandle {
        self.handle.clone()
    }

    /// Stop the coordination thread and wait for it to exit.
    pub fn shutdown(mut self) -> Result<(), LauncherError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), LauncherError> {
        self.shutdown.cancel();
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread.join().map_err(|_| LauncherError::Panicked)
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(target = "tether.launcher", error = %err, "coordination thread failed");
        }
    }
}
