use std::future;
use std::sync::Arc;
use std::time::Duration;

use tether_binding::{BindingCoordinator, DeviceClassifier, MetricsSink};
use tether_config::TetherConfig;
use tether_memory::PressureSampler;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::TokioClock;
use crate::command::{Command, LauncherHandle};

struct PressurePolling {
    sampler: PressureSampler,
    interval: Duration,
}

/// The coordinator plus everything that drives it: commands, timers, and pressure polling.
///
/// [`crate::Launcher`] runs this on its own thread; tests can run it on any tokio runtime.
pub struct CoordinationLoop {
    coordinator: BindingCoordinator,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    pressure: Option<PressurePolling>,
    moderate_pool_capacity: Option<usize>,
}

impl CoordinationLoop {
    pub fn new(
        config: &TetherConfig,
        classifier: &dyn DeviceClassifier,
        metrics: Arc<dyn MetricsSink>,
        shutdown: CancellationToken,
    ) -> (Self, LauncherHandle) {
        let coordinator = BindingCoordinator::new(config.binding.settings(), classifier)
            .with_clock(Arc::new(TokioClock))
            .with_metrics(metrics);
        let pressure = config.pressure.poll_interval().map(|interval| PressurePolling {
            sampler: PressureSampler::system(config.pressure.thresholds()),
            interval,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            coordinator,
            commands: rx,
            shutdown,
            pressure,
            moderate_pool_capacity: config.binding.moderate_pool_capacity(),
        };
        (service, LauncherHandle::new(tx))
    }

    /// Serve until shutdown is requested or every [`LauncherHandle`] is dropped.
    pub async fn run(self) {
        let CoordinationLoop {
            mut coordinator,
            mut commands,
            shutdown,
            pressure,
            moderate_pool_capacity,
        } = self;

        if let Some(capacity) = moderate_pool_capacity {
            if let Err(err) = coordinator.enable_moderate_pool(capacity) {
                tracing::warn!(
                    target = "tether.launcher",
                    error = %err,
                    "moderate binding pool not enabled"
                );
            }
        }

        let (mut sampler, mut poll) = match pressure {
            Some(PressurePolling { sampler, interval }) => {
                let mut poll = tokio::time::interval(interval);
                poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
                (Some(sampler), Some(poll))
            }
            None => (None, None),
        };

        tracing::info!(
            target = "tether.launcher",
            low_memory_device = coordinator.is_low_memory_device(),
            pressure_polling = poll.is_some(),
            "coordination loop started"
        );

        loop {
            let deadline = coordinator.next_deadline().map(Instant::from_std);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => handle_command(&mut coordinator, command),
                    None => break,
                },
                _ = sleep_until(deadline) => {}
                _ = tick(&mut poll) => {
                    let signal = sampler.as_mut().and_then(PressureSampler::sample);
                    if let Some(signal) = signal {
                        coordinator.handle_memory_signal(signal);
                    }
                }
            }

            let ran = coordinator.run_due_tasks();
            if ran > 0 {
                tracing::trace!(target = "tether.launcher", ran, "ran deferred binding tasks");
            }
        }

        tracing::info!(target = "tether.launcher", "coordination loop stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(poll) => {
            poll.tick().await;
        }
        None => future::pending().await,
    }
}

fn handle_command(coordinator: &mut BindingCoordinator, command: Command) {
    match command {
        Command::Register { id, worker } => coordinator.register_worker(id, worker),
        Command::SetForeground { id, in_foreground } => {
            coordinator.set_foreground(id, in_foreground)
        }
        Command::VisibilityDetermined(id) => coordinator.on_visibility_determined(id),
        Command::SentToBackground(reply) => {
            let _ = reply.send(coordinator.on_sent_to_background());
        }
        Command::BroughtToForeground => coordinator.on_brought_to_foreground(),
        Command::Deregister(id) => coordinator.deregister_worker(id),
        Command::IsDeregistered { id, reply } => {
            let _ = reply.send(coordinator.is_deregistered(id));
        }
        Command::EnableModeratePool { capacity, reply } => {
            let _ = reply.send(coordinator.enable_moderate_pool(capacity));
        }
        Command::ReleaseAllModerateBindings => coordinator.release_all_moderate_bindings(),
        Command::MemorySignal(signal) => coordinator.handle_memory_signal(signal),
        Command::Snapshot(reply) => {
            let _ = reply.send(coordinator.snapshot());
        }
    }
}
