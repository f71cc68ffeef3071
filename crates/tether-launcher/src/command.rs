use std::sync::Arc;

use tether_binding::{BindingError, BindingSnapshot, MemorySignal, WorkerHandle, WorkerId};
use tokio::sync::{mpsc, oneshot};

use crate::error::LauncherError;

pub(crate) enum Command {
    Register {
        id: WorkerId,
        worker: Arc<dyn WorkerHandle>,
    },
    SetForeground {
        id: WorkerId,
        in_foreground: bool,
    },
    VisibilityDetermined(WorkerId),
    SentToBackground(oneshot::Sender<Result<(), BindingError>>),
    BroughtToForeground,
    Deregister(WorkerId),
    IsDeregistered {
        id: WorkerId,
        reply: oneshot::Sender<bool>,
    },
    EnableModeratePool {
        capacity: usize,
        reply: oneshot::Sender<Result<(), BindingError>>,
    },
    ReleaseAllModerateBindings,
    MemorySignal(MemorySignal),
    Snapshot(oneshot::Sender<BindingSnapshot>),
}

/// Cloneable sender side of the coordination thread.
///
/// Every method forwards to the coordinator on its own thread. Fire-and-forget methods return
/// as soon as the command is queued; queries wait for the reply.
#[derive(Clone)]
pub struct LauncherHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl LauncherHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    fn send(&self, command: Command) -> Result<(), LauncherError> {
        self.commands
            .send(command)
            .map_err(|_| LauncherError::Closed)
    }

    async fn query<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LauncherError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| LauncherError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn register_worker(
        &self,
        id: WorkerId,
        worker: Arc<dyn WorkerHandle>,
    ) -> Result<(), LauncherError> {
        self.send(Command::Register { id, worker })
    }

    pub fn set_foreground(&self, id: WorkerId, in_foreground: bool) -> Result<(), LauncherError> {
        self.send(Command::SetForeground { id, in_foreground })
    }

    pub fn on_visibility_determined(&self, id: WorkerId) -> Result<(), LauncherError> {
        self.send(Command::VisibilityDetermined(id))
    }

    pub async fn on_sent_to_background(&self) -> Result<(), LauncherError> {
        Ok(self.query(Command::SentToBackground).await??)
    }

    pub fn on_brought_to_foreground(&self) -> Result<(), LauncherError> {
        self.send(Command::BroughtToForeground)
    }

    pub fn deregister_worker(&self, id: WorkerId) -> Result<(), LauncherError> {
        self.send(Command::Deregister(id))
    }

    pub async fn is_deregistered(&self, id: WorkerId) -> Result<bool, LauncherError> {
        self.query(|reply| Command::IsDeregistered { id, reply })
            .await
    }

    pub async fn enable_moderate_pool(&self, capacity: usize) -> Result<(), LauncherError> {
        Ok(self
            .query(|reply| Command::EnableModeratePool { capacity, reply })
            .await??)
    }

    pub fn release_all_moderate_bindings(&self) -> Result<(), LauncherError> {
        self.send(Command::ReleaseAllModerateBindings)
    }

    pub fn memory_signal(&self, signal: MemorySignal) -> Result<(), LauncherError> {
        self.send(Command::MemorySignal(signal))
    }

    pub async fn snapshot(&self) -> Result<BindingSnapshot, LauncherError> {
        self.query(Command::Snapshot).await
    }
}
