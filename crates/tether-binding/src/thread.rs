use std::sync::OnceLock;
use std::thread::{self, ThreadId};

/// Binds to the first thread that checks it and reports whether later checks happen there.
///
/// Binding lazily lets an owner be constructed on one thread and handed to its coordination
/// thread before first use.
#[derive(Debug, Default)]
pub(crate) struct ThreadChecker {
    owner: OnceLock<ThreadId>,
}

impl ThreadChecker {
    pub(crate) fn called_on_valid_thread(&self) -> bool {
        let current = thread::current().id();
        *self.owner.get_or_init(|| current) == current
    }
}
