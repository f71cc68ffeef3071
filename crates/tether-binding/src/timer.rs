use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Cancelable token returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TimerHandle(u64);

/// Deadline-ordered one-shot tasks owned by a single thread.
///
/// Nothing runs on its own: the owner polls [`TimerQueue::pop_due`] with the current time and
/// executes what comes out. Tasks sharing a deadline come out in scheduling order.
#[derive(Debug)]
pub(crate) struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Instant, u64), T>,
    deadlines: HashMap<u64, Instant>,
}

impl<T> TimerQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub(crate) fn schedule(&mut self, deadline: Instant, task: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancels a pending task and hands it back. Returns `None` if it already ran or was
    /// cancelled.
    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let deadline = self.deadlines.remove(&handle.0)?;
        self.pending.remove(&(deadline, handle.0))
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest task whose deadline is at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, T)> {
        let (&(deadline, _), _) = self.pending.first_key_value()?;
        if deadline > now {
            return None;
        }
        let ((_, id), task) = self.pending.pop_first()?;
        self.deadlines.remove(&id);
        Some((TimerHandle(id), task))
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
