use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// Single-slot, latest-wins handoff between a producer and the engine loop.
///
/// A frame that has not been taken when the next one arrives is replaced,
/// so the consumer never works through a backlog.
#[derive(Debug)]
pub(crate) struct FrameSlot<T> {
    slot: Mutex<Option<T>>,
    ready_tx: Sender<()>,
    ready_rx: Receiver<()>,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        let (ready_tx, ready_rx) = bounded(1);
        Self {
            slot: Mutex::new(None),
            ready_tx,
            ready_rx,
        }
    }
}

impl<T> FrameSlot<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning `true` if an unconsumed value was dropped.
    pub(crate) fn put(&self, value: T) -> bool {
        let dropped = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(value)
            .is_some();
        // a full channel already carries a pending wake-up
        let _ = self.ready_tx.try_send(());
        dropped
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Take the value only if `predicate` accepts it.
    pub(crate) fn take_if(&self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map_or(false, predicate) {
            slot.take()
        } else {
            None
        }
    }

    /// Signals that a value may be waiting; usable in `crossbeam::select!`.
    /// A signal can be stale, so `take` may still return `None`.
    pub(crate) fn ready(&self) -> &Receiver<()> {
        &self.ready_rx
    }
}
