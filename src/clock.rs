use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Elapsed-seconds accumulator gated on an `active` flag.
///
/// Ticks arrive on their own one-second cadence, possibly from another
/// thread. Stopping only clears the flag; a tick that observes the cleared
/// flag accrues nothing.
#[derive(Debug, Default)]
pub(crate) struct SessionClock {
    active: AtomicBool,
    seconds: AtomicU64,
}

impl SessionClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Accrue one second if active, returning the new total.
    pub(crate) fn tick(&self) -> Option<u64> {
        if self.is_active() {
            Some(self.seconds.fetch_add(1, Ordering::SeqCst) + 1)
        } else {
            None
        }
    }

    pub(crate) fn elapsed(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    /// Stop and zero the clock for a new session.
    pub(crate) fn reset(&self) {
        self.stop();
        self.seconds.store(0, Ordering::SeqCst);
    }
}

/// Render seconds as `MM:SS`; minutes grow past two digits rather than wrap.
pub(crate) fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
