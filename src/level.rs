use tracing::debug;

/// Tracks whether the device lies flat enough to start a session.
///
/// Readings are front-to-back (`beta`) and left-to-right (`gamma`) tilt in
/// degrees. Only changes are reported.
#[derive(Debug, Clone)]
pub(crate) struct DeviceLevel {
    tolerance_deg: f32,
    level: Option<bool>,
    /// Set by the user skipping the check; readings are ignored afterwards.
    skipped: bool,
}

impl DeviceLevel {
    pub(crate) fn new(tolerance_deg: f32) -> Self {
        Self {
            tolerance_deg,
            level: None,
            skipped: false,
        }
    }

    /// Returns the new levelness when it differs from the previous reading.
    pub(crate) fn observe(&mut self, beta: f32, gamma: f32) -> Option<bool> {
        if self.skipped {
            return None;
        }
        let level = beta.abs() < self.tolerance_deg && gamma.abs() < self.tolerance_deg;
        if self.level == Some(level) {
            return None;
        }
        debug!(message = "device level changed", level, beta, gamma);
        self.level = Some(level);
        Some(level)
    }

    /// Treat the device as level from now on. Returns `Some(true)` if that
    /// changes the reported levelness.
    pub(crate) fn skip(&mut self) -> Option<bool> {
        self.skipped = true;
        if self.level == Some(true) {
            return None;
        }
        debug!(message = "device level check skipped");
        self.level = Some(true);
        Some(true)
    }

    pub(crate) fn is_level(&self) -> Option<bool> {
        self.level
    }
}
