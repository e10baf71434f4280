//! Pre-exercise calibration.
//!
//! Two independent paths complete calibration and whichever finishes first
//! wins: a dwell path (enough keypoints visible for `dwell_target`
//! consecutive seconds) and a countdown path (a higher keypoint bar held
//! through a short countdown). Both only move forward. After a grace period
//! the user may also force completion, so detection failure is never a dead
//! end.

use crate::config::EngineConfig;
use std::fmt;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum AlignmentState {
    NotAligned,
    Aligning,
    Aligned,
}

impl fmt::Display for AlignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotAligned => "not aligned",
            Self::Aligning => "aligning",
            Self::Aligned => "aligned",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CalibrationPath {
    Dwell,
    Countdown,
    Manual,
}

impl fmt::Display for CalibrationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dwell => "dwell",
            Self::Countdown => "countdown",
            Self::Manual => "manual override",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum AlignmentEvent {
    StateChanged {
        from: AlignmentState,
        to: AlignmentState,
    },
    CountdownStarted {
        remaining: u32,
    },
    CountdownStep {
        remaining: u32,
    },
    CountdownCancelled,
    Completed(CalibrationPath),
}

impl fmt::Display for AlignmentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateChanged { from, to } => write!(f, "alignment {} -> {}", from, to),
            Self::CountdownStarted { remaining } => write!(f, "countdown started at {}", remaining),
            Self::CountdownStep { remaining } => write!(f, "countdown {}", remaining),
            Self::CountdownCancelled => f.write_str("countdown cancelled"),
            Self::Completed(path) => write!(f, "calibrated via {}", path),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct AlignmentSnapshot {
    pub(crate) state: AlignmentState,
    /// Seconds continuously aligned so far.
    pub(crate) dwell_secs: u32,
    pub(crate) dwell_target_secs: u32,
    /// Countdown value while the higher keypoint bar holds.
    pub(crate) countdown: Option<u32>,
    pub(crate) override_available: bool,
}

impl AlignmentSnapshot {
    /// Seconds of dwell still required.
    pub(crate) fn dwell_remaining(&self) -> u32 {
        self.dwell_target_secs.saturating_sub(self.dwell_secs)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ForceOutcome {
    Completed,
    AlreadyAligned,
    TooEarly { remaining_secs: u32 },
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct AlignmentConfig {
    pub(crate) min_keypoints: usize,
    pub(crate) dwell_target_secs: u32,
    pub(crate) override_grace_secs: u32,
    pub(crate) countdown_min_keypoints: usize,
    pub(crate) countdown_steps: u32,
}

impl From<&EngineConfig> for AlignmentConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_keypoints: config.calibration_min_keypoints,
            dwell_target_secs: config.dwell_target_secs,
            override_grace_secs: config.override_grace_secs,
            countdown_min_keypoints: config.countdown_min_keypoints,
            countdown_steps: config.countdown_steps,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AlignmentController {
    config: AlignmentConfig,
    state: AlignmentState,
    dwell_secs: u32,
    countdown: Option<u32>,
    elapsed_secs: u32,
    frames_this_second: usize,
    // set once a condition has held since the start of a second
    dwell_credit: bool,
    countdown_credit: bool,
    completed_via: Option<CalibrationPath>,
}

impl AlignmentController {
    pub(crate) fn new(config: AlignmentConfig) -> Self {
        Self {
            config,
            state: AlignmentState::NotAligned,
            dwell_secs: 0,
            countdown: None,
            elapsed_secs: 0,
            frames_this_second: 0,
            dwell_credit: false,
            countdown_credit: false,
            completed_via: None,
        }
    }

    pub(crate) fn completed_via(&self) -> Option<CalibrationPath> {
        self.completed_via
    }

    pub(crate) fn snapshot(&self) -> AlignmentSnapshot {
        AlignmentSnapshot {
            state: self.state,
            dwell_secs: self.dwell_secs,
            dwell_target_secs: self.config.dwell_target_secs,
            countdown: self.countdown,
            override_available: self.override_available(),
        }
    }

    pub(crate) fn required_keypoints(&self) -> usize {
        self.config.min_keypoints
    }

    /// Feed one frame: `visible` is the keypoint count gated at the
    /// calibration threshold, `countdown_visible` the count gated at the
    /// countdown threshold. Low visibility regresses state immediately.
    pub(crate) fn observe(
        &mut self,
        visible: usize,
        countdown_visible: usize,
    ) -> Vec<AlignmentEvent> {
        let mut events = vec![];
        if self.state == AlignmentState::Aligned {
            return events;
        }

        self.frames_this_second += 1;

        if visible >= self.config.min_keypoints {
            if self.state == AlignmentState::NotAligned {
                self.dwell_secs = 0;
                self.dwell_credit = false;
                events.push(self.transition(AlignmentState::Aligning));
            }
        } else if self.state == AlignmentState::Aligning {
            self.dwell_secs = 0;
            self.dwell_credit = false;
            events.push(self.transition(AlignmentState::NotAligned));
        }

        if countdown_visible >= self.config.countdown_min_keypoints {
            if self.countdown.is_none() {
                let remaining = self.config.countdown_steps;
                self.countdown = Some(remaining);
                self.countdown_credit = false;
                events.push(AlignmentEvent::CountdownStarted { remaining });
            }
        } else if self.countdown.take().is_some() {
            self.countdown_credit = false;
            events.push(AlignmentEvent::CountdownCancelled);
        }

        events
    }

    /// Advance one second. Dwell and countdown only progress for a second
    /// that had frames and whose every frame met the bar; the second in
    /// which a condition first holds is not counted. The override grace
    /// period counts regardless.
    pub(crate) fn tick(&mut self) -> Vec<AlignmentEvent> {
        let mut events = vec![];
        if self.state == AlignmentState::Aligned {
            return events;
        }

        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        let had_frames = std::mem::take(&mut self.frames_this_second) > 0;
        if !had_frames {
            return events;
        }

        if self.state == AlignmentState::Aligning && self.dwell_credit {
            self.dwell_secs += 1;
            if self.dwell_secs >= self.config.dwell_target_secs {
                events.extend(self.complete(CalibrationPath::Dwell));
                return events;
            }
        }

        if let (Some(remaining), true) = (self.countdown, self.countdown_credit) {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                events.extend(self.complete(CalibrationPath::Countdown));
                return events;
            }
            self.countdown = Some(remaining);
            events.push(AlignmentEvent::CountdownStep { remaining });
        }

        self.dwell_credit = self.state == AlignmentState::Aligning;
        self.countdown_credit = self.countdown.is_some();
        events
    }

    pub(crate) fn override_available(&self) -> bool {
        self.state != AlignmentState::Aligned
            && self.elapsed_secs >= self.config.override_grace_secs
    }

    /// Manual escape hatch: complete calibration regardless of visibility
    /// once the grace period has passed.
    pub(crate) fn force_complete(&mut self) -> (ForceOutcome, Vec<AlignmentEvent>) {
        if self.state == AlignmentState::Aligned {
            (ForceOutcome::AlreadyAligned, vec![])
        } else if self.override_available() {
            (
                ForceOutcome::Completed,
                self.complete(CalibrationPath::Manual),
            )
        } else {
            (
                ForceOutcome::TooEarly {
                    remaining_secs: self.config.override_grace_secs - self.elapsed_secs,
                },
                vec![],
            )
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    fn transition(&mut self, to: AlignmentState) -> AlignmentEvent {
        let from = std::mem::replace(&mut self.state, to);
        debug!(message = "alignment changed", %from, %to, dwell = self.dwell_secs);
        AlignmentEvent::StateChanged { from, to }
    }

    fn complete(&mut self, path: CalibrationPath) -> Vec<AlignmentEvent> {
        self.countdown = None;
        self.dwell_credit = false;
        self.countdown_credit = false;
        self.completed_via = Some(path);
        vec![
            self.transition(AlignmentState::Aligned),
            AlignmentEvent::Completed(path),
        ]
    }
}
