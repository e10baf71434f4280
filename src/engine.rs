//! The motion-analysis engine: one owned state struct driven by frames and
//! one-second ticks.
//!
//! Nothing in here blocks or fails. Frames flow through the confidence gate
//! into the quality classifier and, depending on the phase, into either the
//! alignment controller or the exercise's rep state machine.

use crate::{
    alignment::{
        AlignmentConfig, AlignmentController, AlignmentEvent, AlignmentSnapshot, AlignmentState,
        CalibrationPath, ForceOutcome,
    },
    clock::SessionClock,
    config::EngineConfig,
    exercise::{Exercise, ExerciseEvent, ExerciseKind, RepState, RepStateMachine},
    gate::GatedFrame,
    level::DeviceLevel,
    pose::PoseFrame,
    quality::{DetectionQuality, QualityClassifier},
    status::Status,
};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument, trace, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Phase {
    Idle,
    Calibrating,
    Exercising,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Calibrating => "calibrating",
            Self::Exercising => "exercising",
            Self::Stopped => "stopped",
        })
    }
}

/// Discrete changes reported to the presentation layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum EngineEvent {
    Alignment(AlignmentEvent),
    BottomReached { angle: f32 },
    RepCounted { count: u32 },
    HoldStarted,
    HoldLost,
    DeviceLevelChanged { level: bool },
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alignment(event) => write!(f, "{}", event),
            Self::BottomReached { angle } => write!(f, "bottom reached at {:.1}°", angle),
            Self::RepCounted { count } => write!(f, "rep {}", count),
            Self::HoldStarted => f.write_str("hold started"),
            Self::HoldLost => f.write_str("hold lost"),
            Self::DeviceLevelChanged { level: true } => f.write_str("device level"),
            Self::DeviceLevelChanged { level: false } => f.write_str("device tilted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FrameReport {
    pub(crate) quality: DetectionQuality,
    /// Keypoints above the detection threshold in this frame.
    pub(crate) visible: usize,
    /// Floored window average behind `quality`.
    pub(crate) average: usize,
    pub(crate) smoothed_angle: Option<f32>,
    pub(crate) alignment: AlignmentSnapshot,
    pub(crate) phase: Phase,
    pub(crate) count: u32,
    pub(crate) rep_state: RepState,
    pub(crate) status: Status,
    pub(crate) events: Vec<EngineEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SecondReport {
    pub(crate) exercise_seconds: u64,
    pub(crate) alignment: AlignmentSnapshot,
    pub(crate) phase: Phase,
    pub(crate) status: Status,
    pub(crate) events: Vec<EngineEvent>,
}

/// Per-exercise state created by `start` and kept readable after `stop`.
#[derive(Debug, Clone)]
struct ExerciseSession {
    kind: ExerciseKind,
    exercise: Exercise,
    /// Only ever increases within a session.
    count: u32,
}

impl ExerciseSession {
    fn new(kind: ExerciseKind, config: &EngineConfig) -> Self {
        let exercise = Exercise::new(&kind, config);
        Self {
            kind,
            exercise,
            count: 0,
        }
    }

    fn apply(&mut self, event: ExerciseEvent) -> EngineEvent {
        match event {
            ExerciseEvent::BottomReached { angle } => EngineEvent::BottomReached { angle },
            ExerciseEvent::RepCompleted => {
                self.count += 1;
                EngineEvent::RepCounted { count: self.count }
            }
            ExerciseEvent::HoldStarted => {
                // the first hold marks the plank as started
                if self.count == 0 {
                    self.count = 1;
                }
                EngineEvent::HoldStarted
            }
            ExerciseEvent::HoldLost => EngineEvent::HoldLost,
        }
    }
}

pub(crate) struct Engine {
    config: EngineConfig,
    phase: Phase,
    quality: QualityClassifier,
    alignment: AlignmentController,
    level: DeviceLevel,
    session: Option<ExerciseSession>,
    clock: Arc<SessionClock>,
    frames_since_tick: usize,
    facing_mode: Option<String>,
    /// The user overrode the detection quality gate for this session.
    detection_forced: bool,
    status: Status,
}

impl Engine {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            phase: Phase::Idle,
            quality: QualityClassifier::new(
                config.quality_window,
                config.partial_min_keypoints,
                config.good_min_keypoints,
            ),
            alignment: AlignmentController::new(AlignmentConfig::from(&config)),
            level: DeviceLevel::new(config.level_tolerance_deg),
            session: None,
            clock: Arc::new(SessionClock::new()),
            frames_since_tick: 0,
            facing_mode: None,
            detection_forced: false,
            status: Status::Idle,
            config,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn status(&self) -> &Status {
        &self.status
    }

    pub(crate) fn exercise(&self) -> Option<&ExerciseKind> {
        self.session.as_ref().map(|session| &session.kind)
    }

    pub(crate) fn count(&self) -> u32 {
        self.session.as_ref().map_or(0, |session| session.count)
    }

    pub(crate) fn exercise_seconds(&self) -> u64 {
        self.clock.elapsed()
    }

    pub(crate) fn rep_state(&self) -> RepState {
        self.session
            .as_ref()
            .map_or(RepState::Unknown, |session| session.exercise.state())
    }

    pub(crate) fn quality(&self) -> DetectionQuality {
        self.quality.current()
    }

    pub(crate) fn alignment(&self) -> AlignmentSnapshot {
        self.alignment.snapshot()
    }

    /// How the current session finished calibrating, once it has.
    pub(crate) fn calibration_path(&self) -> Option<CalibrationPath> {
        self.alignment.completed_via()
    }

    pub(crate) fn facing_mode(&self) -> Option<&str> {
        self.facing_mode.as_deref()
    }

    /// Shared handle to the session clock for readers on other threads.
    pub(crate) fn clock(&self) -> Arc<SessionClock> {
        self.clock.clone()
    }

    /// Begin a brand-new session. Everything from a previous session is
    /// discarded, including the count and the clock.
    #[instrument(name = "Engine::start", skip(self), level = "debug")]
    pub(crate) fn start(&mut self, exercise_id: &str) {
        let kind = ExerciseKind::from_id(exercise_id);
        if let ExerciseKind::Unrecognized(id) = &kind {
            info!(message = "unrecognized exercise, nothing will be counted", %id);
        }

        self.clock.reset();
        self.quality.clear();
        self.alignment.reset();
        self.frames_since_tick = 0;
        self.detection_forced = false;
        self.session = Some(ExerciseSession::new(kind, &self.config));
        self.phase = Phase::Calibrating;
        self.status = self.alignment_status(0);

        info!(message = "session started", exercise = %exercise_id);
    }

    /// End the session. The count and elapsed time stay readable until the
    /// next `start`.
    #[instrument(name = "Engine::stop", skip(self), level = "debug")]
    pub(crate) fn stop(&mut self) {
        if matches!(self.phase, Phase::Idle | Phase::Stopped) {
            return;
        }

        self.clock.stop();
        if let Some(session) = self.session.as_mut() {
            session.exercise.reset();
        }
        self.quality.clear();
        self.detection_forced = false;
        self.phase = Phase::Stopped;
        self.status = Status::Stopped {
            count: self.count(),
            seconds: self.exercise_seconds(),
        };

        info!(
            message = "session stopped",
            count = self.count(),
            seconds = self.exercise_seconds()
        );
    }

    /// Process one frame to completion. `None` means the pose model has not
    /// produced anything for this frame.
    pub(crate) fn process_frame(&mut self, frame: Option<&PoseFrame>) -> FrameReport {
        let mut events = vec![];
        let mut smoothed_angle = None;

        let gated = GatedFrame::new(frame, self.config.detection_confidence);
        let (quality, average) = if self.is_active() {
            self.quality.push(gated.visible_count())
        } else {
            (self.quality.current(), self.quality.average())
        };
        let quality = if self.detection_forced {
            DetectionQuality::Good
        } else {
            quality
        };

        if frame.is_some() {
            self.frames_since_tick += 1;
        }

        match (self.phase, frame) {
            (Phase::Idle, _) | (Phase::Stopped, _) => {}
            (_, None) => self.status = Status::ModelWarmingUp,
            (Phase::Calibrating, Some(frame)) => {
                let visible = GatedFrame::new(Some(frame), self.config.calibration_confidence)
                    .visible_count();
                let countdown_visible =
                    GatedFrame::new(Some(frame), self.config.countdown_confidence).visible_count();
                events.extend(
                    self.alignment
                        .observe(visible, countdown_visible)
                        .into_iter()
                        .map(EngineEvent::Alignment),
                );
                self.status = self.alignment_status(visible);
            }
            (Phase::Exercising, Some(_)) if quality < DetectionQuality::Partial => {
                self.status = Status::Detection { quality, average };
            }
            (Phase::Exercising, Some(_)) => {
                if let Some(session) = self.session.as_mut() {
                    let outcome = session.exercise.update(&gated);
                    trace!(state = %outcome.state);
                    smoothed_angle = outcome.smoothed_angle;
                    self.status = outcome.status;

                    if let Some(event) = outcome.event {
                        let event = session.apply(event);
                        if let EngineEvent::RepCounted { count } = event {
                            info!(message = "rep counted", count);
                            self.status = Status::RepCompleted { count };
                        } else {
                            debug!(%event);
                        }
                        events.push(event);
                    }
                }
            }
        }

        trace!(
            phase = %self.phase,
            visible = gated.visible_count(),
            %quality,
            average,
            status = %self.status
        );

        FrameReport {
            quality,
            visible: gated.visible_count(),
            average,
            smoothed_angle,
            alignment: self.alignment.snapshot(),
            phase: self.phase,
            count: self.count(),
            rep_state: self.rep_state(),
            status: self.status.clone(),
            events,
        }
    }

    /// Advance one second of wall time.
    pub(crate) fn on_second(&mut self) -> SecondReport {
        let had_frames = std::mem::take(&mut self.frames_since_tick) > 0;
        let mut events = vec![];

        match self.phase {
            Phase::Calibrating => {
                let alignment_events = self.alignment.tick();
                let completed = alignment_events.iter().find_map(|event| match event {
                    AlignmentEvent::Completed(path) => Some(*path),
                    _ => None,
                });
                events.extend(alignment_events.into_iter().map(EngineEvent::Alignment));

                if let Some(path) = completed {
                    self.begin_exercise(path);
                } else if let Some(remaining) = self.alignment.snapshot().countdown {
                    self.status = Status::Countdown { remaining };
                } else if !had_frames {
                    self.status = Status::NoFrames;
                }
            }
            Phase::Exercising => {
                if !had_frames {
                    self.status = Status::NoFrames;
                } else if let Some(seconds) = self.clock.tick() {
                    trace!(seconds);
                }
            }
            Phase::Idle | Phase::Stopped => {}
        }

        SecondReport {
            exercise_seconds: self.exercise_seconds(),
            alignment: self.alignment.snapshot(),
            phase: self.phase,
            status: self.status.clone(),
            events,
        }
    }

    /// Manual calibration override. `None` when no session is calibrating
    /// or exercising.
    #[instrument(name = "Engine::force_calibration_complete", skip(self), level = "debug")]
    pub(crate) fn force_calibration_complete(
        &mut self,
    ) -> Option<(ForceOutcome, Vec<EngineEvent>)> {
        match self.phase {
            Phase::Idle | Phase::Stopped => None,
            Phase::Exercising => Some((ForceOutcome::AlreadyAligned, vec![])),
            Phase::Calibrating => {
                let (outcome, events) = self.alignment.force_complete();
                match outcome {
                    ForceOutcome::Completed => self.begin_exercise(CalibrationPath::Manual),
                    ForceOutcome::TooEarly { remaining_secs } => {
                        self.status = Status::OverrideUnavailable { remaining_secs }
                    }
                    ForceOutcome::AlreadyAligned => {}
                }
                Some((
                    outcome,
                    events.into_iter().map(EngineEvent::Alignment).collect(),
                ))
            }
        }
    }

    /// Camera flipped: smoothing windows describe the old view and are
    /// dropped. Count, clock, rep state and alignment carry on.
    #[instrument(name = "Engine::switch_facing_mode", skip(self), level = "debug")]
    pub(crate) fn switch_facing_mode(&mut self, mode: &str) {
        self.quality.clear();
        if let Some(session) = self.session.as_mut() {
            session.exercise.clear_smoothing();
        }
        self.facing_mode = Some(mode.to_owned());
        info!(message = "facing mode switched", %mode);
    }

    /// Let the exercise run regardless of detection quality until the
    /// session ends. Returns `false` when no session is active.
    #[instrument(name = "Engine::force_detection", skip(self), level = "debug")]
    pub(crate) fn force_detection(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.detection_forced = true;
        self.status = Status::DetectionForced;
        info!("detection forced by user");
        true
    }

    /// The user chose to start without levelling the device.
    pub(crate) fn skip_level_check(&mut self) -> Option<EngineEvent> {
        self.level
            .skip()
            .map(|level| EngineEvent::DeviceLevelChanged { level })
    }

    pub(crate) fn observe_orientation(&mut self, beta: f32, gamma: f32) -> Option<EngineEvent> {
        self.level
            .observe(beta, gamma)
            .map(|level| EngineEvent::DeviceLevelChanged { level })
    }

    pub(crate) fn is_level(&self) -> Option<bool> {
        self.level.is_level()
    }

    /// Surface a collaborator failure without touching any counter.
    pub(crate) fn report_upstream_failure(&mut self, message: &str) {
        warn!(message = "upstream failure", reason = %message);
        self.status = Status::UpstreamFailure(message.to_owned());
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Calibrating | Phase::Exercising)
    }

    fn alignment_status(&self, visible: usize) -> Status {
        let snapshot = self.alignment.snapshot();
        match snapshot.countdown {
            Some(remaining) if snapshot.state != AlignmentState::Aligned => {
                Status::Countdown { remaining }
            }
            _ => Status::Alignment {
                state: snapshot.state,
                visible,
                required: self.alignment.required_keypoints(),
            },
        }
    }

    fn begin_exercise(&mut self, path: CalibrationPath) {
        if let Some(session) = self.session.as_mut() {
            session.exercise.reset();
        }
        self.clock.start();
        self.phase = Phase::Exercising;
        self.status = Status::Calibrated(path);
        info!(message = "calibration complete", %path);
    }
}

#[cfg(test)]
mod tests {
    use super::{Engine, EngineEvent, Phase, SecondReport};
    use crate::{
        alignment::{AlignmentEvent, AlignmentState, CalibrationPath, ForceOutcome},
        config::EngineConfig,
        exercise::RepState,
        pose::{test_frames::FrameBuilder, KeypointKind::*, PoseFrame},
        quality::DetectionQuality,
        status::Status,
    };

    const FPS: usize = 30;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    fn second(engine: &mut Engine, frame: &PoseFrame) -> SecondReport {
        for _ in 0..FPS {
            engine.process_frame(Some(frame));
        }
        engine.on_second()
    }

    /// Everything visible, shoulders and hips `offset` pixels apart vertically.
    fn plank_frame(offset: f32) -> PoseFrame {
        FrameBuilder::all_visible(0.9)
            .joint(LeftShoulder, 100.0, 300.0, 0.9)
            .joint(RightShoulder, 100.0, 300.0, 0.8)
            .joint(LeftHip, 300.0, 300.0 + offset, 0.9)
            .joint(RightHip, 300.0, 300.0 + offset, 0.8)
            .build()
    }

    fn squat_frame(knee_angle_deg: f32) -> PoseFrame {
        let knee = (100.0, 200.0);
        let theta = (knee_angle_deg - 90.0).to_radians();
        FrameBuilder::all_visible(0.9)
            .joint(LeftHip, knee.0, knee.1 - 50.0, 0.95)
            .joint(LeftKnee, knee.0, knee.1, 0.95)
            .joint(
                LeftAnkle,
                knee.0 + 50.0 * theta.cos(),
                knee.1 + 50.0 * theta.sin(),
                0.95,
            )
            .build()
    }

    /// Hip, knee and ankle only: too few keypoints for partial quality.
    fn legs_only(knee_angle_deg: f32) -> PoseFrame {
        let frame = squat_frame(knee_angle_deg);
        let mut builder = FrameBuilder::new();
        for &kind in &[LeftHip, LeftKnee, LeftAnkle] {
            let keypoint = frame.get(kind).unwrap();
            builder = builder.joint(kind, keypoint.point.x(), keypoint.point.y(), 0.9);
        }
        builder.build()
    }

    /// Entering alignment takes one second, the dwell target two more.
    fn calibrate(engine: &mut Engine, frame: &PoseFrame) {
        second(engine, frame);
        second(engine, frame);
        let report = second(engine, frame);
        assert_eq!(report.phase, Phase::Exercising);
        assert!(report
            .events
            .contains(&EngineEvent::Alignment(AlignmentEvent::Completed(
                CalibrationPath::Dwell
            ))));
    }

    #[test]
    fn idle_engine_ignores_frames() {
        let mut engine = engine();
        let report = engine.process_frame(Some(&plank_frame(0.0)));
        assert_eq!(report.phase, Phase::Idle);
        assert_eq!(report.status, Status::Idle);
        assert_eq!(engine.on_second().exercise_seconds, 0);
    }

    #[test]
    fn clock_starts_only_after_calibration() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);

        let report = second(&mut engine, &frame);
        assert_eq!(report.phase, Phase::Calibrating);
        assert_eq!(report.alignment.state, AlignmentState::Aligning);
        assert_eq!(report.exercise_seconds, 0);

        let report = second(&mut engine, &frame);
        assert_eq!(report.phase, Phase::Calibrating);
        assert_eq!(report.alignment.dwell_secs, 1);

        let report = second(&mut engine, &frame);
        assert_eq!(report.status, Status::Calibrated(CalibrationPath::Dwell));
        assert_eq!(report.exercise_seconds, 0);
        assert!(engine.clock().is_active());
    }

    #[test]
    fn steady_plank_accrues_time_and_marks_start_once() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);
        calibrate(&mut engine, &frame);

        let mut holds = 0;
        for _ in 0..10 {
            for _ in 0..FPS {
                let report = engine.process_frame(Some(&frame));
                holds += report
                    .events
                    .iter()
                    .filter(|event| **event == EngineEvent::HoldStarted)
                    .count();
            }
            engine.on_second();
        }

        assert_eq!(engine.exercise_seconds(), 10);
        assert_eq!(engine.count(), 1);
        assert_eq!(holds, 1);
        assert_eq!(engine.rep_state(), RepState::Plank);
    }

    #[test]
    fn plank_state_follows_offset_while_clock_runs() {
        let mut engine = engine();
        engine.start("planks");
        calibrate(&mut engine, &plank_frame(20.0));

        let mut states = vec![];
        for &offset in &[20.0, 80.0, 80.0, 20.0] {
            second(&mut engine, &plank_frame(offset));
            states.push(engine.rep_state());
        }

        assert_eq!(
            states,
            vec![
                RepState::Plank,
                RepState::Unknown,
                RepState::Unknown,
                RepState::Plank
            ]
        );
        assert_eq!(engine.exercise_seconds(), 4);
        assert_eq!(engine.count(), 1);
    }

    #[test]
    fn squat_counts_one_rep_through_the_pipeline() {
        let mut engine = engine();
        engine.start("squats");
        calibrate(&mut engine, &squat_frame(170.0));

        let mut counted = vec![];
        let angles = std::iter::repeat(170.0)
            .take(10)
            .chain(std::iter::repeat(80.0).take(10))
            .chain(std::iter::repeat(170.0).take(10));
        for angle in angles {
            let report = engine.process_frame(Some(&squat_frame(angle)));
            counted.extend(report.events.into_iter().filter_map(|event| match event {
                EngineEvent::RepCounted { count } => Some(count),
                _ => None,
            }));
        }

        assert_eq!(counted, vec![1]);
        assert_eq!(engine.count(), 1);
        assert!(matches!(
            engine.status(),
            Status::LimbAngle {
                state: RepState::Up,
                ..
            }
        ));
        assert_eq!(engine.rep_state(), RepState::Up);
    }

    #[test]
    fn unknown_exercise_never_counts() {
        let mut engine = engine();
        engine.start("jumprope");
        calibrate(&mut engine, &squat_frame(170.0));

        for i in 0..300 {
            let angle = if (i / 10) % 2 == 0 { 170.0 } else { 80.0 };
            let report = engine.process_frame(Some(&squat_frame(angle)));
            assert!(report.events.is_empty());
            assert_eq!(report.status, Status::UnrecognizedExercise);
        }
        engine.process_frame(None);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn seconds_without_frames_do_not_accrue() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);
        calibrate(&mut engine, &frame);
        second(&mut engine, &frame);
        assert_eq!(engine.exercise_seconds(), 1);

        for _ in 0..5 {
            let report = engine.on_second();
            assert_eq!(report.status, Status::NoFrames);
        }
        engine.process_frame(None);
        assert_eq!(engine.on_second().exercise_seconds, 1);
        assert_eq!(engine.count(), 1);
    }

    #[test]
    fn absence_of_frames_does_not_regress_alignment() {
        let mut engine = engine();
        engine.start("squats");
        second(&mut engine, &squat_frame(170.0));
        second(&mut engine, &squat_frame(170.0));
        for _ in 0..3 {
            engine.process_frame(None);
            engine.on_second();
        }
        let snapshot = engine.alignment();
        assert_eq!(snapshot.state, AlignmentState::Aligning);
        assert_eq!(snapshot.dwell_secs, 1);
    }

    #[test]
    fn low_visibility_resets_alignment() {
        let mut engine = engine();
        engine.start("squats");
        second(&mut engine, &squat_frame(170.0));
        let report = engine.process_frame(Some(&FrameBuilder::new().visible(2, 0.9).build()));
        assert_eq!(report.alignment.state, AlignmentState::NotAligned);
        assert_eq!(report.alignment.dwell_secs, 0);
        assert!(matches!(
            report.status,
            Status::Alignment {
                state: AlignmentState::NotAligned,
                visible: 2,
                required: 5
            }
        ));
    }

    #[test]
    fn countdown_uses_its_own_confidence() {
        let mut engine = Engine::new(EngineConfig {
            countdown_confidence: 0.5,
            ..EngineConfig::default()
        });
        engine.start("planks");
        let frame = FrameBuilder::all_visible(0.3).build();

        let mut events = vec![];
        for _ in 0..3 {
            let report = second(&mut engine, &frame);
            assert_eq!(report.alignment.countdown, None);
            events.extend(report.events);
        }
        assert!(!events.iter().any(|event| matches!(
            event,
            EngineEvent::Alignment(AlignmentEvent::CountdownStarted { .. })
        )));
        assert_eq!(engine.calibration_path(), Some(CalibrationPath::Dwell));
        assert_eq!(engine.phase(), Phase::Exercising);
    }

    #[test]
    fn forced_detection_lets_the_exercise_run() {
        let mut engine = engine();
        assert!(!engine.force_detection());

        engine.start("squats");
        calibrate(&mut engine, &squat_frame(170.0));
        assert!(engine.force_detection());
        assert_eq!(engine.status(), &Status::DetectionForced);

        engine.switch_facing_mode("environment");

        let angles = std::iter::repeat(170.0)
            .take(10)
            .chain(std::iter::repeat(80.0).take(10))
            .chain(std::iter::repeat(170.0).take(10));
        let mut counted = 0;
        for angle in angles {
            let report = engine.process_frame(Some(&legs_only(angle)));
            assert_eq!(report.quality, DetectionQuality::Good);
            counted += report
                .events
                .iter()
                .filter(|event| matches!(event, EngineEvent::RepCounted { .. }))
                .count();
        }
        assert_eq!(counted, 1);

        // a new session starts with the gate back in place
        engine.start("squats");
        calibrate(&mut engine, &squat_frame(170.0));
        engine.switch_facing_mode("user");
        let report = engine.process_frame(Some(&legs_only(80.0)));
        assert_eq!(report.quality, DetectionQuality::None);
        assert!(matches!(report.status, Status::Detection { .. }));
    }

    #[test]
    fn manual_override_after_grace_period() {
        let mut engine = engine();
        assert!(engine.force_calibration_complete().is_none());

        engine.start("pushups");
        let (outcome, _) = engine.force_calibration_complete().unwrap();
        assert_eq!(outcome, ForceOutcome::TooEarly { remaining_secs: 3 });
        assert_eq!(
            engine.status(),
            &Status::OverrideUnavailable { remaining_secs: 3 }
        );

        for _ in 0..3 {
            engine.on_second();
        }
        assert!(engine.alignment().override_available);
        let (outcome, events) = engine.force_calibration_complete().unwrap();
        assert_eq!(outcome, ForceOutcome::Completed);
        assert!(events.contains(&EngineEvent::Alignment(AlignmentEvent::Completed(
            CalibrationPath::Manual
        ))));
        assert_eq!(engine.phase(), Phase::Exercising);
        assert_eq!(engine.rep_state(), RepState::Unknown);
        assert_eq!(engine.calibration_path(), Some(CalibrationPath::Manual));

        let (outcome, _) = engine.force_calibration_complete().unwrap();
        assert_eq!(outcome, ForceOutcome::AlreadyAligned);
    }

    #[test]
    fn poor_quality_skips_the_exercise() {
        let mut engine = engine();
        engine.start("squats");
        calibrate(&mut engine, &squat_frame(170.0));
        engine.switch_facing_mode("environment");

        for &angle in &[80.0, 80.0, 80.0, 170.0, 170.0, 170.0] {
            let report = engine.process_frame(Some(&legs_only(angle)));
            assert_eq!(report.quality, DetectionQuality::None);
            assert!(report.events.is_empty());
            assert!(matches!(report.status, Status::Detection { .. }));
        }
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn facing_switch_keeps_count_and_clock() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);
        calibrate(&mut engine, &frame);
        second(&mut engine, &frame);
        second(&mut engine, &frame);

        engine.switch_facing_mode("user");
        assert_eq!(engine.facing_mode(), Some("user"));
        assert_eq!(engine.quality(), DetectionQuality::None);
        assert_eq!(engine.count(), 1);
        assert_eq!(engine.exercise_seconds(), 2);
        assert_eq!(engine.phase(), Phase::Exercising);
        assert_eq!(engine.rep_state(), RepState::Plank);

        second(&mut engine, &frame);
        assert_eq!(engine.exercise_seconds(), 3);
    }

    #[test]
    fn stop_keeps_results_until_next_start() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);
        calibrate(&mut engine, &frame);
        for _ in 0..3 {
            second(&mut engine, &frame);
        }

        engine.stop();
        assert_eq!(
            engine.status(),
            &Status::Stopped {
                count: 1,
                seconds: 3
            }
        );
        second(&mut engine, &frame);
        assert_eq!(engine.exercise_seconds(), 3);
        assert_eq!(engine.count(), 1);
        assert_eq!(engine.rep_state(), RepState::Unknown);

        engine.start("planks");
        assert_eq!(engine.count(), 0);
        assert_eq!(engine.exercise_seconds(), 0);
        assert_eq!(engine.phase(), Phase::Calibrating);
        assert_eq!(engine.alignment().state, AlignmentState::NotAligned);
    }

    #[test]
    fn upstream_failure_touches_no_counters() {
        let mut engine = engine();
        engine.start("planks");
        let frame = plank_frame(20.0);
        calibrate(&mut engine, &frame);
        second(&mut engine, &frame);

        engine.report_upstream_failure("camera disconnected");
        assert_eq!(
            engine.status(),
            &Status::UpstreamFailure("camera disconnected".to_owned())
        );
        assert_eq!(engine.count(), 1);
        assert_eq!(engine.exercise_seconds(), 1);
        assert_eq!(engine.phase(), Phase::Exercising);
    }

    #[test]
    fn events_render_for_logs() {
        assert_eq!(
            EngineEvent::Alignment(AlignmentEvent::Completed(CalibrationPath::Manual)).to_string(),
            "calibrated via manual override"
        );
        assert_eq!(EngineEvent::RepCounted { count: 3 }.to_string(), "rep 3");
        assert_eq!(
            EngineEvent::BottomReached { angle: 87.25 }.to_string(),
            "bottom reached at 87.2°"
        );
    }

    #[test]
    fn orientation_changes_are_reported_once() {
        let mut engine = engine();
        assert_eq!(
            engine.observe_orientation(2.0, 3.0),
            Some(EngineEvent::DeviceLevelChanged { level: true })
        );
        assert_eq!(engine.observe_orientation(4.0, 1.0), None);
        assert_eq!(
            engine.observe_orientation(40.0, 1.0),
            Some(EngineEvent::DeviceLevelChanged { level: false })
        );
        assert_eq!(engine.is_level(), Some(false));

        assert_eq!(
            engine.skip_level_check(),
            Some(EngineEvent::DeviceLevelChanged { level: true })
        );
        assert_eq!(engine.observe_orientation(40.0, 1.0), None);
        assert_eq!(engine.is_level(), Some(true));
    }
}
