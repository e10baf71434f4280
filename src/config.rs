use crate::error::Error;

const DEFAULT_DETECTION_CONFIDENCE: &str = "0.1";
const DEFAULT_CALIBRATION_CONFIDENCE: &str = "0.1";
const DEFAULT_COUNTDOWN_CONFIDENCE: &str = "0.1";
const DEFAULT_QUALITY_WINDOW: &str = "10";
const DEFAULT_PARTIAL_MIN_KEYPOINTS: &str = "5";
const DEFAULT_GOOD_MIN_KEYPOINTS: &str = "10";
const DEFAULT_ANGLE_WINDOW: &str = "5";
const DEFAULT_CALIBRATION_MIN_KEYPOINTS: &str = "5";
const DEFAULT_DWELL_TARGET_SECS: &str = "2";
const DEFAULT_OVERRIDE_GRACE_SECS: &str = "3";
const DEFAULT_COUNTDOWN_MIN_KEYPOINTS: &str = "8";
const DEFAULT_COUNTDOWN_STEPS: &str = "3";
const DEFAULT_LEVEL_TOLERANCE_DEG: &str = "10";

/// Angle thresholds for one hysteresis rep counter, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Thresholds {
    /// Entering the bottom of a rep: smoothed angle below this.
    pub(crate) down: f32,
    /// Completing a rep: smoothed angle above this.
    pub(crate) up: f32,
}

pub(crate) mod profiles {
    use super::Thresholds;

    pub(crate) const SQUAT: Thresholds = Thresholds {
        down: 120.0,
        up: 150.0,
    };
    pub(crate) const SQUAT_STRICT: Thresholds = Thresholds {
        down: 100.0,
        up: 150.0,
    };
    pub(crate) const PUSHUP: Thresholds = Thresholds {
        down: 100.0,
        up: 140.0,
    };
    pub(crate) const PUSHUP_STRICT: Thresholds = Thresholds {
        down: 90.0,
        up: 160.0,
    };

    /// Maximum shoulder-to-hip vertical offset in pixels that still counts as a plank.
    pub(crate) const PLANK_MAX_OFFSET: f32 = 50.0;
    pub(crate) const PLANK_MAX_OFFSET_STRICT: f32 = 30.0;
}

/// Engine tuning. Every value the engine's behaviour depends on is exposed
/// here; the defaults are the most permissive values that have been validated.
#[derive(Debug, Clone, Copy, structopt::StructOpt)]
pub(crate) struct EngineConfig {
    /// Keypoint confidence required during exercise detection.
    #[structopt(long, default_value = DEFAULT_DETECTION_CONFIDENCE)]
    pub(crate) detection_confidence: f32,

    /// Keypoint confidence required during calibration.
    #[structopt(long, default_value = DEFAULT_CALIBRATION_CONFIDENCE)]
    pub(crate) calibration_confidence: f32,

    /// Keypoint confidence required by the calibration countdown.
    #[structopt(long, default_value = DEFAULT_COUNTDOWN_CONFIDENCE)]
    pub(crate) countdown_confidence: f32,

    /// Number of frames averaged by the detection quality classifier.
    #[structopt(long, default_value = DEFAULT_QUALITY_WINDOW)]
    pub(crate) quality_window: usize,

    /// Averaged visible keypoints needed for partial detection quality.
    #[structopt(long, default_value = DEFAULT_PARTIAL_MIN_KEYPOINTS)]
    pub(crate) partial_min_keypoints: usize,

    /// Averaged visible keypoints needed for good detection quality.
    #[structopt(long, default_value = DEFAULT_GOOD_MIN_KEYPOINTS)]
    pub(crate) good_min_keypoints: usize,

    /// Number of joint angles averaged before the rep state machine sees them.
    #[structopt(long, default_value = DEFAULT_ANGLE_WINDOW)]
    pub(crate) angle_window: usize,

    /// Visible keypoints needed to start aligning.
    #[structopt(long, default_value = DEFAULT_CALIBRATION_MIN_KEYPOINTS)]
    pub(crate) calibration_min_keypoints: usize,

    /// Seconds of continuous alignment needed to finish calibration.
    #[structopt(long, default_value = DEFAULT_DWELL_TARGET_SECS)]
    pub(crate) dwell_target_secs: u32,

    /// Seconds before the manual calibration override becomes available.
    #[structopt(long, default_value = DEFAULT_OVERRIDE_GRACE_SECS)]
    pub(crate) override_grace_secs: u32,

    /// Visible keypoints needed to run the calibration countdown.
    #[structopt(long, default_value = DEFAULT_COUNTDOWN_MIN_KEYPOINTS)]
    pub(crate) countdown_min_keypoints: usize,

    /// Length of the calibration countdown in seconds.
    #[structopt(long, default_value = DEFAULT_COUNTDOWN_STEPS)]
    pub(crate) countdown_steps: u32,

    /// Maximum device tilt, in degrees, that still counts as level.
    #[structopt(long, default_value = DEFAULT_LEVEL_TOLERANCE_DEG)]
    pub(crate) level_tolerance_deg: f32,

    /// Maximum shoulder-to-hip vertical offset in pixels for a plank;
    /// defaults to the active profile's value.
    #[structopt(long)]
    pub(crate) plank_max_offset: Option<f32>,

    /// Use the stricter rep thresholds.
    #[structopt(long)]
    pub(crate) strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE.parse().unwrap(),
            calibration_confidence: DEFAULT_CALIBRATION_CONFIDENCE.parse().unwrap(),
            countdown_confidence: DEFAULT_COUNTDOWN_CONFIDENCE.parse().unwrap(),
            quality_window: DEFAULT_QUALITY_WINDOW.parse().unwrap(),
            partial_min_keypoints: DEFAULT_PARTIAL_MIN_KEYPOINTS.parse().unwrap(),
            good_min_keypoints: DEFAULT_GOOD_MIN_KEYPOINTS.parse().unwrap(),
            angle_window: DEFAULT_ANGLE_WINDOW.parse().unwrap(),
            calibration_min_keypoints: DEFAULT_CALIBRATION_MIN_KEYPOINTS.parse().unwrap(),
            dwell_target_secs: DEFAULT_DWELL_TARGET_SECS.parse().unwrap(),
            override_grace_secs: DEFAULT_OVERRIDE_GRACE_SECS.parse().unwrap(),
            countdown_min_keypoints: DEFAULT_COUNTDOWN_MIN_KEYPOINTS.parse().unwrap(),
            countdown_steps: DEFAULT_COUNTDOWN_STEPS.parse().unwrap(),
            level_tolerance_deg: DEFAULT_LEVEL_TOLERANCE_DEG.parse().unwrap(),
            plank_max_offset: None,
            strict: false,
        }
    }
}

impl EngineConfig {
    pub(crate) fn squat_thresholds(&self) -> Thresholds {
        if self.strict {
            profiles::SQUAT_STRICT
        } else {
            profiles::SQUAT
        }
    }

    pub(crate) fn pushup_thresholds(&self) -> Thresholds {
        if self.strict {
            profiles::PUSHUP_STRICT
        } else {
            profiles::PUSHUP
        }
    }

    pub(crate) fn plank_max_offset(&self) -> f32 {
        if let Some(offset) = self.plank_max_offset {
            offset
        } else if self.strict {
            profiles::PLANK_MAX_OFFSET_STRICT
        } else {
            profiles::PLANK_MAX_OFFSET
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        for &(name, value) in &[
            ("detection", self.detection_confidence),
            ("calibration", self.calibration_confidence),
            ("countdown", self.countdown_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfidenceOutOfRange { name, value });
            }
        }

        for &(name, value) in &[
            ("quality window", self.quality_window),
            ("angle window", self.angle_window),
            ("calibration minimum keypoints", self.calibration_min_keypoints),
            ("countdown minimum keypoints", self.countdown_min_keypoints),
        ] {
            if value == 0 {
                return Err(Error::ZeroSetting(name));
            }
        }

        if self.dwell_target_secs == 0 {
            return Err(Error::ZeroSetting("dwell target"));
        }

        if self.countdown_steps == 0 {
            return Err(Error::ZeroSetting("countdown steps"));
        }

        match self.plank_max_offset {
            Some(offset) if !(offset > 0.0) => {
                return Err(Error::ZeroSetting("plank maximum offset"));
            }
            _ => {}
        }

        if self.partial_min_keypoints >= self.good_min_keypoints {
            return Err(Error::QualityThresholdOrder {
                partial: self.partial_min_keypoints,
                good: self.good_min_keypoints,
            });
        }

        for &(exercise, Thresholds { down, up }) in &[
            ("squat", self.squat_thresholds()),
            ("push-up", self.pushup_thresholds()),
        ] {
            if down >= up {
                return Err(Error::HysteresisOrder { exercise, down, up });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{profiles, EngineConfig};
    use crate::error::Error;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.quality_window, 10);
        assert_eq!(config.angle_window, 5);
        assert_eq!(config.dwell_target_secs, 2);
        assert_eq!(config.squat_thresholds(), profiles::SQUAT);
    }

    #[test]
    fn strict_profile_tightens_thresholds() {
        let config = EngineConfig {
            strict: true,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.squat_thresholds().down, 100.0);
        assert_eq!(config.plank_max_offset(), 30.0);
    }

    #[test]
    fn explicit_plank_offset_wins_over_profile() {
        let config = EngineConfig {
            strict: true,
            plank_max_offset: Some(65.0),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.plank_max_offset(), 65.0);

        let config = EngineConfig {
            plank_max_offset: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let config = EngineConfig {
            detection_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ConfidenceOutOfRange {
                name: "detection",
                ..
            })
        ));
    }

    #[test]
    fn countdown_confidence_is_validated() {
        let config = EngineConfig {
            countdown_confidence: -0.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ConfidenceOutOfRange {
                name: "countdown",
                ..
            })
        ));
    }

    #[test]
    fn rejects_inverted_quality_thresholds() {
        let config = EngineConfig {
            partial_min_keypoints: 10,
            good_min_keypoints: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::QualityThresholdOrder {
                partial: 10,
                good: 5
            })
        ));
    }

    #[test]
    fn rejects_empty_windows() {
        let config = EngineConfig {
            angle_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ZeroSetting("angle window"))
        ));
    }
}
