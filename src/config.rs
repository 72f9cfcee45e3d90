//! Detector configuration.
//!
//! Behaviour is fixed at construction; the defaults are the values the live
//! demo runs with.

use std::time::Duration;

use crate::geometry::Roi;
use crate::io::CaptureSettings;
use crate::vision::{Color, FeatureAlgorithm, Stroke};

/// Window shown while waiting for the operator to frame the target.
pub const REGISTER_WINDOW: &str = "Registration (press 'r' to register)";
/// Window showing the live template/frame matches.
pub const DETECT_WINDOW: &str = "Detection (press 'q' to quit)";

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Crop taken from the registration frame as the template.
    pub roi: Roi,

    /// Lowe ratio: accept a match only if `best < ratio * second_best`.
    pub ratio: f32,

    /// A homography is fitted only when strictly more matches than this survive.
    pub min_match_count: usize,

    /// RANSAC inlier threshold (pixels) for the homography fit.
    pub ransac_reproj_threshold: f64,

    /// Guide rectangle drawn around the ROI during registration.
    pub guide: Stroke,

    /// Outline of the detected template in the frame.
    pub outline: Stroke,

    pub register_key: u8,
    pub quit_key: u8,

    /// Bounded wait for the key poll in each loop iteration.
    pub key_wait: Duration,

    pub register_window: String,
    pub detect_window: String,

    pub feature_algorithm: FeatureAlgorithm,
    pub capture: CaptureSettings,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            roi: Roi::new(220, 100, 200, 200),
            ratio: 0.6,
            min_match_count: 5,
            ransac_reproj_threshold: 5.0,
            guide: Stroke::new(Color::GREEN, 3),
            outline: Stroke::new(Color::GREEN, 2),
            register_key: b'r',
            quit_key: b'q',
            key_wait: Duration::from_millis(1),
            register_window: REGISTER_WINDOW.to_string(),
            detect_window: DETECT_WINDOW.to_string(),
            feature_algorithm: FeatureAlgorithm::Akaze,
            capture: CaptureSettings::default(),
        }
    }
}
