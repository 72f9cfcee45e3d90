//! Detection results and diagnostics structures.
//!
//! These types describe what happened while processing a single frame:
//! - how many keypoints were found and how many matches survived
//! - the fitted homography and the projected template outline, if any
//! - timing information for profiling

use nalgebra::{Matrix3, Point2};

/// Summary of detection for a single frame.
#[derive(Debug, Clone)]
pub struct FrameDetection {
    /// Zero-based index of the frame within the detection run.
    pub frame_index: usize,
    pub n_keypoints: usize,
    /// Number of k-NN rows returned by the matcher (one per template descriptor).
    pub n_candidates: usize,
    /// Matches that passed the ratio test.
    pub n_accepted: usize,
    /// Template-to-frame transform, present only when the fit succeeded.
    pub homography: Option<Matrix3<f64>>,
    /// Template corners mapped into the frame.
    pub corners: Option<[Point2<f64>; 4]>,
    pub timing: TimingStats,
}

impl FrameDetection {
    /// Whether the template outline was located in this frame.
    pub fn is_located(&self) -> bool {
        self.corners.is_some()
    }
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    pub total_ms: f64,
    pub extract_ms: f64,
    pub match_ms: f64,
    pub homography_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Aggregate over one run of the detection loop.
#[derive(Debug, Clone, Default)]
pub struct DetectionSummary {
    pub frames: usize,
    /// Frames in which the outline was drawn.
    pub frames_located: usize,
    pub last: Option<FrameDetection>,
}

impl DetectionSummary {
    pub(crate) fn record(&mut self, frame: FrameDetection) {
        self.frames += 1;
        if frame.is_located() {
            self.frames_located += 1;
        }
        self.last = Some(frame);
    }
}

/// What a call to detect did.
#[derive(Debug, Clone)]
pub enum DetectOutcome {
    /// No template yet; nothing was captured.
    NotRegistered,
    /// The loop ran until the quit key or the end of the stream.
    Completed(DetectionSummary),
}

impl DetectOutcome {
    pub fn summary(&self) -> Option<&DetectionSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::NotRegistered => None,
        }
    }
}
