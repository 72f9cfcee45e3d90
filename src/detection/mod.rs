//! Detection: registers a target template and locates it in live frames.
//!
//! This module implements the detector loop:
//! - Registration (ROI crop + feature extraction)
//! - Descriptor matching with the ratio test
//! - Homography fitting and template outline overlay
//! - Match visualization and key-driven exit

pub mod matching;
pub mod result;
pub mod session;
pub mod state;

pub use result::{DetectOutcome, DetectionSummary, FrameDetection, TimingStats};
pub use session::DetectorSession;
pub use state::{RegistrationState, Template};
