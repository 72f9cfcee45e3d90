//! Delegated computer-vision capability.
//!
//! Everything numerically hard (keypoint extraction, descriptor matching,
//! robust homography fitting, drawing) sits behind [`VisionBackend`]. The
//! detection session only sequences these calls, so it can run against the
//! OpenCV backend or a headless fake.

#[cfg(feature = "opencv")]
pub mod opencv_backend;

use anyhow::Result;
use nalgebra::{Matrix3, Point2};

use crate::geometry::{ImageSize, Roi};

/// Keypoint extraction algorithm used by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureAlgorithm {
    /// Accelerated KAZE with binary (MLDB) descriptors.
    #[default]
    Akaze,
    /// Oriented FAST + rotated BRIEF.
    Orb,
}

/// RGB colour for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Line style for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub color: Color,
    pub thickness: i32,
}

impl Stroke {
    pub const fn new(color: Color, thickness: i32) -> Self {
        Self { color, thickness }
    }
}

/// One nearest-neighbour correspondence between two descriptor sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatch {
    /// Index into the query (template) keypoints.
    pub query_idx: usize,
    /// Index into the train (frame) keypoints.
    pub train_idx: usize,
    /// Descriptor distance; smaller is more similar.
    pub distance: f32,
}

impl DescriptorMatch {
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }
}

/// Keypoints and their descriptors extracted from one image.
pub trait FeatureSet {
    /// Number of keypoints (and descriptor rows).
    fn len(&self) -> usize;

    /// Pixel position of keypoint `idx`.
    fn point(&self, idx: usize) -> Option<Point2<f32>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computer-vision operations the detector delegates to a library.
pub trait VisionBackend {
    type Image;
    type Features: FeatureSet;

    /// Detect keypoints and compute one descriptor per keypoint.
    fn detect_and_compute(&mut self, image: &Self::Image) -> Result<Self::Features>;

    /// For every query descriptor, the `k` closest train descriptors, best first.
    ///
    /// Rows may hold fewer than `k` entries when the train set is small. An
    /// empty query or train set yields no rows.
    fn knn_match(
        &mut self,
        query: &Self::Features,
        train: &Self::Features,
        k: usize,
    ) -> Result<Vec<Vec<DescriptorMatch>>>;

    /// Robustly fit `dst ~ H * src`. `Ok(None)` means no model was found.
    fn find_homography(
        &mut self,
        src: &[Point2<f32>],
        dst: &[Point2<f32>],
        reproj_threshold: f64,
    ) -> Result<Option<Matrix3<f64>>>;

    fn image_size(&self, image: &Self::Image) -> ImageSize;

    /// Copy the pixels inside `roi` into a new image.
    fn crop(&self, image: &Self::Image, roi: Roi) -> Result<Self::Image>;

    /// Draw the registration guide around `roi`, outside its pixels.
    fn draw_guide(&self, image: &mut Self::Image, roi: Roi, stroke: Stroke) -> Result<()>;

    /// Draw a closed polygon through `corners`.
    fn draw_outline(
        &self,
        image: &mut Self::Image,
        corners: &[Point2<f64>; 4],
        stroke: Stroke,
    ) -> Result<()>;

    /// Side-by-side template | frame image with a line per accepted match.
    fn draw_matches(
        &self,
        template: &Self::Image,
        template_features: &Self::Features,
        frame: &Self::Image,
        frame_features: &Self::Features,
        matches: &[DescriptorMatch],
    ) -> Result<Self::Image>;
}
