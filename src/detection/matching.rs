//! Match filtering between template and frame descriptors.
//!
//! The nearest-neighbour search itself is done by the vision backend; this
//! module holds the acceptance policy applied to its output.

use anyhow::{Context, Result};
use nalgebra::Point2;

use crate::vision::{DescriptorMatch, FeatureSet};

/// Number of neighbours requested per template descriptor.
pub const KNN_K: usize = 2;

/// Lowe's ratio test: the best neighbour must be clearly closer than the second.
///
/// Strict inequality, so `best == ratio * second` is rejected.
pub fn passes_ratio_test(best: f32, second: f32, ratio: f32) -> bool {
    best < ratio * second
}

/// Keep the best neighbour of every k-NN row that passes the ratio test.
///
/// Rows with fewer than two neighbours cannot be judged and are dropped.
pub fn filter_ambiguous(knn: &[Vec<DescriptorMatch>], ratio: f32) -> Vec<DescriptorMatch> {
    knn.iter()
        .filter_map(|row| match row.as_slice() {
            [best, second, ..] if passes_ratio_test(best.distance, second.distance, ratio) => {
                Some(*best)
            }
            _ => None,
        })
        .collect()
}

/// A homography is only worth fitting with strictly more than `min_match_count` matches.
pub fn should_fit_homography(n_accepted: usize, min_match_count: usize) -> bool {
    n_accepted > min_match_count
}

/// Source (template) and destination (frame) positions of accepted matches.
pub fn correspondence_points<F: FeatureSet>(
    template: &F,
    frame: &F,
    matches: &[DescriptorMatch],
) -> Result<(Vec<Point2<f32>>, Vec<Point2<f32>>)> {
    let mut src = Vec::with_capacity(matches.len());
    let mut dst = Vec::with_capacity(matches.len());
    for m in matches {
        src.push(
            template
                .point(m.query_idx)
                .with_context(|| format!("No template keypoint at index {}", m.query_idx))?,
        );
        dst.push(
            frame
                .point(m.train_idx)
                .with_context(|| format!("No frame keypoint at index {}", m.train_idx))?,
        );
    }
    Ok((src, dst))
}
