//! Geometry utilities: crop rectangles and homography point mapping.

pub mod homography;
pub mod roi;

pub use homography::{image_corners, perspective_transform, project_corners};
pub use roi::{ImageSize, PixelPoint, Roi};
