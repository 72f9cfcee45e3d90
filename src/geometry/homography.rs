//! Mapping template corners through a fitted homography.
//!
//! The fit itself is done by the vision backend; this module only applies
//! the resulting 3x3 matrix to points, the same way a perspective transform
//! does (homogeneous multiply, then divide by the third coordinate).

use nalgebra::{Matrix3, Point2, Vector3};

use super::roi::ImageSize;

/// Homogeneous weights with magnitude below this are treated as points at infinity.
const MIN_HOMOGENEOUS_WEIGHT: f64 = 1e-12;

/// Apply `h` to a single 2D point.
///
/// Returns `None` when the point maps to infinity or the result is not finite.
pub fn perspective_transform(h: &Matrix3<f64>, p: &Point2<f64>) -> Option<Point2<f64>> {
    let q = h * Vector3::new(p.x, p.y, 1.0);
    if q.z.abs() < MIN_HOMOGENEOUS_WEIGHT {
        return None;
    }
    let mapped = Point2::new(q.x / q.z, q.y / q.z);
    (mapped.x.is_finite() && mapped.y.is_finite()).then_some(mapped)
}

/// Corners of an image in outline order: top-left, bottom-left,
/// bottom-right, top-right.
pub fn image_corners(size: ImageSize) -> [Point2<f64>; 4] {
    let w = f64::from(size.width.saturating_sub(1));
    let h = f64::from(size.height.saturating_sub(1));
    [
        Point2::new(0.0, 0.0),
        Point2::new(0.0, h),
        Point2::new(w, h),
        Point2::new(w, 0.0),
    ]
}

/// Project the corners of a template of `size` into the frame.
///
/// Returns `None` if any corner degenerates, in which case no outline can be drawn.
pub fn project_corners(h: &Matrix3<f64>, size: ImageSize) -> Option<[Point2<f64>; 4]> {
    let corners = image_corners(size);
    let mut projected = [Point2::origin(); 4];
    for (dst, src) in projected.iter_mut().zip(corners.iter()) {
        *dst = perspective_transform(h, src)?;
    }
    Some(projected)
}
