//! Vision backend using OpenCV.
//!
//! AKAZE or ORB keypoints, brute-force Hamming k-NN matching, RANSAC
//! homography from calib3d, and imgproc/features2d drawing.

use anyhow::{Context, Result};
use nalgebra::{Matrix3, Point2};
use opencv::calib3d;
use opencv::core::{self, DMatch, KeyPoint, Mat, Point, Point2f, Ptr, Rect, Scalar, Vector};
use opencv::features2d::{self, AKAZE, BFMatcher, DrawMatchesFlags, ORB};
use opencv::imgproc;
use opencv::prelude::*;

use super::{Color, DescriptorMatch, FeatureAlgorithm, FeatureSet, Stroke, VisionBackend};
use crate::geometry::{ImageSize, Roi};

/// Keypoints and descriptors as returned by OpenCV.
#[derive(Clone)]
pub struct CvFeatures {
    pub keypoints: Vector<KeyPoint>,
    pub descriptors: Mat,
}

impl FeatureSet for CvFeatures {
    fn len(&self) -> usize {
        self.keypoints.len()
    }

    fn point(&self, idx: usize) -> Option<Point2<f32>> {
        self.keypoints.get(idx).ok().map(|kp| {
            let pt = kp.pt();
            Point2::new(pt.x, pt.y)
        })
    }
}

enum Extractor {
    Akaze(Ptr<AKAZE>),
    Orb(Ptr<ORB>),
}

pub struct OpenCvVision {
    extractor: Extractor,
    matcher: BFMatcher,
}

impl OpenCvVision {
    /// Matches with Hamming distance, not the L2 norm a default `BFMatcher` uses.
    pub fn new(algorithm: FeatureAlgorithm) -> Result<Self> {
        let extractor = match algorithm {
            FeatureAlgorithm::Akaze => Extractor::Akaze(AKAZE::create_def()?),
            FeatureAlgorithm::Orb => Extractor::Orb(ORB::create(
                500,
                1.2,
                8,
                31,
                0,
                2,
                features2d::ORB_ScoreType::HARRIS_SCORE,
                31,
                20,
            )?),
        };
        // Both extractors produce binary descriptors. No cross-check, since the
        // ratio test needs two neighbours per query.
        let matcher = BFMatcher::new(core::NORM_HAMMING, false)?;
        Ok(Self { extractor, matcher })
    }
}

impl VisionBackend for OpenCvVision {
    type Image = Mat;
    type Features = CvFeatures;

    fn detect_and_compute(&mut self, image: &Mat) -> Result<CvFeatures> {
        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        let mask = Mat::default();
        match &mut self.extractor {
            Extractor::Akaze(akaze) => {
                akaze.detect_and_compute(image, &mask, &mut keypoints, &mut descriptors, false)?
            }
            Extractor::Orb(orb) => {
                orb.detect_and_compute(image, &mask, &mut keypoints, &mut descriptors, false)?
            }
        }
        Ok(CvFeatures {
            keypoints,
            descriptors,
        })
    }

    fn knn_match(
        &mut self,
        query: &CvFeatures,
        train: &CvFeatures,
        k: usize,
    ) -> Result<Vec<Vec<DescriptorMatch>>> {
        // BFMatcher rejects an empty train set.
        if query.descriptors.empty() || train.descriptors.empty() {
            return Ok(Vec::new());
        }
        let mut matches = Vector::<Vector<DMatch>>::new();
        self.matcher.knn_train_match(
            &query.descriptors,
            &train.descriptors,
            &mut matches,
            k as i32,
            &Mat::default(),
            false,
        )?;
        Ok(matches
            .iter()
            .map(|row| {
                row.iter()
                    .map(|m| {
                        DescriptorMatch::new(m.query_idx as usize, m.train_idx as usize, m.distance)
                    })
                    .collect()
            })
            .collect())
    }

    fn find_homography(
        &mut self,
        src: &[Point2<f32>],
        dst: &[Point2<f32>],
        reproj_threshold: f64,
    ) -> Result<Option<Matrix3<f64>>> {
        let src_pts: Vector<Point2f> = src.iter().map(|p| Point2f::new(p.x, p.y)).collect();
        let dst_pts: Vector<Point2f> = dst.iter().map(|p| Point2f::new(p.x, p.y)).collect();
        let mut inlier_mask = Mat::default();
        let h = calib3d::find_homography(
            &src_pts,
            &dst_pts,
            &mut inlier_mask,
            calib3d::RANSAC,
            reproj_threshold,
        )?;
        // An empty matrix means RANSAC found no model.
        if h.empty() {
            return Ok(None);
        }
        Ok(Some(mat3_to_matrix3(&h)?))
    }

    fn image_size(&self, image: &Mat) -> ImageSize {
        ImageSize::new(image.cols().max(0) as u32, image.rows().max(0) as u32)
    }

    fn crop(&self, image: &Mat, roi: Roi) -> Result<Mat> {
        let rect = Rect::new(
            roi.x as i32,
            roi.y as i32,
            roi.width as i32,
            roi.height as i32,
        );
        let view = Mat::roi(image, rect).with_context(|| format!("Invalid ROI {}", roi))?;
        Ok(view.try_clone()?)
    }

    fn draw_guide(&self, image: &mut Mat, roi: Roi, stroke: Stroke) -> Result<()> {
        let (tl, br) = roi.guide_corners(stroke.thickness);
        imgproc::rectangle_points(
            image,
            Point::new(tl.x, tl.y),
            Point::new(br.x, br.y),
            to_scalar(stroke.color),
            stroke.thickness,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_outline(
        &self,
        image: &mut Mat,
        corners: &[Point2<f64>; 4],
        stroke: Stroke,
    ) -> Result<()> {
        let polygon: Vector<Point> = corners
            .iter()
            .map(|c| Point::new(c.x as i32, c.y as i32))
            .collect();
        let mut polygons = Vector::<Vector<Point>>::new();
        polygons.push(polygon);
        imgproc::polylines(
            image,
            &polygons,
            true,
            to_scalar(stroke.color),
            stroke.thickness,
            imgproc::LINE_AA,
            0,
        )?;
        Ok(())
    }

    fn draw_matches(
        &self,
        template: &Mat,
        template_features: &CvFeatures,
        frame: &Mat,
        frame_features: &CvFeatures,
        matches: &[DescriptorMatch],
    ) -> Result<Mat> {
        // One match per row, the shape draw_matches_knn expects.
        let mut rows = Vector::<Vector<DMatch>>::new();
        for m in matches {
            let mut row = Vector::<DMatch>::new();
            row.push(DMatch {
                query_idx: m.query_idx as i32,
                train_idx: m.train_idx as i32,
                img_idx: 0,
                distance: m.distance,
            });
            rows.push(row);
        }

        let mut out = Mat::default();
        features2d::draw_matches_knn(
            template,
            &template_features.keypoints,
            frame,
            &frame_features.keypoints,
            &rows,
            &mut out,
            Scalar::all(-1.0),
            Scalar::all(-1.0),
            &Vector::<Vector<i8>>::new(),
            DrawMatchesFlags::NOT_DRAW_SINGLE_POINTS,
        )?;
        Ok(out)
    }
}

/// OpenCV images are BGR.
fn to_scalar(color: Color) -> Scalar {
    Scalar::new(
        f64::from(color.b),
        f64::from(color.g),
        f64::from(color.r),
        0.0,
    )
}

/// Convert OpenCV 3x3 Mat to nalgebra Matrix3.
fn mat3_to_matrix3(mat: &Mat) -> Result<Matrix3<f64>> {
    let mut arr = [0.0f64; 9];
    for (i, value) in arr.iter_mut().enumerate() {
        *value = *mat.at::<f64>(i as i32)?;
    }
    Ok(Matrix3::from_row_slice(&arr))
}
