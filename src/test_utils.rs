//! Headless stand-ins for the camera, the windows and the vision library.
//!
//! Synthetic images carry their keypoints directly, each tagged with a
//! one-byte label that plays the role of a descriptor. Descriptor distance is
//! the absolute label difference, so tests control match quality exactly.
//! Probes are shared through `Rc` so counts survive the session being dropped.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Result, bail};
use nalgebra::{Matrix3, Point2};

use crate::geometry::{ImageSize, Roi};
use crate::io::{Display, FrameSource, KeySource};
use crate::vision::{DescriptorMatch, FeatureSet, Stroke, VisionBackend};

/// Synthetic image: a size plus the labelled keypoints a detector would find.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeImage {
    pub size: ImageSize,
    pub keypoints: Vec<(Point2<f32>, u8)>,
    pub guides: usize,
    pub outlines: Vec<[Point2<f64>; 4]>,
    pub match_lines: usize,
}

impl FakeImage {
    /// Uniform image with nothing to detect.
    pub fn solid(width: u32, height: u32) -> Self {
        Self::textured(width, height, &[])
    }

    pub fn textured(width: u32, height: u32, keypoints: &[(f32, f32, u8)]) -> Self {
        Self {
            size: ImageSize::new(width, height),
            keypoints: keypoints
                .iter()
                .map(|&(x, y, label)| (Point2::new(x, y), label))
                .collect(),
            guides: 0,
            outlines: Vec::new(),
            match_lines: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FakeFeatures {
    pub points: Vec<Point2<f32>>,
    pub labels: Vec<u8>,
}

impl FakeFeatures {
    /// Features labelled by their index.
    pub fn from_points(points: &[(f32, f32)]) -> Self {
        Self {
            points: points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            labels: (0..points.len()).map(|i| i as u8).collect(),
        }
    }
}

impl FeatureSet for FakeFeatures {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn point(&self, idx: usize) -> Option<Point2<f32>> {
        self.points.get(idx).copied()
    }
}

#[derive(Debug, Default)]
pub(crate) struct VisionProbe {
    pub extractions: Cell<usize>,
    /// ROI and stroke of every guide rectangle drawn.
    pub guides: RefCell<Vec<(Roi, Stroke)>>,
    pub knn_calls: Cell<usize>,
    pub homography_fits: Cell<usize>,
}

/// Label-distance matcher with a translation-only homography estimator.
#[derive(Default)]
pub(crate) struct FakeVision {
    probe: Rc<VisionProbe>,
}

impl FakeVision {
    pub fn probe(&self) -> Rc<VisionProbe> {
        Rc::clone(&self.probe)
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl VisionBackend for FakeVision {
    type Image = FakeImage;
    type Features = FakeFeatures;

    fn detect_and_compute(&mut self, image: &FakeImage) -> Result<FakeFeatures> {
        bump(&self.probe.extractions);
        Ok(FakeFeatures {
            points: image.keypoints.iter().map(|(p, _)| *p).collect(),
            labels: image.keypoints.iter().map(|(_, l)| *l).collect(),
        })
    }

    fn knn_match(
        &mut self,
        query: &FakeFeatures,
        train: &FakeFeatures,
        k: usize,
    ) -> Result<Vec<Vec<DescriptorMatch>>> {
        bump(&self.probe.knn_calls);
        if query.is_empty() || train.is_empty() {
            return Ok(Vec::new());
        }
        let rows = query
            .labels
            .iter()
            .enumerate()
            .map(|(qi, &ql)| {
                let mut row: Vec<DescriptorMatch> = train
                    .labels
                    .iter()
                    .enumerate()
                    .map(|(ti, &tl)| DescriptorMatch::new(qi, ti, ql.abs_diff(tl) as f32))
                    .collect();
                row.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                row.truncate(k);
                row
            })
            .collect();
        Ok(rows)
    }

    fn find_homography(
        &mut self,
        src: &[Point2<f32>],
        dst: &[Point2<f32>],
        _reproj_threshold: f64,
    ) -> Result<Option<Matrix3<f64>>> {
        bump(&self.probe.homography_fits);
        if src.len() < 4 || src.len() != dst.len() {
            return Ok(None);
        }
        let n = src.len() as f64;
        let (dx, dy) = src.iter().zip(dst).fold((0.0, 0.0), |(ax, ay), (s, d)| {
            (ax + f64::from(d.x - s.x), ay + f64::from(d.y - s.y))
        });
        let mut h = Matrix3::identity();
        h[(0, 2)] = dx / n;
        h[(1, 2)] = dy / n;
        Ok(Some(h))
    }

    fn image_size(&self, image: &FakeImage) -> ImageSize {
        image.size
    }

    fn crop(&self, image: &FakeImage, roi: Roi) -> Result<FakeImage> {
        if !roi.fits_within(image.size) {
            bail!("crop {} outside {}", roi, image.size);
        }
        let (x0, y0) = (roi.x as f32, roi.y as f32);
        let (x1, y1) = (x0 + roi.width as f32, y0 + roi.height as f32);
        let keypoints = image
            .keypoints
            .iter()
            .filter(|(p, _)| p.x >= x0 && p.x < x1 && p.y >= y0 && p.y < y1)
            .map(|(p, l)| (Point2::new(p.x - x0, p.y - y0), *l))
            .collect();
        Ok(FakeImage {
            size: roi.size(),
            keypoints,
            guides: 0,
            outlines: Vec::new(),
            match_lines: 0,
        })
    }

    fn draw_guide(&self, image: &mut FakeImage, roi: Roi, stroke: Stroke) -> Result<()> {
        self.probe.guides.borrow_mut().push((roi, stroke));
        image.guides += 1;
        Ok(())
    }

    fn draw_outline(
        &self,
        image: &mut FakeImage,
        corners: &[Point2<f64>; 4],
        _stroke: Stroke,
    ) -> Result<()> {
        image.outlines.push(*corners);
        Ok(())
    }

    fn draw_matches(
        &self,
        template: &FakeImage,
        _template_features: &FakeFeatures,
        frame: &FakeImage,
        _frame_features: &FakeFeatures,
        matches: &[DescriptorMatch],
    ) -> Result<FakeImage> {
        Ok(FakeImage {
            size: ImageSize::new(
                template.size.width + frame.size.width,
                template.size.height.max(frame.size.height),
            ),
            keypoints: Vec::new(),
            guides: frame.guides,
            outlines: frame.outlines.clone(),
            match_lines: matches.len(),
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct CameraProbe {
    pub reads: Cell<usize>,
    pub releases: Cell<usize>,
}

/// Camera that plays back a fixed list of frames, then reports end of stream.
pub(crate) struct FakeCamera {
    frames: VecDeque<FakeImage>,
    open: bool,
    probe: Rc<CameraProbe>,
}

impl FakeCamera {
    pub fn new(frames: impl IntoIterator<Item = FakeImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            open: true,
            probe: Rc::default(),
        }
    }

    pub fn probe(&self) -> Rc<CameraProbe> {
        Rc::clone(&self.probe)
    }

    /// Append frames for a later loop.
    pub fn queue(&mut self, frames: impl IntoIterator<Item = FakeImage>) {
        self.frames.extend(frames);
    }
}

impl FrameSource for FakeCamera {
    type Frame = FakeImage;

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self) -> Result<Option<FakeImage>> {
        bump(&self.probe.reads);
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            bump(&self.probe.releases);
        }
        Ok(())
    }
}

/// What a window was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Shown {
    pub title: String,
    pub size: ImageSize,
    pub guides: usize,
    pub outlines: usize,
    pub match_lines: usize,
}

#[derive(Debug, Default)]
pub(crate) struct UiProbe {
    pub shown: RefCell<Vec<Shown>>,
    pub polls: Cell<usize>,
    pub destroyed: Cell<usize>,
}

/// Windows that record what they show and a keyboard that replays a script.
///
/// Once the script runs out every poll times out with no key.
pub(crate) struct ScriptedUi {
    keys: VecDeque<Option<u8>>,
    probe: Rc<UiProbe>,
}

impl ScriptedUi {
    pub fn new(keys: impl IntoIterator<Item = Option<u8>>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            probe: Rc::default(),
        }
    }

    /// Press `key` on poll number `n` (zero-based); all earlier polls time out.
    pub fn key_on_poll(key: u8, n: usize) -> Self {
        Self::new(std::iter::repeat_n(None, n).chain(Some(Some(key))))
    }

    pub fn probe(&self) -> Rc<UiProbe> {
        Rc::clone(&self.probe)
    }

    pub fn push_keys(&mut self, keys: impl IntoIterator<Item = Option<u8>>) {
        self.keys.extend(keys);
    }
}

impl Display<FakeImage> for ScriptedUi {
    fn show(&mut self, title: &str, image: &FakeImage) -> Result<()> {
        self.probe.shown.borrow_mut().push(Shown {
            title: title.to_string(),
            size: image.size,
            guides: image.guides,
            outlines: image.outlines.len(),
            match_lines: image.match_lines,
        });
        Ok(())
    }

    fn destroy_all(&mut self) -> Result<()> {
        bump(&self.probe.destroyed);
        Ok(())
    }
}

impl KeySource for ScriptedUi {
    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<u8>> {
        bump(&self.probe.polls);
        Ok(self.keys.pop_front().flatten())
    }
}
