//! Detector session: registers a target once, then locates it in live frames.
//!
//! The session owns the frame source, the window/keyboard surface and the
//! vision backend, and sequences them:
//! - `register` shows a guide rectangle until the register key is pressed,
//!   then stores the cropped ROI and its features as the template
//! - `detect` matches every frame against the template, fits a homography
//!   when enough matches survive the ratio test, and shows the matches
//! - `close` releases the camera and destroys all windows

use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::detection::matching::{
    KNN_K, correspondence_points, filter_ambiguous, should_fit_homography,
};
use crate::detection::result::{DetectOutcome, DetectionSummary, FrameDetection, TimingStats};
use crate::detection::state::{RegistrationState, Template};
use crate::geometry::project_corners;
use crate::io::{Display, FrameSource, KeySource};
use crate::vision::{DescriptorMatch, FeatureSet, VisionBackend};

pub struct DetectorSession<S, U, V>
where
    V: VisionBackend,
    S: FrameSource<Frame = V::Image>,
    U: Display<V::Image> + KeySource,
{
    source: S,
    ui: U,
    vision: V,
    config: DetectorConfig,
    state: RegistrationState<V::Image, V::Features>,
    /// Set once `close` has released the resources.
    closed: bool,
}

impl<S, U, V> DetectorSession<S, U, V>
where
    V: VisionBackend,
    S: FrameSource<Frame = V::Image>,
    U: Display<V::Image> + KeySource,
{
    pub fn new(source: S, ui: U, vision: V, config: DetectorConfig) -> Self {
        Self {
            source,
            ui,
            vision,
            config,
            state: RegistrationState::Unregistered,
            closed: false,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &RegistrationState<V::Image, V::Features> {
        &self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state.is_registered()
    }

    pub fn template(&self) -> Option<&Template<V::Image, V::Features>> {
        self.state.template()
    }

    /// Show the guide rectangle until the register key is pressed, then
    /// capture the ROI as the template.
    ///
    /// Returns without registering if the frame source stops first.
    pub fn register(&mut self) -> Result<()> {
        info!("Hold a target object close to the camera.");
        info!(" (*) Make sure the green rectangle does not contain any background part.");
        info!(
            "Then, press '{}' to register the object.",
            char::from(self.config.register_key)
        );

        let roi = self.config.roi;
        while self.source.is_open() {
            let Some(mut frame) = self.source.read()? else {
                warn!("Frame source ended before a target was registered");
                break;
            };

            let size = self.vision.image_size(&frame);
            if !roi.fits_within(size) {
                bail!("Registration ROI {} does not fit inside a {} frame", roi, size);
            }

            // The guide is drawn outside the ROI, so the crop below stays clean.
            self.vision.draw_guide(&mut frame, roi, self.config.guide)?;
            self.ui.show(&self.config.register_window, &frame)?;

            if self.ui.poll_key(self.config.key_wait)? == Some(self.config.register_key) {
                let image = self
                    .vision
                    .crop(&frame, roi)
                    .with_context(|| format!("Failed to crop ROI {}", roi))?;
                let features = self.vision.detect_and_compute(&image)?;
                let template_size = self.vision.image_size(&image);
                let template = Template::new(image, template_size, features);

                if template.num_keypoints() == 0 {
                    warn!("Registered template has no keypoints; detection cannot match it");
                }
                info!(
                    "Registered {} template with {} keypoints",
                    template.size(),
                    template.num_keypoints()
                );
                self.state = RegistrationState::Registered(template);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Locate the registered template in every frame until the quit key is pressed.
    ///
    /// Without a template this only reports and returns; the camera is not touched.
    pub fn detect(&mut self) -> Result<DetectOutcome> {
        let Self {
            source,
            ui,
            vision,
            config,
            state,
            ..
        } = self;

        let Some(template) = state.template() else {
            warn!("Call 'register()' first.");
            return Ok(DetectOutcome::NotRegistered);
        };

        info!("Start detection...");
        info!("Press '{}' to quit.", char::from(config.quit_key));

        let mut summary = DetectionSummary::default();
        while source.is_open() {
            let Some(mut frame) = source.read()? else {
                warn!("Frame source ended during detection");
                break;
            };

            let (features, good, detection) =
                locate_template(vision, config, template, &mut frame, summary.frames)?;

            let visualization = vision.draw_matches(
                template.image(),
                template.features(),
                &frame,
                &features,
                &good,
            )?;
            ui.show(&config.detect_window, &visualization)?;

            debug!(
                "Frame {}: {} keypoints, {} accepted / {} candidates, located={} ({:.1} ms)",
                detection.frame_index,
                detection.n_keypoints,
                detection.n_accepted,
                detection.n_candidates,
                detection.is_located(),
                detection.timing.total_ms
            );
            summary.record(detection);

            if ui.poll_key(config.key_wait)? == Some(config.quit_key) {
                break;
            }
        }

        info!(
            "Detection finished: {} frames, template located in {}",
            summary.frames, summary.frames_located
        );
        Ok(DetectOutcome::Completed(summary))
    }

    /// Release the frame source and destroy all windows.
    ///
    /// Both steps are attempted even if the first fails. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            debug!("Session already closed");
            return Ok(());
        }
        self.closed = true;

        let released = self.source.release();
        let destroyed = self.ui.destroy_all();
        released.context("Failed to release frame source")?;
        destroyed.context("Failed to destroy windows")?;

        info!("Released frame source and destroyed all windows");
        Ok(())
    }
}

impl<S, U, V> Drop for DetectorSession<S, U, V>
where
    V: VisionBackend,
    S: FrameSource<Frame = V::Image>,
    U: Display<V::Image> + KeySource,
{
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close detector session: {:#}", e);
        }
    }
}

/// Match one frame against the template and draw the outline if it is found.
///
/// Returns the frame features and accepted matches (needed for the match
/// visualization) along with the per-frame record.
fn locate_template<V: VisionBackend>(
    vision: &mut V,
    config: &DetectorConfig,
    template: &Template<V::Image, V::Features>,
    frame: &mut V::Image,
    frame_index: usize,
) -> Result<(V::Features, Vec<DescriptorMatch>, FrameDetection)> {
    let t_start = Instant::now();
    let mut timing = TimingStats::zero();

    let t = Instant::now();
    let features = vision.detect_and_compute(frame)?;
    timing.extract_ms = elapsed_ms(t);

    let t = Instant::now();
    let knn = vision.knn_match(template.features(), &features, KNN_K)?;
    let good = filter_ambiguous(&knn, config.ratio);
    timing.match_ms = elapsed_ms(t);

    let mut homography = None;
    let mut corners = None;
    if should_fit_homography(good.len(), config.min_match_count) {
        let t = Instant::now();
        let (src, dst) = correspondence_points(template.features(), &features, &good)?;
        homography = vision.find_homography(&src, &dst, config.ransac_reproj_threshold)?;
        corners = homography
            .as_ref()
            .and_then(|h| project_corners(h, template.size()));
        if let Some(corners) = &corners {
            vision.draw_outline(frame, corners, config.outline)?;
        }
        timing.homography_ms = elapsed_ms(t);
    }
    timing.total_ms = elapsed_ms(t_start);

    let detection = FrameDetection {
        frame_index,
        n_keypoints: features.len(),
        n_candidates: knn.len(),
        n_accepted: good.len(),
        homography,
        corners,
        timing,
    };
    Ok((features, good, detection))
}

fn elapsed_ms(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1000.0
}
