//! Camera capture through OpenCV `VideoCapture`.

use anyhow::{Result, bail};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use tracing::{info, warn};

use super::{CaptureSettings, FrameSource};

pub struct OpenCvCamera {
    capture: VideoCapture,
}

impl OpenCvCamera {
    /// Open the device and request the configured resolution and frame rate.
    pub fn open(settings: CaptureSettings) -> Result<Self> {
        let mut capture = VideoCapture::new(settings.device_index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            bail!("Failed to open camera {}", settings.device_index);
        }

        // Best effort: drivers are free to ignore these.
        let requests = [
            ("width", videoio::CAP_PROP_FRAME_WIDTH, f64::from(settings.width)),
            ("height", videoio::CAP_PROP_FRAME_HEIGHT, f64::from(settings.height)),
            ("fps", videoio::CAP_PROP_FPS, settings.fps),
        ];
        for (name, prop, value) in requests {
            if !capture.set(prop, value)? {
                warn!("Camera ignored {} = {}", name, value);
            }
        }

        info!(
            "Opened camera {} at {}x{} ({:.0} fps)",
            settings.device_index,
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?,
            capture.get(videoio::CAP_PROP_FPS)?
        );
        Ok(Self { capture })
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    fn is_open(&self) -> bool {
        opened_or_warn(self.capture.is_opened())
    }

    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        // A failed grab or an empty frame both mean the stream is over.
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}

/// A failed state query counts as closed.
fn opened_or_warn(state: opencv::Result<bool>) -> bool {
    match state {
        Ok(open) => open,
        Err(e) => {
            warn!("Failed to query camera state: {}", e);
            false
        }
    }
}
