//! Hardware-facing seams: frame capture, window display and key input.
//!
//! The detection loops only talk to these traits. The OpenCV implementations
//! (`camera`, `highgui`) are compiled with the `opencv` feature.

#[cfg(feature = "opencv")]
pub mod camera;
#[cfg(feature = "opencv")]
pub mod highgui;

use std::time::Duration;

use anyhow::Result;

/// Capture device request. The driver may ignore any of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub device_index: i32,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 15.0,
        }
    }
}

/// A blocking source of frames, such as a camera.
pub trait FrameSource {
    type Frame;

    fn is_open(&self) -> bool;

    /// Block until the next frame. `Ok(None)` means the stream has ended.
    fn read(&mut self) -> Result<Option<Self::Frame>>;

    /// Release the device. Releasing twice is a no-op.
    fn release(&mut self) -> Result<()>;
}

/// Named windows that show images.
pub trait Display<I> {
    fn show(&mut self, title: &str, image: &I) -> Result<()>;

    fn destroy_all(&mut self) -> Result<()>;
}

/// Keyboard polling, also used to pump the window event loop.
pub trait KeySource {
    /// Wait up to `timeout` for a key. Returns the low byte of the key code.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<u8>>;
}
