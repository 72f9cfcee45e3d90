//! HighGUI windows and keyboard polling.

use std::time::Duration;

use anyhow::Result;
use opencv::core::Mat;
use opencv::highgui;

use super::{Display, KeySource};

/// Process-wide HighGUI surface. Windows are created on first `show`.
#[derive(Debug, Default)]
pub struct HighGui;

impl HighGui {
    pub fn new() -> Self {
        Self
    }
}

impl Display<Mat> for HighGui {
    fn show(&mut self, title: &str, image: &Mat) -> Result<()> {
        highgui::imshow(title, image)?;
        Ok(())
    }

    fn destroy_all(&mut self) -> Result<()> {
        highgui::destroy_all_windows()?;
        Ok(())
    }
}

impl KeySource for HighGui {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<u8>> {
        // wait_key(0) blocks forever, so keep the wait at least 1 ms.
        let delay_ms = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let code = highgui::wait_key(delay_ms)?;
        Ok((code >= 0).then(|| (code & 0xFF) as u8))
    }
}
