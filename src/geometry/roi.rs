//! Region-of-interest rectangle used to crop the registration template.

use std::fmt;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer pixel coordinate (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned crop rectangle with top-left corner `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Whether the rectangle lies entirely inside an image of `size`.
    pub fn fits_within(&self, size: ImageSize) -> bool {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        self.width > 0
            && self.height > 0
            && right <= u64::from(size.width)
            && bottom <= u64::from(size.height)
    }

    /// Outer corners of a guide outline of the given stroke thickness.
    ///
    /// The outline is pushed outward by `thickness` on every side so that the
    /// stroke never covers a pixel inside the ROI. The returned corners are
    /// top-left and bottom-right, both inclusive.
    pub fn guide_corners(&self, thickness: i32) -> (PixelPoint, PixelPoint) {
        let left = self.x as i32;
        let top = self.y as i32;
        let right = left + self.width as i32 - 1;
        let bottom = top + self.height as i32 - 1;
        (
            PixelPoint::new(left - thickness, top - thickness),
            PixelPoint::new(right + thickness, bottom + thickness),
        )
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}
