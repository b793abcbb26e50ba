//! Image dimensions and size utilities

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image dimensions structure
///
/// Represents the width and height of a camera frame.
/// Serializes as `{"width": .., "height": ..}`, which is also the
/// `frame_size` shape written into event metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl ImageSize {
    /// Create a new ImageSize
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size of a `(height, width, channels)` frame array
    pub fn of_frame(frame: &Array3<u8>) -> Self {
        let (height, width, _) = frame.dim();
        Self { width, height }
    }

    /// Create a black RGB frame with this size
    pub fn empty_frame(&self) -> Array3<u8> {
        Array3::zeros((self.height, self.width, 3))
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert to tuple (width, height)
    pub fn to_tuple(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Create from tuple (width, height)
    pub fn from_tuple(dimensions: (usize, usize)) -> Self {
        Self {
            width: dimensions.0,
            height: dimensions.1,
        }
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::from_tuple(dimensions)
    }
}

impl From<ImageSize> for (usize, usize) {
    fn from(size: ImageSize) -> Self {
        size.to_tuple()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_frame_reads_height_width_order() {
        let frame = Array3::<u8>::zeros((48, 64, 3));
        let size = ImageSize::of_frame(&frame);
        assert_eq!(size.width, 64);
        assert_eq!(size.height, 48);
        assert_eq!(size.pixel_count(), 64 * 48);
    }

    #[test]
    fn test_empty_frame_is_rows_first() {
        let size = ImageSize::from_width_height(10, 4);
        assert_eq!(size.empty_frame().dim(), (4, 10, 3));
    }

    #[test]
    fn test_display_and_tuple() {
        let size: ImageSize = (640, 480).into();
        assert_eq!(size.to_string(), "640x480");
        assert_eq!(<(usize, usize)>::from(size), (640, 480));
        assert!(!size.is_empty());
        assert!(ImageSize::from_width_height(0, 480).is_empty());
    }
}
