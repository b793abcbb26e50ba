//! Camera interface: the boundary between frame acquisition and the engine.
//!
//! A [`FrameSource`] either returns a valid frame or reports why it could
//! not. Retrying after a failed capture is the caller's decision; sources
//! never retry internally.

pub mod image_sequence;
pub mod mock;
pub mod pixel_format;
#[cfg(feature = "v4l2")]
pub mod v4l2;

use crate::frame::Frame;
use crate::image_size::ImageSize;

pub use image_sequence::ImageSequenceSource;
pub use mock::MockCamera;
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Camera;

/// Errors reported by frame sources
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The device could not be opened or configured
    #[error("Failed to open camera: {0}")]
    Open(String),
    /// A single capture failed; the next one may succeed
    #[error("Frame capture failed: {0}")]
    Capture(String),
    /// The source has no more frames and never will
    #[error("Frame source exhausted")]
    EndOfStream,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
}

/// Result type for camera operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Anything that can hand out RGB frames on demand.
pub trait FrameSource {
    /// Capture the next frame.
    fn capture(&mut self) -> CameraResult<Frame>;

    /// Nominal size of the frames this source produces.
    fn size(&self) -> ImageSize;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture(&mut self) -> CameraResult<Frame> {
        (**self).capture()
    }

    fn size(&self) -> ImageSize {
        (**self).size()
    }
}
