//! In-memory camera for tests and dry runs.

use std::collections::VecDeque;

use super::{CameraError, CameraResult, FrameSource};
use crate::frame::Frame;
use crate::image_size::ImageSize;

/// Camera that serves frames from memory.
///
/// Either repeats one frame forever or plays a fixed list once and then
/// reports [`CameraError::EndOfStream`]. Individual captures can be scripted
/// to fail to exercise capture-failure handling.
#[derive(Debug, Clone)]
pub struct MockCamera {
    size: ImageSize,
    frames: VecDeque<Frame>,
    repeat: Option<Frame>,
    fail_on: Vec<u64>,
    captures: u64,
}

impl MockCamera {
    /// Camera that returns a copy of `frame` on every capture
    pub fn new_repeating(frame: Frame) -> Self {
        Self {
            size: ImageSize::of_frame(&frame),
            frames: VecDeque::new(),
            repeat: Some(frame),
            fail_on: Vec::new(),
            captures: 0,
        }
    }

    /// Camera that plays `frames` in order, then ends
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let size = frames
            .first()
            .map(ImageSize::of_frame)
            .unwrap_or(ImageSize::from_width_height(0, 0));
        Self {
            size,
            frames: frames.into(),
            repeat: None,
            fail_on: Vec::new(),
            captures: 0,
        }
    }

    /// Make the given capture attempts (0-based) fail with a capture error
    pub fn with_failures(mut self, attempts: &[u64]) -> Self {
        self.fail_on = attempts.to_vec();
        self
    }

    /// Number of capture attempts made so far
    pub fn captures(&self) -> u64 {
        self.captures
    }
}

impl FrameSource for MockCamera {
    fn capture(&mut self) -> CameraResult<Frame> {
        let attempt = self.captures;
        self.captures += 1;

        if self.fail_on.contains(&attempt) {
            return Err(CameraError::Capture(format!(
                "scripted failure on attempt {attempt}"
            )));
        }

        if let Some(frame) = &self.repeat {
            return Ok(frame.clone());
        }

        self.frames.pop_front().ok_or(CameraError::EndOfStream)
    }

    fn size(&self) -> ImageSize {
        self.size
    }
}
