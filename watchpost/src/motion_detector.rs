//! Adaptive background subtraction motion detector
//!
//! Each call smooths the frame's luminance, differences it against a running
//! floating point background estimate, and turns the resulting foreground
//! mask into bounding regions. The background is then blended toward the
//! current frame, so objects that stop moving fade into the scene after a
//! few frames.
//!
//! The first frame after construction (or [`MotionDetector::reset`]) only
//! seeds the background and never produces detections.

use log::{debug, info, warn};
use ndarray::{Array2, Zip};
use shared::frame::{frame_to_rgb_image, rgb_image_to_frame, to_luma, validate_frame, FrameError};
use shared::image_proc::overlay::text_height;
use shared::image_proc::{
    abs_diff, annotate_regions, apply_threshold, components_to_regions, connected_components,
    dilate, draw_text, gaussian_blur, ImageProcError, Region, BOX_COLOR,
};
use shared::Frame;

use crate::config::{ConfigError, DetectorConfig};

/// Scale of the debug overlay text
const DEBUG_TEXT_SCALE: u32 = 2;

/// Errors from the motion detector
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error("Image processing failed: {0}")]
    ImageProc(#[from] ImageProcError),
}

/// Result of one detection call
#[derive(Debug, Clone)]
pub struct Detection {
    /// Regions of significant change, in component discovery order
    pub regions: Vec<Region>,
    /// Copy of the input with each region outlined, for display only
    pub annotated: Frame,
}

impl Detection {
    fn empty(frame: &Frame) -> Self {
        Self {
            regions: Vec::new(),
            annotated: frame.clone(),
        }
    }
}

/// Motion detector with an exclusively owned background model
#[derive(Debug, Clone)]
pub struct MotionDetector {
    config: DetectorConfig,
    background: Option<Array2<f32>>,
}

impl MotionDetector {
    /// Create a detector after validating its configuration
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            config,
            background: None,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether a background model has been seeded
    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    /// Discard the background model; the next call re-seeds it
    pub fn reset(&mut self) {
        self.background = None;
    }

    /// Detect motion regions in `frame`
    ///
    /// # Arguments
    /// * `frame` - RGB frame of shape `(height, width, 3)`
    ///
    /// # Returns
    /// Regions whose outline encloses at least `min_area` pixels, plus an
    /// annotated copy of the frame. The first call returns no regions.
    pub fn detect(&mut self, frame: &Frame) -> Result<Detection, DetectorError> {
        let size = validate_frame(frame)?;
        let smoothed = gaussian_blur(to_luma(frame).view(), self.config.blur_kernel_size)?;

        let background = match self.background.as_mut() {
            Some(background) if background.dim() == smoothed.dim() => background,
            previous => {
                if previous.is_some() {
                    warn!("Frame size changed to {size}, re-seeding background model");
                }
                self.background = Some(smoothed.mapv(f32::from));
                info!("Background model initialized ({size})");
                return Ok(Detection::empty(frame));
            }
        };

        let reference = background.mapv(|v| v.round().clamp(0.0, 255.0) as u8);
        let difference = abs_diff(smoothed.view(), reference.view())?;
        let mask = dilate(
            apply_threshold(difference.view(), self.config.difference_threshold).view(),
            self.config.dilate_iterations,
        );

        let (labels, num_labels) = connected_components(mask.view());
        let regions: Vec<Region> = components_to_regions(labels.view(), num_labels)
            .into_iter()
            .filter(|component| component.area >= self.config.min_area)
            .map(|component| component.region)
            .collect();

        let alpha = self.config.background_update_rate;
        Zip::from(background)
            .and(&smoothed)
            .for_each(|bg, &current| *bg = (1.0 - alpha) * *bg + alpha * f32::from(current));

        if !regions.is_empty() {
            debug!(
                "{} of {} components passed min_area {}",
                regions.len(),
                num_labels,
                self.config.min_area
            );
        }

        let annotated = annotate_regions(frame, &regions);
        Ok(Detection { regions, annotated })
    }
}

/// Copy of `frame` with the region count written in the top-left corner
pub fn draw_debug_info(frame: &Frame, regions: &[Region]) -> Frame {
    let mut img = frame_to_rgb_image(frame);
    let margin = text_height(DEBUG_TEXT_SCALE);
    draw_text(
        &mut img,
        &format!("OBJECTS: {}", regions.len()),
        margin,
        margin,
        DEBUG_TEXT_SCALE,
        BOX_COLOR,
    );
    rgb_image_to_frame(&img)
}
