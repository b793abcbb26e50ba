//! Capture, detect and persist loop
//!
//! One cycle pulls a frame from the [`FrameSource`], runs the detector,
//! offers every region to the event store in order and hands the annotated
//! frame to the [`FrameSink`]. Capture failures skip the cycle; the source is
//! responsible for any reconnection.

use image::codecs::jpeg::JpegEncoder;
use log::{debug, error, info, warn};
use shared::camera_interface::{CameraError, FrameSource};
use shared::frame::frame_to_rgb_image;
use shared::image_proc::Region;
use shared::Frame;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::ServiceSettings;
use crate::event_store::{layout, EventStore, SaveOutcome};
use crate::motion_detector::{draw_debug_info, DetectorError, MotionDetector};

const PREVIEW_JPEG_QUALITY: u8 = 80;

/// Minimum pause after a failed capture
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Consumer of annotated frames for human observation
///
/// Sinks only observe; nothing they do feeds back into detection or
/// persistence.
pub trait FrameSink {
    fn present(&mut self, annotated: &Frame, regions: &[Region]) -> Result<(), image::ImageError>;
}

/// Sink that discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _: &Frame, _: &[Region]) -> Result<(), image::ImageError> {
        Ok(())
    }
}

/// Sink that periodically writes the debug view to a JPEG file
#[derive(Debug, Clone)]
pub struct PreviewSink {
    path: PathBuf,
    every: u64,
    frames: u64,
}

impl PreviewSink {
    /// Write the preview to `path` on every `every`-th frame
    pub fn new(path: impl Into<PathBuf>, every: u64) -> Self {
        Self {
            path: path.into(),
            every: every.max(1),
            frames: 0,
        }
    }
}

impl FrameSink for PreviewSink {
    fn present(&mut self, annotated: &Frame, regions: &[Region]) -> Result<(), image::ImageError> {
        self.frames += 1;
        if (self.frames - 1) % self.every != 0 {
            return Ok(());
        }

        let img = frame_to_rgb_image(&draw_debug_info(annotated, regions));
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, PREVIEW_JPEG_QUALITY).encode_image(&img)?;
        layout::write_atomically(&self.path, &jpeg)?;
        Ok(())
    }
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames captured successfully
    pub frames: u64,
    pub capture_failures: u64,
    /// Regions reported by the detector
    pub detections: u64,
    pub saved: u64,
    /// Saves rejected by the rate limit
    pub skipped: u64,
    pub failed_saves: u64,
    /// Scheduled retention sweeps performed
    pub cleanups: u64,
    pub buckets_removed: u64,
}

/// Outcome of a single cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// A frame was processed
    Processed,
    /// Capture failed and the cycle was skipped
    CaptureFailed,
    /// The source has no more frames
    EndOfStream,
}

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Detection failed: {0}")]
    Detector(#[from] DetectorError),
}

/// Owns the detector and store and drives them from a frame source
pub struct Monitor<S: FrameSource> {
    source: S,
    detector: MotionDetector,
    store: EventStore,
    sink: Box<dyn FrameSink>,
    settings: ServiceSettings,
    last_cleanup: Option<Instant>,
    stats: RunStats,
}

impl<S: FrameSource> Monitor<S> {
    pub fn new(
        source: S,
        detector: MotionDetector,
        store: EventStore,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            source,
            detector,
            store,
            sink: Box::new(NullSink),
            settings,
            last_cleanup: None,
            stats: RunStats::default(),
        }
    }

    /// Replace the display sink
    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    /// Run one capture/detect/save cycle
    pub fn step(&mut self) -> Result<Cycle, MonitorError> {
        self.maybe_cleanup();

        let frame = match self.source.capture() {
            Ok(frame) => frame,
            Err(CameraError::EndOfStream) => return Ok(Cycle::EndOfStream),
            Err(e) => {
                warn!("Failed to capture frame: {e}");
                self.stats.capture_failures += 1;
                return Ok(Cycle::CaptureFailed);
            }
        };
        self.stats.frames += 1;

        let detection = self.detector.detect(&frame)?;
        self.stats.detections += detection.regions.len() as u64;

        for region in &detection.regions {
            match self.store.save_detection(&frame, region) {
                Ok(SaveOutcome::Saved(_)) => self.stats.saved += 1,
                Ok(SaveOutcome::Skipped { .. }) => self.stats.skipped += 1,
                Err(e) => {
                    error!("Failed to save detection: {e}");
                    self.stats.failed_saves += 1;
                }
            }
        }

        if let Err(e) = self.sink.present(&detection.annotated, &detection.regions) {
            warn!("Frame sink failed: {e}");
        }

        Ok(Cycle::Processed)
    }

    /// Run until the source ends or `max_frames` frames were processed
    ///
    /// Sleeps `frame_delay` between cycles, and at least 100 ms after a
    /// failed capture. Returns the final counters.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<RunStats, MonitorError> {
        info!("Starting detection loop");
        let delay = self.settings.frame_delay();

        loop {
            if max_frames.is_some_and(|max| self.stats.frames >= max) {
                info!("Reached frame limit");
                break;
            }
            let pause = match self.step()? {
                Cycle::EndOfStream => {
                    info!("Frame source exhausted");
                    break;
                }
                Cycle::Processed => delay,
                Cycle::CaptureFailed => delay.max(CAPTURE_RETRY_DELAY),
            };
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        info!(
            "Run finished: {} frames, {} detections, {} saved, {} skipped, {} failed",
            self.stats.frames,
            self.stats.detections,
            self.stats.saved,
            self.stats.skipped,
            self.stats.failed_saves
        );
        Ok(self.stats)
    }

    /// Sweep expired buckets when the cleanup interval has elapsed
    fn maybe_cleanup(&mut self) {
        let Some(interval) = self.settings.cleanup_interval() else {
            return;
        };
        if self
            .last_cleanup
            .is_some_and(|last| last.elapsed() < interval)
        {
            return;
        }
        self.last_cleanup = Some(Instant::now());

        let retention_days = self.store.config().retention_days;
        match self.store.cleanup_expired(retention_days) {
            Ok(report) => {
                self.stats.cleanups += 1;
                self.stats.buckets_removed += report.removed.len() as u64;
                debug!("Scheduled cleanup removed {} buckets", report.removed.len());
            }
            Err(e) => error!("Scheduled cleanup failed: {e}"),
        }
    }
}
