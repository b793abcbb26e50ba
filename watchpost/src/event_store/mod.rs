//! Rate-limited, quota-aware persistence of detection events
//!
//! The [`EventStore`] owns the storage tree and the last-save timestamp. A
//! save is gated in this order:
//!
//! 1. Rate limit: at most one event per `min_save_interval`, across all
//!    regions. A skipped save is not an error and touches nothing on disk.
//! 2. Quota: the storage volume must have more than a tenth of
//!    `max_storage_bytes` free. When it does not, expired buckets are
//!    swept once and the space is checked again.
//!
//! An event is an annotated JPEG plus a JSON [`EventMetadata`] record with
//! the same stem. The image is written first, so a crash can leave an
//! orphaned image but never orphaned metadata.

pub mod layout;
pub mod metadata;
pub mod quota;
pub mod retention;

use chrono::{DateTime, Local, NaiveDate};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use log::{debug, info, warn};
use shared::frame::{frame_to_rgb_image, validate_frame, FrameError};
use shared::image_proc::overlay::BOX_THICKNESS;
use shared::image_proc::{draw_region, draw_text, Region, BOX_COLOR};
use shared::Frame;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::StorageConfig;

pub use metadata::{EventMetadata, EventRecord};
pub use quota::{SpaceProbe, SysinfoSpaceProbe};
pub use retention::CleanupReport;

/// Position and scale of the timestamp burned into event images
const TIMESTAMP_ORIGIN: (u32, u32) = (10, 10);
const TIMESTAMP_SCALE: u32 = 2;

/// Event store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to initialize storage at {path}: {source}")]
    Init { path: PathBuf, source: io::Error },
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error("Storage exhausted: {available} bytes free, {required} required")]
    StorageExhausted { available: u64, required: u64 },
    #[error("Failed to encode event image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to serialize metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a save attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The event was written
    Saved(EventRecord),
    /// The rate limit rejected the save; `elapsed` is the time since the
    /// last successful save
    Skipped { elapsed: Duration },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// Persistent event storage rooted at `StorageConfig::base_path`
pub struct EventStore {
    config: StorageConfig,
    images_dir: PathBuf,
    probe: Box<dyn SpaceProbe>,
    last_save: Option<DateTime<Local>>,
    latest_bucket: Option<NaiveDate>,
    warned_unknown_volume: bool,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("images_dir", &self.images_dir)
            .field("last_save", &self.last_save)
            .finish_non_exhaustive()
    }
}

impl EventStore {
    /// Open or create the storage tree, querying free space from the system
    pub fn new(config: StorageConfig) -> Result<Self, StoreError> {
        Self::with_space_probe(config, SysinfoSpaceProbe)
    }

    /// Open or create the storage tree with a custom free-space source
    ///
    /// Creates `<base>/images` and today's bucket and points `latest` at it.
    /// Failure to create the directories is fatal; a pointer failure is
    /// only logged.
    pub fn with_space_probe(
        config: StorageConfig,
        probe: impl SpaceProbe + 'static,
    ) -> Result<Self, StoreError> {
        let images_dir = config.base_path.join(layout::IMAGES_DIR);
        fs::create_dir_all(&images_dir).map_err(|source| StoreError::Init {
            path: images_dir.clone(),
            source,
        })?;

        let mut store = Self {
            config,
            images_dir,
            probe: Box::new(probe),
            last_save: None,
            latest_bucket: None,
            warned_unknown_volume: false,
        };

        let today = Local::now().date_naive();
        let bucket = store.bucket_dir(today);
        store
            .ensure_bucket(today)
            .map_err(|source| StoreError::Init {
                path: bucket,
                source,
            })?;

        info!("Event store ready at {}", store.images_dir.display());
        Ok(store)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Directory holding the date buckets
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Time of the last successful save
    pub fn last_save(&self) -> Option<DateTime<Local>> {
        self.last_save
    }

    pub fn bucket_dir(&self, date: NaiveDate) -> PathBuf {
        self.images_dir.join(layout::bucket_name(date))
    }

    /// Save one detected region of `frame`, timestamped with the wall clock
    pub fn save_detection(
        &mut self,
        frame: &Frame,
        region: &Region,
    ) -> Result<SaveOutcome, StoreError> {
        self.save_detection_at(frame, region, Local::now())
    }

    /// Save one detected region of `frame` as if it were `now`
    ///
    /// # Returns
    /// * `Ok(SaveOutcome::Saved)` - image and metadata are on disk
    /// * `Ok(SaveOutcome::Skipped)` - the rate limit rejected the save
    /// * `Err(_)` - quota, encoding or I/O failure; the rate limit is not
    ///   advanced so the next attempt is not delayed
    pub fn save_detection_at(
        &mut self,
        frame: &Frame,
        region: &Region,
        now: DateTime<Local>,
    ) -> Result<SaveOutcome, StoreError> {
        if let Some(elapsed) = self.rate_limited(now) {
            debug!("Save skipped, last event {:.1}s ago", elapsed.as_secs_f64());
            return Ok(SaveOutcome::Skipped { elapsed });
        }

        let frame_size = validate_frame(frame)?;
        self.ensure_space(now.date_naive())?;

        let bucket = self.bucket_dir(now.date_naive());
        self.ensure_bucket(now.date_naive())
            .map_err(|e| StoreError::io(&bucket, e))?;

        let (object_id, image_path, metadata_path) = self.allocate_event(&bucket, &now);

        let image = render_event_image(frame, region, &now);
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality).encode_image(&image)?;
        layout::write_atomically(&image_path, &jpeg).map_err(|e| StoreError::io(&image_path, e))?;

        let metadata = EventMetadata {
            object_id,
            timestamp: now.fixed_offset(),
            bbox: *region,
            frame_size,
        };
        if let Err(e) = write_metadata(&metadata_path, &metadata) {
            if let Err(cleanup) = fs::remove_file(&image_path) {
                warn!(
                    "Failed to remove orphaned image {}: {cleanup}",
                    image_path.display()
                );
            }
            return Err(e);
        }

        self.last_save = Some(now);
        info!(
            "Saved event {} ({}x{} at {},{})",
            metadata.object_id, region.width, region.height, region.x, region.y
        );

        Ok(SaveOutcome::Saved(EventRecord {
            metadata,
            image_path,
            metadata_path,
        }))
    }

    /// Read a metadata record back from disk
    pub fn load_metadata(path: &Path) -> Result<EventMetadata, StoreError> {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Events stored in the bucket for `date`, sorted by file name
    pub fn list_events(&self, date: NaiveDate) -> Result<Vec<EventRecord>, StoreError> {
        let bucket = self.bucket_dir(date);
        let entries = match fs::read_dir(&bucket) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&bucket, e)),
        };

        let mut metadata_paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&bucket, e))?.path();
            if path.extension().is_some_and(|ext| ext == layout::METADATA_EXTENSION) {
                metadata_paths.push(path);
            }
        }
        metadata_paths.sort();

        metadata_paths
            .into_iter()
            .map(|metadata_path| {
                let metadata = Self::load_metadata(&metadata_path)?;
                Ok(EventRecord {
                    metadata,
                    image_path: metadata_path.with_extension(layout::IMAGE_EXTENSION),
                    metadata_path,
                })
            })
            .collect()
    }

    /// Delete buckets older than `retention_days`, relative to today
    pub fn cleanup_expired(&mut self, retention_days: u32) -> Result<CleanupReport, StoreError> {
        self.cleanup_expired_at(Local::now().date_naive(), retention_days)
    }

    /// Delete buckets older than `retention_days`, relative to `today`
    pub fn cleanup_expired_at(
        &mut self,
        today: NaiveDate,
        retention_days: u32,
    ) -> Result<CleanupReport, StoreError> {
        let report = retention::remove_expired(&self.images_dir, today, retention_days)
            .map_err(|e| StoreError::io(&self.images_dir, e))?;
        if self
            .latest_bucket
            .is_some_and(|date| report.removed.contains(&date))
        {
            self.latest_bucket = None;
        }
        Ok(report)
    }

    /// `Some(elapsed)` when a save now would violate the minimum interval
    fn rate_limited(&self, now: DateTime<Local>) -> Option<Duration> {
        let last = self.last_save?;
        // A clock that stepped backwards yields an error here and never blocks
        let elapsed = (now - last).to_std().ok()?;
        (elapsed < self.config.min_save_interval()).then_some(elapsed)
    }

    fn ensure_space(&mut self, today: NaiveDate) -> Result<(), StoreError> {
        let required = self.config.required_free_bytes();

        let Some(available) = self.probe.available_space(&self.images_dir) else {
            if !self.warned_unknown_volume {
                warn!(
                    "Cannot determine free space for {}, quota not enforced",
                    self.images_dir.display()
                );
                self.warned_unknown_volume = true;
            }
            return Ok(());
        };
        if available > required {
            return Ok(());
        }

        warn!("Low disk space ({available} bytes free, {required} required), cleaning up");
        let report = self.cleanup_expired_at(today, self.config.retention_days)?;
        debug!("Low-space cleanup removed {} buckets", report.removed.len());

        match self.probe.available_space(&self.images_dir) {
            Some(available) if available <= required => {
                Err(StoreError::StorageExhausted {
                    available,
                    required,
                })
            }
            _ => Ok(()),
        }
    }

    /// Create the bucket for `date` and repoint `latest` when it changes
    fn ensure_bucket(&mut self, date: NaiveDate) -> io::Result<()> {
        let bucket = self.bucket_dir(date);
        fs::create_dir_all(&bucket)?;

        if self.latest_bucket != Some(date) {
            if let Err(e) = layout::update_latest_pointer(&self.images_dir, &layout::bucket_name(date))
            {
                warn!("Could not update latest pointer: {e}");
            }
            self.latest_bucket = Some(date);
        }
        Ok(())
    }

    /// Pick an event id that does not collide with files already in `bucket`
    fn allocate_event(&self, bucket: &Path, now: &DateTime<Local>) -> (String, PathBuf, PathBuf) {
        let base = layout::event_id(now);
        let mut object_id = base.clone();
        let mut suffix = 0u32;

        loop {
            let stem = layout::event_stem(now, &object_id);
            let (image_path, metadata_path) = layout::event_paths(bucket, &stem);
            if !image_path.exists() && !metadata_path.exists() {
                return (object_id, image_path, metadata_path);
            }
            suffix += 1;
            object_id = format!("{base}_{suffix}");
        }
    }
}

/// Frame copy with the region outlined and the capture time burned in
fn render_event_image(frame: &Frame, region: &Region, now: &DateTime<Local>) -> RgbImage {
    let mut img = frame_to_rgb_image(frame);
    draw_region(&mut img, region, BOX_COLOR, BOX_THICKNESS);
    let (x, y) = TIMESTAMP_ORIGIN;
    draw_text(
        &mut img,
        &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        x,
        y,
        TIMESTAMP_SCALE,
        BOX_COLOR,
    );
    img
}

fn write_metadata(path: &Path, metadata: &EventMetadata) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(metadata)?;
    layout::write_atomically(path, &json).map_err(|e| StoreError::io(path, e))
}
