//! Metadata record written next to each event image

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use shared::image_proc::Region;
use shared::ImageSize;
use std::path::PathBuf;

/// Persisted description of one event
///
/// Serialized as
/// `{"object_id", "timestamp", "bbox": {x, y, width, height}, "frame_size": {width, height}}`
/// with the timestamp in RFC 3339 form including the local offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub object_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub bbox: Region,
    pub frame_size: ImageSize,
}

/// A persisted event and where its files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub metadata: EventMetadata,
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
}
