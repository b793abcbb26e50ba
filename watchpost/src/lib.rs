//! Always-on camera motion monitoring
//!
//! [`MotionDetector`] finds regions of change against an adaptive
//! background model. [`EventStore`] persists annotated snapshots of those
//! regions under a rate limit, a free-space quota and a retention window.
//! [`Monitor`] ties both to a frame source.

pub mod config;
pub mod event_store;
pub mod monitor;
pub mod motion_detector;

pub use config::{
    CameraSettings, ConfigError, DetectorConfig, ServiceSettings, StorageConfig, WatchpostConfig,
};
pub use event_store::{
    CleanupReport, EventMetadata, EventRecord, EventStore, SaveOutcome, StoreError,
};
pub use monitor::{FrameSink, Monitor, MonitorError, NullSink, PreviewSink, RunStats};
pub use motion_detector::{Detection, DetectorError, MotionDetector};
