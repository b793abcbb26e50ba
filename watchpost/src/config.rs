//! Service configuration.
//!
//! Every section has defaults, and every field is optional in the JSON file,
//! so a partial file like `{"storage": {"retention_days": 3}}` is valid.
//! Configuration is fixed once the service starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Camera selection and requested resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device index (`/dev/video<index>` on Linux)
    pub index: u32,
    /// Requested frame width in pixels
    pub width: u32,
    /// Requested frame height in pixels
    pub height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
        }
    }
}

/// Motion detector tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum area enclosed by a blob's outer outline for it to count as an object
    pub min_area: usize,
    /// Intensity delta above which a pixel is foreground
    pub difference_threshold: u8,
    /// Gaussian kernel width, odd and >= 1
    pub blur_kernel_size: usize,
    /// Number of 3x3 dilation passes over the foreground mask
    pub dilate_iterations: usize,
    /// Exponential smoothing factor for the background model, in (0, 1)
    pub background_update_rate: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 500,
            difference_threshold: 30,
            blur_kernel_size: 21,
            dilate_iterations: 2,
            background_update_rate: 0.2,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "blur_kernel_size must be odd and >= 1, got {}",
                self.blur_kernel_size
            )));
        }
        let alpha = self.background_update_rate;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "background_update_rate must be in (0, 1), got {alpha}"
            )));
        }
        Ok(())
    }
}

/// Event storage location, quota and retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the storage tree; images live under `<base_path>/images`
    pub base_path: PathBuf,
    /// Storage budget in bytes; saves need 10% of it free on the volume
    pub max_storage_bytes: u64,
    /// Minimum seconds between two persisted events
    pub min_save_interval_secs: u64,
    /// Date buckets older than this many days are deleted
    pub retention_days: u32,
    /// JPEG quality for event images (1-100)
    pub jpeg_quality: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("storage"),
            max_storage_bytes: 10 * 1024 * 1024 * 1024,
            min_save_interval_secs: 10,
            retention_days: 7,
            jpeg_quality: 90,
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `base_path` with all other values at their defaults
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    pub fn min_save_interval(&self) -> Duration {
        Duration::from_secs(self.min_save_interval_secs)
    }

    /// Free bytes that must remain on the volume for a save to proceed
    pub fn required_free_bytes(&self) -> u64 {
        self.max_storage_bytes / 10
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.base_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("base_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Capture loop behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Seconds between scheduled retention sweeps (0 disables them)
    pub cleanup_interval_secs: u64,
    /// Where to write the latest debug frame, if anywhere
    pub preview_path: Option<PathBuf>,
    /// Write the preview every this many frames
    pub preview_every: u64,
    /// Pause between cycles so a headless loop does not spin
    pub frame_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 3600,
            preview_path: None,
            preview_every: 30,
            frame_delay_ms: 10,
        }
    }
}

impl ServiceSettings {
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchpostConfig {
    pub camera: CameraSettings,
    pub detector: DetectorConfig,
    pub storage: StorageConfig,
    pub service: ServiceSettings,
}

impl WatchpostConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("unserializable config: {e}")))?;
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera.width, self.camera.height
            )));
        }
        self.detector.validate()?;
        self.storage.validate()
    }
}
