//! Testing infrastructure for the watchpost workspace.
//!
//! Two groups of helpers live here:
//!
//! - **Synthetic scenes**: deterministic RGB frames (textured static
//!   backgrounds, seeded sensor noise, solid "intruder" rectangles) shaped
//!   `(height, width, 3)` like real camera frames. Every generator is seeded
//!   so a failing test reproduces exactly.
//! - **Artifact paths**: workspace root discovery and a `test_output/`
//!   directory for images worth inspecting by eye after a test run.
//!
//! # Usage
//!
//! ```rust
//! use test_helpers::{paint_rect, static_scene};
//!
//! let background = static_scene(160, 120);
//! let with_intruder = paint_rect(&background, 40, 30, 20, 25, [255, 255, 255]);
//! assert_eq!(with_intruder.dim(), (120, 160, 3));
//! ```

use ndarray::Array3;
use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::env;
use std::path::{Path, PathBuf};

/// Errors for test infrastructure operations.
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// Project root directory could not be located or accessed.
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Frame filled with one gray level.
pub fn uniform_frame(width: usize, height: usize, level: u8) -> Array3<u8> {
    Array3::from_elem((height, width, 3), level)
}

/// Deterministic textured background.
///
/// A gentle diagonal gradient with a coarse checker texture, kept in the
/// 60..=140 intensity band so that bright or dark intruders stand out.
pub fn static_scene(width: usize, height: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        let gradient = (x + y) * 40 / (width + height).max(1);
        let checker = if (x / 16 + y / 16) % 2 == 0 { 20 } else { 0 };
        let tint = c * 5;
        (80 + gradient + checker + tint) as u8
    })
}

/// Copy of `frame` with uniform noise in `-amplitude..=amplitude` added to
/// every sample, seeded for reproducibility.
pub fn with_sensor_noise(frame: &Array3<u8>, amplitude: i16, seed: u64) -> Array3<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    frame.mapv(|v| {
        let noise: i16 = rng.random_range(-amplitude..=amplitude);
        (v as i16 + noise).clamp(0, 255) as u8
    })
}

/// Copy of `frame` with a solid rectangle painted at `(x, y)` of size
/// `width` x `height`, clipped to the frame.
pub fn paint_rect(
    frame: &Array3<u8>,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    rgb: [u8; 3],
) -> Array3<u8> {
    let mut out = frame.clone();
    let (rows, cols, _) = out.dim();
    for row in y..(y + height).min(rows) {
        for col in x..(x + width).min(cols) {
            for (c, &value) in rgb.iter().enumerate() {
                out[[row, col, c]] = value;
            }
        }
    }
    out
}

/// Locate the workspace root by walking up to the Cargo.toml that declares
/// `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<workspace>/test_output/`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Path inside the test output directory.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}
