//! Motion monitoring service.
//!
//! Captures frames, detects motion and stores annotated events until the
//! frame source ends, `--max-frames` is reached, or the process is killed.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use shared::camera_interface::{FrameSource, ImageSequenceSource, MockCamera};
use shared::ImageSize;
use std::path::PathBuf;
use watchpost::{EventStore, Monitor, MotionDetector, PreviewSink, WatchpostConfig};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceKind {
    /// Synthetic static scene, useful for smoke tests
    Mock,
    /// Replay image files from --input-dir
    Dir,
    /// Live V4L2 camera (requires the `v4l2` feature)
    V4l2,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Always-on camera motion monitor",
    long_about = "Watches a camera for motion and stores annotated snapshots of each event \
        under <storage>/images/<YYYY-MM-DD>/, with a rate limit, a free-space quota and \
        age-based retention.\n\n\
        Settings come from the optional JSON config file; command line flags override it."
)]
struct Args {
    #[arg(long, help = "Path to a JSON configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SourceKind::V4l2, help = "Frame source")]
    source: SourceKind,

    #[arg(long, help = "Directory of images to replay with --source dir")]
    input_dir: Option<PathBuf>,

    #[arg(long, help = "Storage base directory (overrides the config file)")]
    storage: Option<PathBuf>,

    #[arg(long, help = "Stop after this many frames")]
    max_frames: Option<u64>,

    #[arg(long, help = "Pause between frames in milliseconds")]
    frame_delay_ms: Option<u64>,

    #[arg(
        long,
        help = "Write the debug view to this JPEG file",
        long_help = "Periodically write the annotated debug view (boxes plus object count) \
            to this JPEG file. The write interval is service.preview_every frames."
    )]
    preview: Option<PathBuf>,

    #[arg(
        long,
        help = "Disable the debug view output",
        long_help = "Disable the debug view output, even when --preview or \
            service.preview_path is set. Only stored events are written."
    )]
    no_ui: bool,

    #[arg(long, help = "Write the effective configuration to this path and exit")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WatchpostConfig::load_from_file(path)
            .with_context(|| format!("Loading config from {}", path.display()))?,
        None => WatchpostConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Writing config to {}", path.display()))?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let size = ImageSize::from_width_height(
        config.camera.width as usize,
        config.camera.height as usize,
    );
    let source = open_source(&args, &config, size)?;
    info!("Frame source ready ({})", source.size());

    let detector = MotionDetector::new(config.detector.clone())?;
    let store = EventStore::new(config.storage.clone()).with_context(|| {
        format!(
            "Initializing storage at {}",
            config.storage.base_path.display()
        )
    })?;

    let mut monitor = Monitor::new(source, detector, store, config.service.clone());
    if let Some(path) = &config.service.preview_path {
        monitor = monitor.with_sink(PreviewSink::new(path, config.service.preview_every));
    }

    let stats = monitor.run(args.max_frames)?;
    info!("{stats:?}");
    Ok(())
}

fn apply_overrides(config: &mut WatchpostConfig, args: &Args) {
    if let Some(storage) = &args.storage {
        config.storage.base_path = storage.clone();
    }
    if let Some(delay) = args.frame_delay_ms {
        config.service.frame_delay_ms = delay;
    }
    if let Some(preview) = &args.preview {
        config.service.preview_path = Some(preview.clone());
    }
    if args.no_ui {
        if let Some(path) = config.service.preview_path.take() {
            info!("Debug view disabled, not writing {}", path.display());
        }
    }
}

fn open_source(
    args: &Args,
    config: &WatchpostConfig,
    size: ImageSize,
) -> Result<Box<dyn FrameSource>> {
    match args.source {
        SourceKind::Mock => {
            warn!("Using mock camera; no motion will be seen");
            Ok(Box::new(MockCamera::new_repeating(size.empty_frame())))
        }
        SourceKind::Dir => {
            let dir = args
                .input_dir
                .as_deref()
                .context("--source dir requires --input-dir")?;
            let source = ImageSequenceSource::open(dir, size)
                .with_context(|| format!("Opening image directory {}", dir.display()))?;
            Ok(Box::new(source))
        }
        SourceKind::V4l2 => open_camera(config, size),
    }
}

#[cfg(feature = "v4l2")]
fn open_camera(config: &WatchpostConfig, size: ImageSize) -> Result<Box<dyn FrameSource>> {
    let index = config.camera.index as usize;
    info!("Opening camera {index}");
    let camera = shared::camera_interface::V4l2Camera::open(index, size)
        .with_context(|| format!("Opening /dev/video{index}"))?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "v4l2"))]
fn open_camera(_config: &WatchpostConfig, _size: ImageSize) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("Built without the v4l2 feature; use --source mock or --source dir")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flag_sets_debug_view_path() {
        let args = Args::parse_from(["watchpost", "--preview", "view.jpg"]);
        let mut config = WatchpostConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.service.preview_path, Some(PathBuf::from("view.jpg")));
    }

    #[test]
    fn test_no_ui_disables_debug_view() {
        let args = Args::parse_from(["watchpost", "--preview", "view.jpg", "--no-ui"]);
        let mut config = WatchpostConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.service.preview_path, None);

        let args = Args::parse_from(["watchpost", "--no-ui"]);
        let mut config = WatchpostConfig::default();
        config.service.preview_path = Some(PathBuf::from("configured.jpg"));
        apply_overrides(&mut config, &args);
        assert_eq!(config.service.preview_path, None);
    }

    #[test]
    fn test_storage_and_delay_overrides() {
        let args = Args::parse_from([
            "watchpost",
            "--storage",
            "/tmp/events",
            "--frame-delay-ms",
            "25",
        ]);
        let mut config = WatchpostConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.storage.base_path, PathBuf::from("/tmp/events"));
        assert_eq!(config.service.frame_delay_ms, 25);
        assert_eq!(config.service.preview_path, None);
    }
}
