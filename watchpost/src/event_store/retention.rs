//! Age-based removal of date buckets

use chrono::NaiveDate;
use log::{error, info};
use std::fs;
use std::io;
use std::path::Path;

use super::layout::parse_bucket_name;

/// Outcome of one retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Buckets deleted, oldest first
    pub removed: Vec<NaiveDate>,
    /// Expired buckets that could not be deleted
    pub failed: Vec<NaiveDate>,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Delete every bucket under `images_dir` older than `retention_days`
///
/// A bucket expires when `today - date > retention_days`. Symlinks, plain
/// files and directories whose names are not dates are skipped.
pub fn remove_expired(
    images_dir: &Path,
    today: NaiveDate,
    retention_days: u32,
) -> io::Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for entry in fs::read_dir(images_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(date) = entry.file_name().to_str().and_then(parse_bucket_name) else {
            continue;
        };
        if (today - date).num_days() <= i64::from(retention_days) {
            continue;
        }

        match fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                info!("Removed expired bucket {}", entry.path().display());
                report.removed.push(date);
            }
            Err(e) => {
                error!("Failed to remove bucket {}: {e}", entry.path().display());
                report.failed.push(date);
            }
        }
    }

    report.removed.sort();
    report.failed.sort();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bucket_with_file(root: &Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a.jpg"), b"x").unwrap();
        fs::write(dir.join("nested").join("b.json"), b"{}").unwrap();
    }

    #[test]
    fn test_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2026-10-01", "2026-10-10", "2026-10-11", "2026-10-18"] {
            bucket_with_file(dir.path(), name);
        }

        let report = remove_expired(dir.path(), day("2026-10-18"), 7).unwrap();
        assert_eq!(report.removed, vec![day("2026-10-01"), day("2026-10-10")]);
        assert!(report.failed.is_empty());

        assert!(!dir.path().join("2026-10-01").exists());
        assert!(!dir.path().join("2026-10-10").exists());
        // Exactly seven days old is kept
        assert!(dir.path().join("2026-10-11").exists());
        assert!(dir.path().join("2026-10-18").join("a.jpg").exists());
    }

    #[test]
    fn test_second_sweep_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        bucket_with_file(dir.path(), "2026-01-01");

        let first = remove_expired(dir.path(), day("2026-10-18"), 7).unwrap();
        assert_eq!(first.removed.len(), 1);
        let second = remove_expired(dir.path(), day("2026-10-18"), 7).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_skips_non_buckets() {
        let dir = tempfile::tempdir().unwrap();
        bucket_with_file(dir.path(), "old-stuff");
        fs::write(dir.path().join("2020-01-01"), b"not a dir").unwrap();

        #[cfg(unix)]
        {
            bucket_with_file(dir.path(), "2020-01-02");
            std::os::unix::fs::symlink("2020-01-02", dir.path().join("latest")).unwrap();
        }

        let report = remove_expired(dir.path(), day("2026-10-18"), 7).unwrap();
        assert!(dir.path().join("old-stuff").exists());
        assert!(dir.path().join("2020-01-01").is_file());
        #[cfg(unix)]
        assert_eq!(report.removed, vec![day("2020-01-02")]);
        #[cfg(not(unix))]
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_future_buckets_kept() {
        let dir = tempfile::tempdir().unwrap();
        bucket_with_file(dir.path(), "2027-01-01");
        let report = remove_expired(dir.path(), day("2026-10-18"), 0).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_missing_images_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_expired(&dir.path().join("nope"), day("2026-10-18"), 7).is_err());
    }
}
