//! On-disk layout of the event store
//!
//! ```text
//! <base>/images/<YYYY-MM-DD>/<HH-MM-SS>_object_<event_id>.jpg
//! <base>/images/<YYYY-MM-DD>/<HH-MM-SS>_object_<event_id>.json
//! <base>/images/latest -> <YYYY-MM-DD>
//! ```

use chrono::{DateTime, NaiveDate, TimeZone};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory under the base path holding the date buckets
pub const IMAGES_DIR: &str = "images";

/// Name of the pointer to the current bucket
pub const LATEST_POINTER: &str = "latest";

pub const IMAGE_EXTENSION: &str = "jpg";
pub const METADATA_EXTENSION: &str = "json";

const BUCKET_FORMAT: &str = "%Y-%m-%d";

/// Directory name for the bucket holding events of `date`
pub fn bucket_name(date: NaiveDate) -> String {
    date.format(BUCKET_FORMAT).to_string()
}

/// Date encoded in a bucket directory name, if it is one
pub fn parse_bucket_name(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, BUCKET_FORMAT).ok()
}

/// Event id with microsecond resolution, e.g. `20261018_143005_123456`
pub fn event_id<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// Shared file stem of an event's image and metadata
pub fn event_stem<Tz: TimeZone>(timestamp: &DateTime<Tz>, event_id: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_object_{}", timestamp.format("%H-%M-%S"), event_id)
}

/// Image and metadata paths for an event stem inside `bucket`
pub fn event_paths(bucket: &Path, stem: &str) -> (PathBuf, PathBuf) {
    (
        bucket.join(format!("{stem}.{IMAGE_EXTENSION}")),
        bucket.join(format!("{stem}.{METADATA_EXTENSION}")),
    )
}

/// Write `bytes` to a sibling temporary file and rename it into place
///
/// Readers never observe a partially written file at `path`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Point `<images_dir>/latest` at `bucket`
///
/// On Unix this is a relative symlink; elsewhere a plain file holding the
/// bucket name. A real directory named `latest` is left alone.
pub fn update_latest_pointer(images_dir: &Path, bucket: &str) -> io::Result<()> {
    let pointer = images_dir.join(LATEST_POINTER);

    match fs::symlink_metadata(&pointer) {
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", pointer.display()),
            ));
        }
        Ok(_) => fs::remove_file(&pointer)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(bucket, &pointer)
    }
    #[cfg(not(unix))]
    {
        fs::write(&pointer, bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime};

    fn at(s: &str) -> DateTime<FixedOffset> {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap();
        FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(&naive)
            .unwrap()
    }

    #[test]
    fn test_bucket_names() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(bucket_name(date), "2026-03-07");
        assert_eq!(parse_bucket_name("2026-03-07"), Some(date));
        assert_eq!(parse_bucket_name("latest"), None);
        assert_eq!(parse_bucket_name("2026-13-01"), None);
        assert_eq!(parse_bucket_name("2026-03-07-old"), None);
    }

    #[test]
    fn test_event_naming() {
        let ts = at("2026-10-18 14:30:05.000123");
        let id = event_id(&ts);
        assert_eq!(id, "20261018_143005_000123");
        assert_eq!(event_stem(&ts, &id), "14-30-05_object_20261018_143005_000123");

        let (img, meta) = event_paths(Path::new("/s/images/2026-10-18"), "stem");
        assert_eq!(img, PathBuf::from("/s/images/2026-10-18/stem.jpg"));
        assert_eq!(meta, PathBuf::from("/s/images/2026-10-18/stem.json"));
    }

    #[test]
    fn test_write_atomically_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write_atomically(&path, b"{}").unwrap();
        write_atomically(&path, b"[1]").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"[1]");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomically_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.json");
        assert!(write_atomically(&path, b"{}").is_err());
    }

    #[test]
    fn test_latest_pointer_repoints() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2026-10-17")).unwrap();
        fs::create_dir(dir.path().join("2026-10-18")).unwrap();

        update_latest_pointer(dir.path(), "2026-10-17").unwrap();
        update_latest_pointer(dir.path(), "2026-10-18").unwrap();

        let pointer = dir.path().join(LATEST_POINTER);
        #[cfg(unix)]
        assert_eq!(fs::read_link(&pointer).unwrap(), PathBuf::from("2026-10-18"));
        #[cfg(not(unix))]
        assert_eq!(fs::read_to_string(&pointer).unwrap(), "2026-10-18");
    }

    #[test]
    fn test_latest_pointer_refuses_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(LATEST_POINTER)).unwrap();
        assert!(update_latest_pointer(dir.path(), "2026-10-18").is_err());
        assert!(dir.path().join(LATEST_POINTER).is_dir());
    }
}
