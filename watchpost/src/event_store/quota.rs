//! Free space queries for the storage volume

use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Source of free-space figures for the volume holding a path
pub trait SpaceProbe {
    /// Bytes available on the volume holding `path`, or `None` when the
    /// volume cannot be identified
    fn available_space(&self, path: &Path) -> Option<u64>;
}

impl<F> SpaceProbe for F
where
    F: Fn(&Path) -> Option<u64>,
{
    fn available_space(&self, path: &Path) -> Option<u64> {
        self(path)
    }
}

/// Probe backed by the system disk list
///
/// Picks the disk whose mount point is the longest prefix of the
/// canonicalized path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoSpaceProbe;

impl SpaceProbe for SysinfoSpaceProbe {
    fn available_space(&self, path: &Path) -> Option<u64> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();
        let mounts = disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point().to_path_buf(), disk.available_space()));
        longest_mount_match(&path, mounts)
    }
}

fn longest_mount_match(
    path: &Path,
    mounts: impl IntoIterator<Item = (PathBuf, u64)>,
) -> Option<u64> {
    mounts
        .into_iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_mount_wins() {
        let mounts = vec![
            (PathBuf::from("/"), 100),
            (PathBuf::from("/data"), 200),
            (PathBuf::from("/data/cam"), 300),
            (PathBuf::from("/dat"), 400),
        ];
        assert_eq!(
            longest_mount_match(Path::new("/data/cam/storage"), mounts.clone()),
            Some(300)
        );
        assert_eq!(
            longest_mount_match(Path::new("/database"), mounts.clone()),
            Some(100)
        );
        assert_eq!(longest_mount_match(Path::new("relative"), mounts), None);
    }

    #[test]
    fn test_closure_probe() {
        let probe = |_: &Path| Some(42u64);
        assert_eq!(probe.available_space(Path::new("/")), Some(42));
    }

    #[test]
    fn test_sysinfo_probe_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let _ = SysinfoSpaceProbe.available_space(dir.path());
    }
}
