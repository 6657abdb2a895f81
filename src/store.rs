//! On-disk snapshot store.
//!
//! Materializes a repository's gzipped tarball into `root/<repo>/`, where
//! the archive's own top-level directory (GitHub tarballs embed one per
//! commit) becomes the version directory. Extraction stages into a hidden
//! temporary directory and publishes by rename, so enumeration never sees
//! a half-written version. The version identifier itself is opaque; only
//! modification times are consulted.

use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::version::VersionDir;

pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SnapshotStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the snapshot root. Tolerates an already existing directory.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| Error::fs(&self.root, e))
    }

    /// Decompress and unpack a tarball byte stream into `root/<name>/`.
    ///
    /// The archive unpacks into a hidden staging directory first; its
    /// version directories are renamed into place only once the whole
    /// archive unpacked cleanly. A failed, timed out, or abandoned
    /// extraction therefore never publishes a version that
    /// [`SnapshotStore::list_versions`] could select.
    pub fn extract(&self, name: &str, archive: &[u8]) -> Result<()> {
        let dest = self.root.join(name);
        std::fs::create_dir_all(&dest).map_err(|e| Error::fs(&dest, e))?;

        // Dropped on any failure path, removing whatever was unpacked.
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&dest)
            .map_err(|e| Error::fs(&dest, e))?;

        let unpacked_roots = unpack_tarball(name, archive, staging.path())?;

        for root in unpacked_roots {
            let from = staging.path().join(&root);
            let to = dest.join(&root);
            if to.exists() {
                std::fs::remove_dir_all(&to).map_err(|e| Error::fs(&to, e))?;
            }
            std::fs::rename(&from, &to).map_err(|e| Error::fs(&from, e))?;
        }
        Ok(())
    }

    /// Names of repositories that have a snapshot directory, including
    /// strays never seen in the org listing.
    pub fn list_repos(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| Error::fs(&self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::fs(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Enumerate the extracted version directories of one repository.
    /// A repository with no snapshot directory is a filesystem error;
    /// a present but empty directory yields an empty list.
    pub fn list_versions(&self, name: &str) -> Result<Vec<VersionDir>> {
        let repo_dir = self.root.join(name);
        let entries = std::fs::read_dir(&repo_dir).map_err(|e| Error::fs(&repo_dir, e))?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::fs(&repo_dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            // Staging directories of in-flight extractions.
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = std::fs::metadata(&path).map_err(|e| Error::fs(&path, e))?;
            let modified = metadata.modified().map_err(|e| Error::fs(&path, e))?;
            versions.push(VersionDir { path, modified });
        }
        versions.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(versions)
    }
}

fn unpack_tarball(name: &str, archive: &[u8], dest: &Path) -> Result<BTreeSet<PathBuf>> {
    let gz = GzDecoder::new(Cursor::new(archive));
    let mut tarball = tar::Archive::new(gz);

    let entries = tarball
        .entries()
        .map_err(|e| Error::extraction(name, e))?;

    let mut unpacked_roots = BTreeSet::new();
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::extraction(name, e))?;

        let entry_path = entry
            .path()
            .map_err(|e| Error::extraction(name, e))?
            .into_owned();
        if let Some(first) = entry_path.components().next() {
            unpacked_roots.insert(PathBuf::from(first.as_os_str()));
        }
        if entry.header().entry_type().is_file() {
            debug!(repo = name, path = %entry_path.display(), "unpacking");
        }

        entry
            .unpack_in(dest)
            .map_err(|e| Error::extraction(name, e))?;
    }

    Ok(unpacked_roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::current_version;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    /// Build a gzipped tarball with one version directory containing the
    /// given files, mirroring the shape of a GitHub tarball.
    fn make_tarball(version: &str, files: &[(&str, &str)]) -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(gz);

        for (path, contents) in files {
            let full = format!("{}/{}", version, path);
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, full, contents.as_bytes())
                .unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_ensure_root_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path().join("snapshots"));
        store.ensure_root().unwrap();
        store.ensure_root().unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_extract_and_list_versions() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path());

        let tarball = make_tarball("org-repo-abc123", &[("article.md", "# Hi"), ("article.json", "{}")]);
        store.extract("repo", &tarball).unwrap();

        let versions = store.list_versions("repo").unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].path.ends_with("org-repo-abc123"));
        assert!(versions[0].path.join("article.md").is_file());
    }

    #[test]
    fn test_extract_failure_leaves_no_version() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path());

        let err = store.extract("repo", b"not a tarball").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));

        let versions = store.list_versions("repo").unwrap();
        assert!(versions.is_empty());

        // Staging residue is cleaned up too.
        let leftovers = std::fs::read_dir(tmp.path().join("repo")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_staging_dirs_are_never_listed_as_versions() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path());

        store
            .extract("repo", &make_tarball("org-repo-done", &[("article.md", "# Hi")]))
            .unwrap();

        // An extraction still writing (or abandoned past its deadline)
        // lives in a hidden staging directory under the repo.
        let staging = tmp.path().join("repo").join(".staging-inflight");
        std::fs::create_dir_all(staging.join("org-repo-partial")).unwrap();
        std::fs::write(staging.join("org-repo-partial").join("article.md"), "half").unwrap();

        let versions = store.list_versions("repo").unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].path.ends_with("org-repo-done"));
        assert!(current_version(&versions).unwrap().path.ends_with("org-repo-done"));
    }

    #[test]
    fn test_list_versions_missing_repo_is_fs_error() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path());
        let err = store.list_versions("never-ingested").unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn test_newest_extraction_becomes_current() {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(tmp.path());

        store
            .extract("repo", &make_tarball("org-repo-old", &[("article.md", "old")]))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        store
            .extract("repo", &make_tarball("org-repo-new", &[("article.md", "new")]))
            .unwrap();

        let versions = store.list_versions("repo").unwrap();
        assert_eq!(versions.len(), 2);
        let current = current_version(&versions).unwrap();
        assert!(current.path.ends_with("org-repo-new"));
    }
}
