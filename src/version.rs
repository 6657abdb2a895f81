//! Current-version resolution.
//!
//! A repository may have several extracted snapshot versions on disk. The
//! most recently extracted one is authoritative: `current_version` picks
//! the descriptor with the maximum modification time. An empty version
//! list means the repository is not yet ingested, which is not an error.

use std::path::PathBuf;
use std::time::SystemTime;

/// Descriptor for one extracted version directory.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDir {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Pick the current (newest by mtime) version from the listed descriptors.
/// Ties break toward the first-encountered descriptor.
pub fn current_version(versions: &[VersionDir]) -> Option<&VersionDir> {
    let mut current: Option<&VersionDir> = None;
    for candidate in versions {
        match current {
            Some(best) if best.modified >= candidate.modified => {}
            _ => current = Some(candidate),
        }
    }
    current
}
