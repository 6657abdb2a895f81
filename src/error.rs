//! Error types for the ingestion and aggregation pipeline.
//!
//! Every fallible pipeline operation returns one of these kinds. Loader
//! errors (`Parse`, `Render`, file-scoped `Filesystem`) are scoped to the
//! offending file; store and listing errors abort only the affected
//! repository's ingestion cycle, never the whole batch.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Pipeline error kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// Org listing or tarball fetch failed.
    #[error("network request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// A stat/mkdir/readdir/read operation failed.
    #[error("filesystem operation on {path} failed: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive decompression or unpacking failed.
    #[error("extracting snapshot of '{repo}' failed: {source}")]
    Extraction {
        repo: String,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file contained malformed JSON.
    #[error("parsing metadata {path} failed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// View composition received malformed data.
    #[error("render failed: {0}")]
    Render(String),

    /// A bounded network or extraction task exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn extraction(repo: impl Into<String>, source: std::io::Error) -> Self {
        Error::Extraction {
            repo: repo.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
