//! Error types for ranged download operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while downloading a file in chunks.
///
/// Every variant is terminal for the whole download: nothing is retried and
/// there is no fallback to a single-stream transfer.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Invalid URL or configuration value.
    #[error("Invalid parameter: {0}")]
    Parameter(String),

    /// Destination file is already present and overwriting was not requested.
    #[error("{} already exists", .0.display())]
    DestinationExists(PathBuf),

    /// The remote file size could not be determined.
    #[error("File size unavailable for {url}: {reason}")]
    SizeUnavailable { url: String, reason: String },

    /// The server ignored the byte-range probe.
    #[error("Server does not support Range header")]
    RangeUnsupported,

    /// Chunk planning was asked for a zero chunk size or chunk count.
    #[error("Invalid plan parameters: chunk_size={chunk_size}, max_chunks={max_chunks}")]
    InvalidPlanParameters { chunk_size: u64, max_chunks: u64 },

    /// A single chunk could not be fetched.
    #[error("Failed to fetch bytes {start}-{end}: {reason}")]
    Fetch { start: u64, end: u64, reason: String },

    /// Writing the destination file failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// HTTP request error during size discovery or the range probe.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A fetch worker panicked or was cancelled.
    #[error("Fetch task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl DownloadError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::Write {
            path: path.into(),
            source,
        }
    }
}
