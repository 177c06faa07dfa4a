//! Data structures for ranged download operations.

use crate::error::DownloadError;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Default chunk size in bytes (one mebibyte).
pub const DEFAULT_CHUNK_SIZE: u64 = 1_048_576;
/// Default maximum number of chunks to download.
pub const DEFAULT_MAX_CHUNKS: u64 = 4;
/// Default number of concurrent chunk fetches.
pub const DEFAULT_PARALLELISM: usize = 1;

/// Remote location of the file to download, resolved once from the input URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    /// Parses an `http` or `https` URL with a host.
    ///
    /// # Example
    ///
    /// ```
    /// use mget::Target;
    ///
    /// let target = Target::parse("http://example.com/files/data.bin").unwrap();
    /// assert_eq!(target.host(), "example.com");
    /// assert_eq!(target.path(), "/files/data.bin");
    /// assert_eq!(target.file_name(), Some("data.bin"));
    /// ```
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        let url = Url::parse(input)
            .map_err(|e| DownloadError::Parameter(format!("invalid URL '{}': {}", input, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DownloadError::Parameter(format!(
                    "unsupported URL scheme '{}' (expected http or https)",
                    other
                )))
            }
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(DownloadError::Parameter(format!(
                "URL '{}' has no host",
                input
            )));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Last segment of the URL path, if non-empty.
    pub fn file_name(&self) -> Option<&str> {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
    }
}

/// One contiguous byte window of the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// First byte of the window.
    pub start: u64,
    /// Last byte of the window (inclusive).
    pub end: u64,
}

impl ChunkSpec {
    /// Number of bytes covered by this chunk.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Ordered chunk windows plus the discovered remote size.
///
/// Built once per download after size discovery and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub file_size: u64,
    pub chunks: Vec<ChunkSpec>,
}

impl DownloadPlan {
    /// Length of the prefix `[0, covered_len)` the plan downloads.
    pub fn covered_len(&self) -> u64 {
        self.chunks.last().map_or(0, |chunk| chunk.end + 1)
    }
}

/// Bytes returned by one chunk fetch, keyed by the chunk's starting offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub key: u64,
    pub payload: Vec<u8>,
}

/// Configuration for a single download.
///
/// # Example
///
/// ```
/// use mget::DownloadConfig;
///
/// let config = DownloadConfig {
///     chunk_size: 512 * 1024,
///     parallelism: 8,
///     overwrite: true,
///     ..DownloadConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Bytes per chunk (default: 1 MiB).
    pub chunk_size: u64,
    /// Maximum number of chunks to download (default: 4).
    ///
    /// Bytes beyond `chunk_size * max_chunks` are never fetched.
    pub max_chunks: u64,
    /// Maximum number of chunk fetches in flight (default: 1).
    pub parallelism: usize,
    /// Destination path. Derived from the URL path when unset.
    pub output: Option<PathBuf>,
    /// Replace the destination if it already exists (default: false).
    pub overwrite: bool,
    /// Per-request timeout. No timeout is applied when unset.
    pub timeout: Option<Duration>,
    /// Draw a progress bar counting completed chunks (default: false).
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
            parallelism: DEFAULT_PARALLELISM,
            output: None,
            overwrite: false,
            timeout: None,
            show_progress: false,
        }
    }
}

impl DownloadConfig {
    /// Rejects zero sizes and an empty worker pool.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.chunk_size == 0 {
            return Err(DownloadError::Parameter(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.max_chunks == 0 {
            return Err(DownloadError::Parameter(
                "maximum chunk count must be greater than zero".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(DownloadError::Parameter(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// File that was written.
    pub path: PathBuf,
    /// Bytes written to `path`.
    pub bytes_written: u64,
    /// Number of chunks fetched.
    pub chunks: usize,
    /// Size of the remote file as reported by the server.
    pub file_size: u64,
}

/// Stage of the download state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStage {
    Idle,
    /// Size discovery and range probe
    Probing,
    /// Server cannot serve ranges
    Aborted,
    Planning,
    Fetching,
    /// Writing ordered payloads to disk
    Assembling,
    Done,
    Failed,
}

impl DownloadStage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadStage::Aborted | DownloadStage::Done | DownloadStage::Failed
        )
    }

    /// Whether `next` directly follows `self`. Stages only move forward.
    pub fn can_advance_to(self, next: DownloadStage) -> bool {
        use DownloadStage::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Idle, Probing) => true,
            (Probing, Aborted) | (Probing, Planning) => true,
            (Planning, Fetching) => true,
            (Fetching, Assembling) => true,
            (Assembling, Done) => true,
            _ => false,
        }
    }
}
