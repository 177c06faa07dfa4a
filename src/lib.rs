//! mget - Download a remote file in parallel byte-range chunks
//!
//! This library fetches a single file over HTTP by splitting it into
//! fixed-size byte windows, requesting the windows concurrently with `Range`
//! headers, and reassembling them in offset order into one local file.
//!
//! # Features
//!
//! - **Size Discovery**: HEAD request for the remote `Content-Length`
//! - **Range Probe**: Refuses servers that ignore byte ranges
//! - **Bounded Concurrency**: At most `parallelism` chunk fetches in flight
//! - **Deterministic Output**: Bytes are written strictly by offset, whatever
//!   order the chunks arrive in
//! - **All-or-Nothing Fetch**: No output is written unless every chunk arrived
//!
//! # Example
//!
//! ```no_run
//! use mget::{download, DownloadConfig, Target};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = Target::parse("http://example.com/releases/image.iso")?;
//! let config = DownloadConfig {
//!     parallelism: 4,
//!     ..DownloadConfig::default()
//! };
//!
//! download(&target, &config).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod download;
mod error;
mod merge;
mod metadata;
mod orchestrator;
mod plan;
mod types;

#[cfg(test)]
mod testing;

pub use download::fetch_chunk;
pub use error::DownloadError;
pub use merge::{append_ordered, create_empty};
pub use metadata::{check_range_support, probe_size};
pub use orchestrator::download;
pub use plan::plan_chunks;
pub use types::{
    ChunkResult, ChunkSpec, DownloadConfig, DownloadPlan, DownloadStage, DownloadSummary, Target,
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS, DEFAULT_PARALLELISM,
};
