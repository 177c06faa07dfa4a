//! Chunk download functionality.

use crate::client::private_client;
use crate::error::DownloadError;
use crate::types::{ChunkResult, ChunkSpec, Target};
use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Largest buffer reserved before any body bytes arrive.
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

fn initial_capacity(expected: u64) -> usize {
    usize::try_from(expected.min(MAX_PREALLOCATION)).unwrap_or(0)
}

/// Downloads one byte window of the target into memory.
///
/// Each call opens its own connection, which is closed when the call
/// returns on both the success and the error path.
///
/// # Arguments
///
/// * `target` - The remote file
/// * `spec` - The window to fetch
/// * `timeout` - Optional request timeout
///
/// # Returns
///
/// The window's bytes keyed by its start offset. Anything other than a
/// `206` response carrying exactly `spec.len()` bytes is a `Fetch` error.
pub async fn fetch_chunk(
    target: &Target,
    spec: &ChunkSpec,
    timeout: Option<Duration>,
) -> Result<ChunkResult, DownloadError> {
    let fail = |reason: String| DownloadError::Fetch {
        start: spec.start,
        end: spec.end,
        reason,
    };

    let client = private_client(timeout).map_err(|e| fail(e.to_string()))?;

    debug!("Fetching chunk {} ({})", spec.index, spec.range_header());

    let response = client
        .get(target.url().clone())
        .header(RANGE, spec.range_header())
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::PARTIAL_CONTENT {
        return Err(fail(format!("expected HTTP 206, got {}", status)));
    }

    let expected = spec.len();
    let mut payload = Vec::with_capacity(initial_capacity(expected));
    let mut byte_stream = response.bytes_stream();

    while let Some(piece) = byte_stream.next().await {
        let piece = piece.map_err(|e| fail(e.to_string()))?;
        payload.extend_from_slice(&piece);

        if payload.len() as u64 > expected {
            return Err(fail(format!(
                "server sent more than the {} requested bytes",
                expected
            )));
        }
    }

    if payload.len() as u64 != expected {
        return Err(fail(format!(
            "expected {} bytes, got {}",
            expected,
            payload.len()
        )));
    }

    debug!("Chunk {} complete ({} bytes)", spec.index, payload.len());

    Ok(ChunkResult {
        key: spec.start,
        payload,
    })
}
