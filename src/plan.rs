//! Chunk planning.

use crate::error::DownloadError;
use crate::types::{ChunkSpec, DownloadPlan};

/// Splits the first `min(file_size, chunk_size * max_chunks)` bytes into
/// consecutive windows of `chunk_size` bytes.
///
/// The last window is truncated to end at `file_size - 1`. An empty file
/// yields an empty plan.
///
/// # Example
///
/// ```
/// use mget::plan_chunks;
///
/// let plan = plan_chunks(3_000_000, 1_048_576, 4).unwrap();
/// let windows: Vec<_> = plan.chunks.iter().map(|c| (c.start, c.end)).collect();
/// assert_eq!(
///     windows,
///     vec![(0, 1_048_575), (1_048_576, 2_097_151), (2_097_152, 2_999_999)]
/// );
/// ```
pub fn plan_chunks(
    file_size: u64,
    chunk_size: u64,
    max_chunks: u64,
) -> Result<DownloadPlan, DownloadError> {
    if chunk_size == 0 || max_chunks == 0 {
        return Err(DownloadError::InvalidPlanParameters {
            chunk_size,
            max_chunks,
        });
    }

    let covered = file_size.min(chunk_size.saturating_mul(max_chunks));

    let chunks = (0..max_chunks)
        .map_while(|i| i.checked_mul(chunk_size))
        .take_while(|&start| start < covered)
        .enumerate()
        .map(|(index, start)| ChunkSpec {
            index,
            start,
            end: start.saturating_add(chunk_size - 1).min(file_size - 1),
        })
        .collect();

    Ok(DownloadPlan { file_size, chunks })
}
