//! Writing ordered chunk payloads to the destination file.

use crate::error::DownloadError;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Creates `path`, or truncates it to zero length if it exists.
///
/// Runs before any payload is appended so that an empty remote file still
/// produces an (empty) destination file.
pub async fn create_empty(path: &Path) -> Result<(), DownloadError> {
    tokio::fs::File::create(path)
        .await
        .map_err(|e| DownloadError::write(path, e))?;
    Ok(())
}

/// Appends each payload to `path` in the order given.
///
/// # Arguments
///
/// * `path` - Destination file, normally just created by [`create_empty`]
/// * `payloads` - Chunk payloads sorted by offset
///
/// # Returns
///
/// The number of bytes appended. A failure part-way through can leave a
/// truncated file behind.
pub async fn append_ordered<I>(path: &Path, payloads: I) -> Result<u64, DownloadError>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0u64;
    for payload in payloads {
        writer
            .write_all(&payload)
            .await
            .map_err(|e| DownloadError::write(path, e))?;
        written += payload.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::write(path, e))?;

    Ok(written)
}
