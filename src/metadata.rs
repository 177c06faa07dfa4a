//! Remote file metadata: size discovery and range support.

use crate::client::private_client;
use crate::error::DownloadError;
use crate::types::Target;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, RANGE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Range sent by the capability probe: the first byte only.
pub(crate) const RANGE_PROBE: &str = "bytes=0-0";

/// Reads a numeric `Content-Length` header.
pub(crate) fn parse_content_length(headers: &HeaderMap) -> Result<u64, String> {
    let value = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| "response has no Content-Length header".to_string())?;

    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| format!("Content-Length {:?} is not a number", value))
}

/// Discovers the remote file size with a HEAD request.
///
/// # Arguments
///
/// * `target` - The remote file
/// * `timeout` - Optional request timeout
///
/// # Returns
///
/// The declared size in bytes, or `SizeUnavailable` when the status is not
/// 200 or the length header is missing or malformed.
pub async fn probe_size(target: &Target, timeout: Option<Duration>) -> Result<u64, DownloadError> {
    let client = private_client(timeout)?;
    info!("Retrieving size of {}", target.url());

    let response = client.head(target.url().clone()).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(DownloadError::SizeUnavailable {
            url: target.url().to_string(),
            reason: format!("HEAD returned HTTP {}", status),
        });
    }

    let size = parse_content_length(response.headers()).map_err(|reason| {
        DownloadError::SizeUnavailable {
            url: target.url().to_string(),
            reason,
        }
    })?;

    info!("Remote file is {} bytes", size);
    Ok(size)
}

/// Checks whether the server honours byte-range requests.
///
/// Sends a GET for the first byte. Only `206 Partial Content` counts as
/// support; a `200` means the server ignored the range and would send the
/// whole body.
pub async fn check_range_support(
    target: &Target,
    timeout: Option<Duration>,
) -> Result<bool, DownloadError> {
    let client = private_client(timeout)?;

    // The body is not read; dropping the response closes the connection.
    let response = client
        .get(target.url().clone())
        .header(RANGE, RANGE_PROBE)
        .send()
        .await?;

    let status = response.status();
    debug!("Range probe for {} returned {}", target.url(), status);
    Ok(status == StatusCode::PARTIAL_CONTENT)
}
