//! Main orchestration logic for a chunked download.

use crate::download::fetch_chunk;
use crate::error::DownloadError;
use crate::merge::{append_ordered, create_empty};
use crate::metadata::{check_range_support, probe_size};
use crate::plan::plan_chunks;
use crate::types::{
    ChunkResult, DownloadConfig, DownloadPlan, DownloadStage, DownloadSummary, Target,
};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Downloads the covered prefix of `target` into a single local file.
///
/// This is the main entry point. It performs the following steps:
///
/// 1. Resolves the destination and refuses to clobber it unless `overwrite` is set
/// 2. Discovers the remote size and checks that byte ranges are honoured
/// 3. Plans the chunk windows
/// 4. Fetches every chunk on a pool of `parallelism` workers
/// 5. Writes the payloads to the destination in offset order
///
/// Nothing is written unless every chunk was fetched successfully.
///
/// # Arguments
///
/// * `target` - The remote file
/// * `config` - Download configuration
///
/// # Returns
///
/// The destination path and byte count on success, or the first error.
///
/// # Example
///
/// ```no_run
/// use mget::{download, DownloadConfig, Target};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let target = Target::parse("http://example.com/big.iso")?;
/// let summary = download(&target, &DownloadConfig::default()).await?;
/// println!("wrote {} bytes to {}", summary.bytes_written, summary.path.display());
/// # Ok(())
/// # }
/// ```
pub async fn download(
    target: &Target,
    config: &DownloadConfig,
) -> Result<DownloadSummary, DownloadError> {
    let mut stage = StageTracker::new();

    let result = run(target, config, &mut stage).await;
    match &result {
        Ok(summary) => {
            stage.advance(DownloadStage::Done);
            info!(
                "Wrote {} bytes from {} chunk(s) to {}",
                summary.bytes_written,
                summary.chunks,
                summary.path.display()
            );
        }
        Err(DownloadError::RangeUnsupported) => {
            stage.advance(DownloadStage::Aborted);
            error!("Download aborted: {}", target.url());
        }
        Err(e) => {
            stage.advance(DownloadStage::Failed);
            error!("Download failed: {}", e);
        }
    }
    result
}

async fn run(
    target: &Target,
    config: &DownloadConfig,
    stage: &mut StageTracker,
) -> Result<DownloadSummary, DownloadError> {
    config.validate()?;

    let path = resolve_destination(target, config)?;
    let exists = tokio::fs::try_exists(&path)
        .await
        .map_err(|e| DownloadError::write(&path, e))?;
    if exists && !config.overwrite {
        return Err(DownloadError::DestinationExists(path));
    }

    stage.advance(DownloadStage::Probing);
    let file_size = probe_size(target, config.timeout).await?;
    // An empty file plans no ranges, and servers answer any range on it with 416.
    if file_size == 0 {
        debug!("Skipping range check for empty file {}", target.url());
    } else if !check_range_support(target, config.timeout).await? {
        return Err(DownloadError::RangeUnsupported);
    }

    stage.advance(DownloadStage::Planning);
    let plan = plan_chunks(file_size, config.chunk_size, config.max_chunks)?;
    info!(
        "Downloading {} of {} bytes in {} chunk(s) with {} worker(s)",
        plan.covered_len(),
        plan.file_size,
        plan.chunks.len(),
        config.parallelism
    );

    stage.advance(DownloadStage::Fetching);
    let results = fetch_all(target, &plan, config).await?;

    stage.advance(DownloadStage::Assembling);
    let payloads = into_ordered_payloads(results);
    create_empty(&path).await?;
    let bytes_written = append_ordered(&path, payloads).await?;

    Ok(DownloadSummary {
        path,
        bytes_written,
        chunks: plan.chunks.len(),
        file_size: plan.file_size,
    })
}

/// Explicit output path, else the last segment of the URL path.
fn resolve_destination(
    target: &Target,
    config: &DownloadConfig,
) -> Result<PathBuf, DownloadError> {
    if let Some(output) = &config.output {
        return Ok(output.clone());
    }
    target.file_name().map(PathBuf::from).ok_or_else(|| {
        DownloadError::Parameter(format!(
            "cannot derive a file name from {}; pass an output path",
            target.url()
        ))
    })
}

/// Fetches every planned chunk on a bounded worker pool.
///
/// All dispatched fetches run to completion before an error is reported;
/// the first failure to complete is the one returned.
async fn fetch_all(
    target: &Target,
    plan: &DownloadPlan,
    config: &DownloadConfig,
) -> Result<Vec<ChunkResult>, DownloadError> {
    let pb = progress_bar(plan, config);
    let semaphore = Arc::new(Semaphore::new(config.parallelism));
    let mut in_flight = FuturesUnordered::new();

    for spec in plan.chunks.iter().copied() {
        let semaphore = Arc::clone(&semaphore);
        let target = target.clone();
        let timeout = config.timeout;
        let pb = pb.clone();

        in_flight.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| DownloadError::Fetch {
                    start: spec.start,
                    end: spec.end,
                    reason: "worker pool closed".to_string(),
                })?;

            let result = fetch_chunk(&target, &spec, timeout).await;
            pb.inc(1);
            result
        }));
    }

    let mut results = Vec::with_capacity(plan.chunks.len());
    let mut first_error = None;

    while let Some(joined) = in_flight.next().await {
        match joined {
            Ok(Ok(chunk)) => results.push(chunk),
            Ok(Err(e)) => {
                pb.suspend(|| warn!("{}", e));
                first_error.get_or_insert(e);
            }
            Err(e) => {
                pb.suspend(|| warn!("Fetch task join error: {}", e));
                first_error.get_or_insert(DownloadError::TaskJoin(e));
            }
        }
    }

    if let Some(e) = first_error {
        pb.abandon_with_message("Download failed");
        return Err(e);
    }

    pb.finish_with_message("done");
    Ok(results)
}

/// Sorts chunk results by offset and releases their payloads.
pub(crate) fn into_ordered_payloads(mut results: Vec<ChunkResult>) -> Vec<Vec<u8>> {
    results.sort_by_key(|chunk| chunk.key);
    results.into_iter().map(|chunk| chunk.payload).collect()
}

fn progress_bar(plan: &DownloadPlan, config: &DownloadConfig) -> indicatif::ProgressBar {
    if !config.show_progress {
        return indicatif::ProgressBar::hidden();
    }

    let pb = indicatif::ProgressBar::new(plan.chunks.len() as u64);
    if let Ok(style) = indicatif::ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} chunks {msg} | {elapsed_precise}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Records stage transitions of a single download.
struct StageTracker {
    current: DownloadStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: DownloadStage::Idle,
        }
    }

    fn advance(&mut self, next: DownloadStage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid stage transition {:?} -> {:?}",
            self.current,
            next
        );
        debug!("Stage {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}
