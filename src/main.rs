use anyhow::Context;
use clap::Parser;
use mget::{download, DownloadConfig, Target, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mget")]
#[command(about = "Download a file in parts over HTTP", long_about = None)]
#[command(version)]
struct Args {
    /// URL of the file to download
    url: String,

    /// Write file contents to this path instead of the file's remote name
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chunk size in bytes
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,

    /// Number of chunks to download
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNKS, value_parser = clap::value_parser!(u64).range(1..))]
    max_chunks: u64,

    /// Number of concurrent connections
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    parallelism: u32,

    /// Force writing the file even if it exists
    #[arg(short, long)]
    force: bool,

    /// Per-request timeout (e.g. "30s", "2m"); no timeout by default
    #[arg(short, long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not draw a progress bar
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("mget={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// The bar shares stderr with the logs, so verbose runs go without it.
fn wants_progress(args: &Args, stderr_is_terminal: bool) -> bool {
    stderr_is_terminal && !args.quiet && !args.verbose
}

async fn run(args: Args) -> anyhow::Result<()> {
    let target = Target::parse(&args.url)?;
    let show_progress = wants_progress(&args, atty::is(atty::Stream::Stderr));

    let config = DownloadConfig {
        chunk_size: args.chunk_size,
        max_chunks: args.max_chunks,
        parallelism: args.parallelism as usize,
        output: args.output,
        overwrite: args.force,
        timeout: args.timeout,
        show_progress,
    };

    info!("🚀 mget {}", target.url());
    let started = Instant::now();

    let summary = download(&target, &config)
        .await
        .with_context(|| format!("downloading {}", target.url()))?;

    let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
    info!(
        "✅ Done: {} ({} bytes) in {}",
        summary.path.display(),
        summary.bytes_written,
        humantime::format_duration(elapsed)
    );
    Ok(())
}
