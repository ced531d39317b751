//! share_mirror CLI - Mirror a PikPak share link to disk.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use share_mirror::config::DEFAULT_BASE_URL;
use share_mirror::logging::init_logging;
use share_mirror::progress::ProgressDisplay;
use share_mirror::{MirrorConfig, TreeWalker};

/// Download every file of a PikPak share, keeping its folder structure.
#[derive(Parser, Debug)]
#[command(name = "share_mirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Share link, e.g. https://mypikpak.com/s/<share_id>/<file_id>.
    share_url: String,

    /// Directory the share folder is created in.
    #[arg(env = "PIKPAK_OUTPUT_DIR", default_value = "Download")]
    output_dir: PathBuf,

    /// Files downloaded at the same time.
    #[arg(long, env = "PIKPAK_MAX_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "PIKPAK_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Attempts for share info and download URL requests.
    #[arg(long, env = "PIKPAK_MAX_RETRIES", default_value_t = 3)]
    retries: u32,

    /// Seconds to wait between attempts.
    #[arg(long, env = "PIKPAK_RETRY_DELAY", default_value_t = 2.0)]
    retry_delay: f64,

    /// Largest write to disk, in bytes.
    #[arg(long, env = "PIKPAK_CHUNK_SIZE", default_value_t = 8192)]
    chunk_size: usize,

    /// Entries requested per listing page.
    #[arg(long, env = "PIKPAK_PAGE_SIZE", default_value_t = 100)]
    page_size: u32,

    /// Drive API base URL.
    #[arg(long, env = "PIKPAK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Log filter, e.g. "info" or "share_mirror=debug".
    #[arg(long, env = "PIKPAK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also append logs to this file.
    #[arg(long, env = "PIKPAK_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Do not draw progress bars.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn to_config(&self) -> Result<MirrorConfig> {
        let retry_delay = Duration::try_from_secs_f64(self.retry_delay)
            .with_context(|| format!("Invalid retry delay: {}", self.retry_delay))?;

        let config = MirrorConfig {
            max_workers: self.workers,
            timeout: Duration::from_secs(self.timeout),
            retry_attempts: self.retries,
            retry_delay,
            chunk_size: self.chunk_size,
            page_size: self.page_size,
            output_dir: self.output_dir.clone(),
            base_url: self.base_url.clone(),
            show_progress: !self.no_progress,
            ..MirrorConfig::default()
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment and flags still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = cli.to_config()?;
    let progress = ProgressDisplay::new(config.show_progress);

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref(), &progress)
        .context("Failed to initialise logging")?;

    let walker =
        TreeWalker::with_progress(&config, progress).context("Failed to create HTTP client")?;

    let report = walker
        .process_share(&cli.share_url, &config.output_dir)
        .await
        .with_context(|| format!("Failed to mirror share: {}", cli.share_url))?;

    println!(
        "Downloaded {}/{} file(s) into {:?}",
        report.files_succeeded,
        report.files_total,
        report.destination
    );
    if !report.failed_files.is_empty() {
        println!("Failed:");
        for failed in &report.failed_files {
            println!("  {}: {}", failed.name, failed.reason);
        }
    }
    for folder in &report.failed_folders {
        println!("Skipped folder (could not create): {:?}", folder);
    }

    Ok(())
}
