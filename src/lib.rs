//! share_mirror - Mirror a PikPak share link into a local directory.
//!
//! This library provides functionality to:
//! - Parse share links into share and root file IDs
//! - List shared folders page by page and resolve download URLs
//! - Download files with byte-range resume and bounded concurrency
//! - Walk a shared tree and recreate it on disk
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use share_mirror::{MirrorConfig, TreeWalker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MirrorConfig::default();
//!     let walker = TreeWalker::new(&config)?;
//!
//!     let report = walker
//!         .process_share("https://mypikpak.com/s/VOabc123/VOdef456", Path::new("Download"))
//!         .await?;
//!     println!("{}/{} files", report.files_succeeded, report.files_total);
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod progress;
pub mod url_parser;
pub mod walker;

// Re-exports for convenience
pub use batch::{BatchDownloader, BatchResult};
pub use client::ShareClient;
pub use config::MirrorConfig;
pub use error::{MirrorError, Result};
pub use fetcher::{FetchOutcome, ResumableFetcher};
pub use models::{DownloadTask, EntryKind, RemoteEntry};
pub use url_parser::{parse_share_link, ShareReference};
pub use walker::{MirrorReport, TreeWalker};
