//! Runtime configuration for a mirror run.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{MirrorError, Result};

/// Base URL for the PikPak drive API.
pub const DEFAULT_BASE_URL: &str = "https://api-drive.mypikpak.com/v1";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Settings shared by every component of a run.
///
/// Built once at startup and handed to each component's constructor.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Maximum number of files downloading at once.
    pub max_workers: usize,
    /// Per-request timeout for API calls and HEAD probes; idle read timeout for bodies.
    pub timeout: Duration,
    /// Attempts made for share metadata and download URL calls.
    pub retry_attempts: u32,
    /// Fixed pause between two attempts.
    pub retry_delay: Duration,
    /// Largest slice written to disk in one call.
    pub chunk_size: usize,
    /// Entries requested per listing page.
    pub page_size: u32,
    /// Directory under which the share folder is created.
    pub output_dir: PathBuf,
    pub base_url: String,
    pub user_agent: String,
    /// Draw progress bars on the terminal.
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            chunk_size: 8192,
            page_size: 100,
            output_dir: PathBuf::from("Download"),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: true,
        }
    }
}

impl MirrorConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers < 1 {
            return Err(MirrorError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(MirrorError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.retry_attempts < 1 {
            return Err(MirrorError::InvalidConfig(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.chunk_size < 1024 {
            return Err(MirrorError::InvalidConfig(
                "chunk_size must be at least 1024 bytes".to_string(),
            ));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(MirrorError::InvalidConfig(
                "page_size must be between 1 and 1000".to_string(),
            ));
        }
        Url::parse(&self.base_url).map_err(|e| {
            MirrorError::InvalidConfig(format!("base_url '{}': {}", self.base_url, e))
        })?;
        Ok(())
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
