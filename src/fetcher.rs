//! Resumable single-file transfer.
//!
//! The only checkpoint is the file itself: whatever bytes are already on disk
//! at the destination are taken as a prefix of the remote content, and the
//! transfer continues from their length with a `Range` request. Partial bytes
//! are left in place on failure so a later run can pick up from them.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::progress::ProgressDisplay;

/// Result of fetching one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Bytes were transferred; `resumed_from` is the offset the transfer started at.
    Downloaded { bytes: u64, resumed_from: u64 },
    /// The local file already held the whole remote content.
    AlreadyComplete,
    /// The transfer failed; partial bytes stay on disk.
    Failed(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, FetchOutcome::Failed(_))
    }
}

/// Downloads one URL to one path, resuming from existing bytes.
#[derive(Clone)]
pub struct ResumableFetcher {
    http: Client,
    timeout: Duration,
    chunk_size: usize,
    progress: ProgressDisplay,
}

impl ResumableFetcher {
    pub fn new(http: Client, config: &MirrorConfig, progress: ProgressDisplay) -> Self {
        Self {
            http,
            timeout: config.timeout,
            chunk_size: config.chunk_size.max(1),
            progress,
        }
    }

    /// Fetch `url` into `local_path`.
    ///
    /// `known_size` is the size reported by the listing, if any; when present
    /// and nonzero it replaces the HEAD probe.
    pub async fn fetch(&self, url: &str, local_path: &Path, known_size: Option<u64>) -> FetchOutcome {
        match self.try_fetch(url, local_path, known_size).await {
            Ok(outcome) => outcome,
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }

    /// Whether `local_path` already holds at least `size` bytes.
    pub async fn is_complete(&self, local_path: &Path, size: u64) -> bool {
        size > 0 && matches!(local_len(local_path).await, Ok(len) if len >= size)
    }

    async fn try_fetch(
        &self,
        url: &str,
        local_path: &Path,
        known_size: Option<u64>,
    ) -> Result<FetchOutcome> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let total_size = match known_size.filter(|&s| s > 0) {
            Some(size) => Some(size),
            None => self.remote_size(url).await?,
        };

        let initial_pos = local_len(local_path).await?;
        if let Some(total) = total_size {
            if initial_pos >= total {
                debug!(path = %local_path.display(), total, "File already complete");
                return Ok(FetchOutcome::AlreadyComplete);
            }
        }

        let mut request = self.http.get(url);
        if initial_pos > 0 {
            request = request.header(RANGE, format!("bytes={}-", initial_pos));
        }
        let response = request.send().await?;
        let status = response.status();

        let resume_from = if initial_pos == 0 {
            if !status.is_success() {
                return Err(status_error(response).await);
            }
            0
        } else {
            match status {
                StatusCode::PARTIAL_CONTENT => initial_pos,
                StatusCode::RANGE_NOT_SATISFIABLE if total_size.is_none() => {
                    debug!(path = %local_path.display(), initial_pos, "Range past end, file already complete");
                    return Ok(FetchOutcome::AlreadyComplete);
                }
                s if s.is_success() => {
                    warn!(
                        path = %local_path.display(),
                        initial_pos,
                        "Server ignored the range request, restarting from zero"
                    );
                    0
                }
                _ => return Err(status_error(response).await),
            }
        };

        let mut file = if resume_from > 0 {
            OpenOptions::new().append(true).open(local_path).await?
        } else {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(local_path)
                .await?
        };

        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let pb = self.progress.file_bar(&name, total_size, resume_from);

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        let streamed = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                for piece in chunk.chunks(self.chunk_size) {
                    file.write_all(piece).await?;
                    written += piece.len() as u64;
                    pb.inc(piece.len() as u64);
                }
            }
            file.flush().await?;
            Ok::<(), MirrorError>(())
        }
        .await;
        self.progress.finish(pb);
        streamed?;

        Ok(FetchOutcome::Downloaded {
            bytes: written,
            resumed_from: resume_from,
        })
    }

    /// Total size from a HEAD probe; `None` when the server does not say.
    ///
    /// Hosts that refuse HEAD leave the size unknown and the GET decides.
    async fn remote_size(&self, url: &str) -> Result<Option<u64>> {
        let response = self.http.head(url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Size probe rejected, size unknown");
            return Ok(None);
        }
        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&len| len > 0))
    }
}

/// Length of the file at `path`, or 0 when there is none.
pub async fn local_len(path: &Path) -> Result<u64> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn status_error(response: Response) -> MirrorError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    MirrorError::ApiError { status, message }
}
