//! Bounded-concurrency download of the files of one folder.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::client::ShareClient;
use crate::config::MirrorConfig;
use crate::fetcher::{FetchOutcome, ResumableFetcher};
use crate::models::{format_size, DownloadTask};
use crate::progress::ProgressDisplay;

/// A file that could not be downloaded, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub name: String,
    pub reason: String,
}

/// Aggregate result of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub success_count: usize,
    pub total_count: usize,
    pub failures: Vec<FailedFile>,
}

impl BatchResult {
    pub fn failed_count(&self) -> usize {
        self.total_count - self.success_count
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_count == self.total_count
    }
}

/// Downloads sibling files with at most `max_workers` transfers in flight.
///
/// A failing file never cancels its siblings.
#[derive(Clone)]
pub struct BatchDownloader {
    client: ShareClient,
    fetcher: ResumableFetcher,
    max_workers: usize,
    progress: ProgressDisplay,
}

impl BatchDownloader {
    pub fn new(
        client: ShareClient,
        fetcher: ResumableFetcher,
        config: &MirrorConfig,
        progress: ProgressDisplay,
    ) -> Self {
        Self {
            client,
            fetcher,
            max_workers: config.max_workers.max(1),
            progress,
        }
    }

    /// Download every task, returning how many succeeded.
    ///
    /// Each worker resolves its own download URL right before transferring,
    /// so no more than `max_workers` short-lived URLs are outstanding.
    pub async fn download_all(&self, share_id: &str, tasks: Vec<DownloadTask>) -> BatchResult {
        let total_count = tasks.len();
        if total_count == 0 {
            return BatchResult::default();
        }

        let label = tasks[0]
            .local_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let batch_bar = self.progress.batch_bar(total_count, &label);
        let succeeded = AtomicUsize::new(0);

        let results: Vec<Option<FailedFile>> = stream::iter(tasks)
            .map(|task| {
                let succeeded = &succeeded;
                let batch_bar = &batch_bar;
                async move {
                    let outcome = self.run_task(share_id, &task).await;
                    batch_bar.inc(1);
                    match outcome {
                        FetchOutcome::Downloaded { bytes, resumed_from } => {
                            succeeded.fetch_add(1, Ordering::SeqCst);
                            info!(
                                file = %task.local_path.display(),
                                resumed_from,
                                "Downloaded {} ({})",
                                task.entry.name,
                                format_size(resumed_from + bytes)
                            );
                            None
                        }
                        FetchOutcome::AlreadyComplete => {
                            succeeded.fetch_add(1, Ordering::SeqCst);
                            info!(file = %task.local_path.display(), "Already downloaded: {}", task.entry.name);
                            None
                        }
                        FetchOutcome::Failed(reason) => {
                            error!(file = %task.local_path.display(), "Download failed: {}: {}", task.entry.name, reason);
                            Some(FailedFile {
                                name: task.entry.name.clone(),
                                reason,
                            })
                        }
                    }
                }
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        self.progress.finish(batch_bar);

        let result = BatchResult {
            success_count: succeeded.load(Ordering::SeqCst),
            total_count,
            failures: results.into_iter().flatten().collect(),
        };
        info!(
            success = result.success_count,
            total = result.total_count,
            "Batch finished: {}/{} files downloaded",
            result.success_count,
            result.total_count
        );
        result
    }

    async fn run_task(&self, share_id: &str, task: &DownloadTask) -> FetchOutcome {
        let known_size = task.entry.known_size();
        info!(
            file = %task.local_path.display(),
            size = %known_size.map(format_size).unwrap_or_else(|| "unknown".to_string()),
            "Starting download: {}",
            task.entry.name
        );

        if let Some(size) = known_size {
            if self.fetcher.is_complete(&task.local_path, size).await {
                return FetchOutcome::AlreadyComplete;
            }
        }

        let url = match self.client.get_download_url(share_id, &task.entry.id).await {
            Ok(url) => url,
            Err(e) => return FetchOutcome::Failed(format!("resolving download url: {}", e)),
        };

        self.fetcher.fetch(&url, &task.local_path, known_size).await
    }
}
