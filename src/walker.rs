//! Mirrors a remote folder tree onto a local directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

use crate::batch::{BatchDownloader, BatchResult, FailedFile};
use crate::client::{build_http_client, ShareClient};
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::fetcher::ResumableFetcher;
use crate::models::{sanitize_filename, DownloadTask, EntryKind, RemoteEntry};
use crate::progress::ProgressDisplay;
use crate::url_parser::parse_share_link;

/// What a mirror run did.
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    /// Local directory the tree was mirrored into.
    pub destination: PathBuf,
    pub folders_visited: usize,
    pub empty_folders: usize,
    pub files_total: usize,
    pub files_succeeded: usize,
    pub failed_files: Vec<FailedFile>,
    /// Local directories that could not be created; their subtrees were skipped.
    pub failed_folders: Vec<PathBuf>,
    /// Folder ids met a second time and not descended into again.
    pub skipped_cycles: usize,
}

impl MirrorReport {
    fn record_batch(&mut self, batch: BatchResult) {
        self.files_total += batch.total_count;
        self.files_succeeded += batch.success_count;
        self.failed_files.extend(batch.failures);
    }

    pub fn files_failed(&self) -> usize {
        self.files_total - self.files_succeeded
    }

    /// Every listed file arrived and every folder was created.
    pub fn is_complete(&self) -> bool {
        self.files_failed() == 0 && self.failed_folders.is_empty()
    }
}

/// Walks a shared tree depth-first, downloading each folder's files before
/// descending into its sub-folders.
#[derive(Clone)]
pub struct TreeWalker {
    client: ShareClient,
    batch: BatchDownloader,
}

impl TreeWalker {
    /// Wire up a client, fetcher and batch downloader sharing one connection pool.
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        Self::with_progress(config, ProgressDisplay::new(config.show_progress))
    }

    /// Like [`TreeWalker::new`], drawing bars on an existing display.
    pub fn with_progress(config: &MirrorConfig, progress: ProgressDisplay) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(config)?;
        let client = ShareClient::with_http(http.clone(), config);
        let fetcher = ResumableFetcher::new(http, config, progress.clone());
        let batch = BatchDownloader::new(client.clone(), fetcher, config, progress);
        Ok(Self::from_parts(client, batch))
    }

    pub fn from_parts(client: ShareClient, batch: BatchDownloader) -> Self {
        Self { client, batch }
    }

    /// Mirror the share behind `share_url` into `output_root/<share name>`.
    ///
    /// Fails only when the link is invalid, the share metadata cannot be
    /// fetched, or the destination root cannot be created. Individual file
    /// failures are reported in the returned [`MirrorReport`].
    pub async fn process_share(&self, share_url: &str, output_root: &Path) -> Result<MirrorReport> {
        let share = parse_share_link(share_url)?;
        info!(share_id = %share.share_id, "Fetching share info");

        let share_info = self.client.get_share_info(&share.share_id).await?;
        let destination = output_root.join(sanitize_filename(share_info.display_name()));
        fs::create_dir_all(&destination).await?;
        info!(
            share = share_info.display_name(),
            destination = %destination.display(),
            "Mirroring share"
        );

        let report = self
            .download_folder(&share.share_id, &share.root_file_id, &destination)
            .await;

        info!(
            folders = report.folders_visited,
            files = report.files_total,
            succeeded = report.files_succeeded,
            failed = report.files_failed(),
            "All files saved to {}",
            report.destination.display()
        );
        Ok(report)
    }

    /// Mirror the folder `folder_id` and everything below it into `local_dir`.
    ///
    /// Sub-folders are visited one at a time, in listing order, each fully
    /// finished before the next sibling starts.
    pub async fn download_folder(
        &self,
        share_id: &str,
        folder_id: &str,
        local_dir: &Path,
    ) -> MirrorReport {
        let mut report = MirrorReport {
            destination: local_dir.to_path_buf(),
            ..Default::default()
        };
        let mut visited = HashSet::new();
        let mut pending = vec![(folder_id.to_string(), local_dir.to_path_buf())];

        while let Some((folder_id, dir)) = pending.pop() {
            if !visited.insert(folder_id.clone()) {
                warn!(folder_id = %folder_id, path = %dir.display(), "Folder already visited, skipping");
                report.skipped_cycles += 1;
                continue;
            }

            if let Err(e) = fs::create_dir_all(&dir).await {
                error!(path = %dir.display(), "Failed to create folder: {}", e);
                report.failed_folders.push(dir);
                continue;
            }
            report.folders_visited += 1;

            let entries = self.client.list_children(share_id, &folder_id).await;
            if entries.is_empty() {
                info!(path = %dir.display(), "Folder has no content");
                report.empty_folders += 1;
                continue;
            }

            let (tasks, subfolders) = plan_folder(&dir, entries);

            if !tasks.is_empty() {
                let batch = self.batch.download_all(share_id, tasks).await;
                report.record_batch(batch);
            }

            pending.extend(subfolders.into_iter().rev());
        }

        report
    }
}

/// Split a listing into file tasks and `(folder id, local dir)` pairs,
/// both in listing order, giving each entry a distinct local name.
fn plan_folder(dir: &Path, entries: Vec<RemoteEntry>) -> (Vec<DownloadTask>, Vec<(String, PathBuf)>) {
    let mut names = LocalNames::default();
    let mut tasks = Vec::new();
    let mut subfolders = Vec::new();

    for entry in entries {
        match entry.kind {
            EntryKind::File => {
                let local_path = dir.join(names.claim(&entry.name));
                tasks.push(DownloadTask { entry, local_path });
            }
            EntryKind::Folder => {
                let local_dir = dir.join(names.claim(&entry.name));
                subfolders.push((entry.id, local_dir));
            }
            EntryKind::Other => {
                warn!(id = %entry.id, "Skipping entry of unknown kind: {}", entry.name);
            }
        }
    }

    (tasks, subfolders)
}

/// Hands out sanitized names, unique within one folder.
#[derive(Default)]
struct LocalNames {
    taken: HashSet<String>,
}

impl LocalNames {
    fn claim(&mut self, remote_name: &str) -> String {
        let name = sanitize_filename(remote_name);
        if self.taken.insert(name.to_lowercase()) {
            return name;
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
            _ => (name.as_str(), String::new()),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{} ({}){}", stem, n, ext);
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}
