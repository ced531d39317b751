//! PikPak share API client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::models::{ApiErrorResponse, DownloadUrlResponse, FileListResponse, RemoteEntry, ShareInfo};

/// Client for the public share endpoints of the drive API.
#[derive(Debug, Clone)]
pub struct ShareClient {
    http: Client,
    api_base: String,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
    page_size: u32,
}

impl ShareClient {
    /// Create a new ShareClient with its own HTTP connection pool.
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        Ok(Self::with_http(build_http_client(config)?, config))
    }

    /// Create a ShareClient on top of an existing HTTP client.
    pub fn with_http(http: Client, config: &MirrorConfig) -> Self {
        Self {
            http,
            api_base: config.api_base().to_string(),
            timeout: config.timeout,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay,
            page_size: config.page_size,
        }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch a share's metadata.
    ///
    /// Transport faults are retried; a body that cannot be decoded is not.
    pub async fn get_share_info(&self, share_id: &str) -> Result<ShareInfo> {
        let url = format!("{}/share/{}", self.api_base, share_id);
        let body = self
            .fetch_text_with_retry("share info", || self.http.get(&url))
            .await?;
        parse_json(&body)
    }

    /// List every child of a folder, following page cursors to the end.
    ///
    /// A page that fails ends the listing early: the entries gathered so far
    /// are returned and the failure is logged.
    pub async fn list_children(&self, share_id: &str, folder_id: &str) -> Vec<RemoteEntry> {
        let url = format!("{}/share/{}/files", self.api_base, share_id);
        let page_size = self.page_size.to_string();
        let mut entries = Vec::new();
        let mut cursor = String::new();
        let mut page = 0usize;

        loop {
            let request = self.http.get(&url).query(&[
                ("parent_id", folder_id),
                ("page_token", cursor.as_str()),
                ("page_size", page_size.as_str()),
                ("with_audit", "true"),
                ("thumbnail_size", "SIZE_MEDIUM"),
            ]);

            let listing = match self.fetch_text(request).await {
                Ok(body) => parse_json::<FileListResponse>(&body),
                Err(e) => Err(e),
            };

            let listing = match listing {
                Ok(listing) => listing,
                Err(e) => {
                    error!(
                        folder_id,
                        page = page + 1,
                        kept = entries.len(),
                        "Failed to list folder: {}",
                        e
                    );
                    break;
                }
            };

            page += 1;
            debug!(folder_id, page, count = listing.files.len(), "Fetched listing page");

            let next = listing.next_cursor().map(str::to_owned);
            entries.extend(listing.files);

            match next {
                Some(next) if next == cursor => {
                    warn!(folder_id, page, "Listing cursor did not advance, stopping");
                    break;
                }
                Some(next) => cursor = next,
                None => break,
            }
        }

        info!(folder_id, pages = page, entries = entries.len(), "Listed folder");
        entries
    }

    /// Resolve a short-lived direct download URL for a file.
    pub async fn get_download_url(&self, share_id: &str, file_id: &str) -> Result<String> {
        let url = format!("{}/share/{}/download", self.api_base, share_id);
        let body = self
            .fetch_text_with_retry("download url", || {
                self.http.get(&url).query(&[("file_id", file_id)])
            })
            .await?;
        let response: DownloadUrlResponse = parse_json(&body)?;
        if response.download_url.is_empty() {
            return Err(MirrorError::MalformedResponse(format!(
                "empty download_url for file {}",
                file_id
            )));
        }
        Ok(response.download_url)
    }

    /// Send a request built by `build`, retrying transient failures with a
    /// fixed delay until the attempt budget runs out.
    async fn fetch_text_with_retry<F>(&self, what: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            match self.fetch_text(build()).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.retry_attempts,
                        "Fetching {} failed, retrying: {}",
                        what,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a single request and return its body, mapping non-2xx to ApiError.
    async fn fetch_text(&self, request: RequestBuilder) -> Result<String> {
        let response = request.timeout(self.timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.message().map(str::to_owned))
                .unwrap_or(error_body);
            return Err(MirrorError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

/// Build the HTTP client shared by API calls and file transfers.
///
/// Only connect and idle-read timeouts are set here, so long transfers are not
/// cut off; API calls add a whole-request timeout per request.
pub fn build_http_client(config: &MirrorConfig) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.timeout)
        .read_timeout(config.timeout)
        .build()?)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| MirrorError::MalformedResponse(e.to_string()))
}
