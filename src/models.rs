//! Data models for the PikPak share API.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Display name used when the share metadata carries none.
pub const DEFAULT_SHARE_NAME: &str = "PikPak_Download";

/// Kind of an entry in a shared tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "drive#file")]
    File,
    #[serde(rename = "drive#folder")]
    Folder,
    #[serde(other)]
    Other,
}

/// A file or folder returned by a listing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Size reported by the listing, treating zero as unknown.
    pub fn known_size(&self) -> Option<u64> {
        self.size.filter(|&s| s > 0)
    }
}

/// The API sends sizes as decimal strings; accept plain numbers as well.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Text(String),
        Number(u64),
    }

    match Option::<RawSize>::deserialize(deserializer)? {
        Some(RawSize::Number(n)) => Ok(Some(n)),
        Some(RawSize::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawSize::Text(s)) => s.trim().parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl std::fmt::Display for RemoteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        let kind = match self.kind {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
            EntryKind::Other => "other",
        };
        write!(f, "{}\t{}\t{}\t{}", self.id, size_str, kind, self.name)
    }
}

/// One file to fetch and the local path it lands on.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub entry: RemoteEntry,
    pub local_path: PathBuf,
}

/// Response from `GET /share/{share_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareInfo {
    #[serde(default)]
    pub share_name: Option<String>,
    #[serde(default)]
    pub share_status: Option<String>,
}

impl ShareInfo {
    /// The share's display name, or [`DEFAULT_SHARE_NAME`] when it has none.
    pub fn display_name(&self) -> &str {
        match self.share_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_SHARE_NAME,
        }
    }
}

/// Response from `GET /share/{share_id}/files`.
#[derive(Debug, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<RemoteEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl FileListResponse {
    /// Cursor for the following page; `None` on the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Response from `GET /share/{share_id}/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadUrlResponse {
    pub download_url: String,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ApiErrorResponse {
    pub fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("Invalid filename regex")
});

const MAX_FILENAME_BYTES: usize = 255;

/// Make a remote name safe to use as a single local path component.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    let cleaned = replaced.trim_matches(|c| c == ' ' || c == '.');

    if cleaned.is_empty() {
        return "unknown_file".to_string();
    }
    if cleaned.len() <= MAX_FILENAME_BYTES {
        return cleaned.to_string();
    }

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_FILENAME_BYTES / 2 => {
            (stem, Some(ext))
        }
        _ => (cleaned, None),
    };
    let budget = ext.map_or(MAX_FILENAME_BYTES, |e| MAX_FILENAME_BYTES - e.len() - 1);
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    match ext {
        Some(ext) => format!("{}.{}", &stem[..cut], ext),
        None => stem[..cut].to_string(),
    }
}
