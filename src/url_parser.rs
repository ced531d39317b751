//! Share link parser for extracting PikPak share and file IDs.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

use crate::error::{MirrorError, Result};

/// Hosts serving share links: `mypikpak.com` and any of its subdomains.
static SHARE_HOST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9-]+\.)*mypikpak\.com$").expect("Invalid share host regex")
});

/// Identity of a shared tree, decoded from its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReference {
    pub share_id: String,
    pub root_file_id: String,
}

/// Parse a share link of the form `https://mypikpak.com/s/<share_id>/<file_id>`.
///
/// Query strings, fragments and any path segments after the file ID are
/// ignored. No network access is performed.
///
/// # Examples
///
/// ```
/// use share_mirror::url_parser::parse_share_link;
///
/// let share = parse_share_link("https://mypikpak.com/s/VOabc123/VOdef456").unwrap();
/// assert_eq!(share.share_id, "VOabc123");
/// assert_eq!(share.root_file_id, "VOdef456");
/// ```
pub fn parse_share_link(share_url: &str) -> Result<ShareReference> {
    let trimmed = share_url.trim();
    if trimmed.is_empty() {
        return Err(MirrorError::InvalidLink("share link is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| MirrorError::InvalidLink(format!("{}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(MirrorError::InvalidLink(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            trimmed
        )));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !SHARE_HOST_REGEX.is_match(&host) {
        return Err(MirrorError::InvalidLink(format!(
            "'{}' is not a PikPak share host",
            host
        )));
    }

    let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
    if segments.len() < 3 || segments[0] != "s" {
        return Err(MirrorError::InvalidLink(format!(
            "expected /s/<share_id>/<file_id>, got {}",
            url.path()
        )));
    }

    let (share_id, file_id) = (segments[1], segments[2]);
    if share_id.is_empty() || file_id.is_empty() {
        return Err(MirrorError::InvalidLink(format!(
            "empty share or file id in {}",
            url.path()
        )));
    }

    Ok(ShareReference {
        share_id: share_id.to_string(),
        root_file_id: file_id.to_string(),
    })
}
