//! Shared fixtures for tests running against a mocked share API.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use share_mirror::MirrorConfig;

pub const SHARE_ID: &str = "VOshare";

/// Config pointing at the mock server, with no retry pause and no progress bars.
pub fn test_config(server: &ServerGuard) -> MirrorConfig {
    MirrorConfig {
        base_url: server.url(),
        retry_delay: Duration::ZERO,
        show_progress: false,
        ..MirrorConfig::default()
    }
}

/// Deterministic file content of the given size.
pub fn test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

pub fn file_entry(id: &str, name: &str, size: Option<usize>) -> Value {
    match size {
        Some(size) => json!({"id": id, "name": name, "kind": "drive#file", "size": size.to_string()}),
        None => json!({"id": id, "name": name, "kind": "drive#file"}),
    }
}

pub fn folder_entry(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "kind": "drive#folder"})
}

/// Mock one listing page of `parent_id` requested with cursor `page_token`.
pub async fn mock_listing_page(
    server: &mut ServerGuard,
    parent_id: &str,
    page_token: &str,
    files: Vec<Value>,
    next_page_token: Option<&str>,
) -> Mock {
    let mut body = json!({ "files": files });
    if let Some(next) = next_page_token {
        body["next_page_token"] = json!(next);
    }

    server
        .mock("GET", format!("/share/{}/files", SHARE_ID).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("parent_id".into(), parent_id.into()),
            Matcher::UrlEncoded("page_token".into(), page_token.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

/// Mock a single-page listing of `parent_id`.
pub async fn mock_listing(server: &mut ServerGuard, parent_id: &str, files: Vec<Value>) -> Mock {
    mock_listing_page(server, parent_id, "", files, None).await
}

/// Mock the download URL of `file_id` to point at `/blob/<file_id>` on the same server.
pub async fn mock_download_url(server: &mut ServerGuard, file_id: &str) -> Mock {
    let download_url = format!("{}/blob/{}", server.url(), file_id);
    server
        .mock("GET", format!("/share/{}/download", SHARE_ID).as_str())
        .match_query(Matcher::UrlEncoded("file_id".into(), file_id.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "download_url": download_url }).to_string())
        .create_async()
        .await
}

/// Mock the content behind `/blob/<file_id>`.
pub async fn mock_blob(server: &mut ServerGuard, file_id: &str, content: &[u8]) -> Mock {
    server
        .mock("GET", format!("/blob/{}", file_id).as_str())
        .with_status(200)
        .with_body(content)
        .expect(1)
        .create_async()
        .await
}

pub fn assert_file_content(path: &Path, expected: &[u8]) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
    let actual = fs::read(path).expect("Failed to read file");
    assert_eq!(actual.len(), expected.len(), "File size mismatch at path: {:?}", path);
    assert!(actual == expected, "File content mismatch at path: {:?}", path);
}
