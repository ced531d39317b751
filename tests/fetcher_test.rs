//! Tests for ResumableFetcher against a mocked file host.

use std::fs;

use mockito::{Matcher, Server};
use share_mirror::progress::ProgressDisplay;
use share_mirror::{FetchOutcome, MirrorConfig, ResumableFetcher};
use tempfile::TempDir;

mod common;
use common::helpers::*;

fn fetcher(config: &MirrorConfig) -> ResumableFetcher {
    ResumableFetcher::new(reqwest::Client::new(), config, ProgressDisplay::hidden())
}

mod fresh_download {
    use super::*;

    #[tokio::test]
    async fn writes_whole_body_without_range() {
        let mut server = Server::new_async().await;
        let content = test_content(20_000);
        let mock = server
            .mock("GET", "/blob/f1")
            .match_header("range", Matcher::Missing)
            .with_status(200)
            .with_body(&content)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie.mkv");
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server))
            .fetch(&url, &path, Some(content.len() as u64))
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::Downloaded { bytes: 20_000, resumed_from: 0 }
        );
        assert_file_content(&path, &content);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let mut server = Server::new_async().await;
        mock_blob(&mut server, "f1", b"nested").await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("c.txt");
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, Some(6)).await;

        assert!(outcome.is_success());
        assert_file_content(&path, b"nested");
    }

    #[tokio::test]
    async fn probes_size_with_head_when_unknown() {
        let mut server = Server::new_async().await;
        let content = test_content(3000);
        let head = server
            .mock("HEAD", "/blob/f1")
            .with_status(200)
            .with_body(&content)
            .expect(1)
            .create_async()
            .await;
        mock_blob(&mut server, "f1", &content).await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, None).await;

        assert!(outcome.is_success());
        assert_file_content(&path, &content);
        head.assert_async().await;
    }
}

mod resume {
    use super::*;

    #[tokio::test]
    async fn interrupted_download_resumes_at_exact_offset() {
        let mut server = Server::new_async().await;
        let content = test_content(50_000);
        let interrupted_at = 12_345;
        let mock = server
            .mock("GET", "/blob/f1")
            .match_header("range", format!("bytes={}-", interrupted_at).as_str())
            .with_status(206)
            .with_body(&content[interrupted_at..])
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.iso");
        fs::write(&path, &content[..interrupted_at]).unwrap();
        let url = format!("{}/blob/f1", server.url());

        let config = MirrorConfig {
            chunk_size: 1024,
            ..test_config(&server)
        };
        let outcome = fetcher(&config)
            .fetch(&url, &path, Some(content.len() as u64))
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::Downloaded {
                bytes: (content.len() - interrupted_at) as u64,
                resumed_from: interrupted_at as u64,
            }
        );
        assert_file_content(&path, &content);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_file_makes_no_requests() {
        let mut server = Server::new_async().await;
        let any_get = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let any_head = server
            .mock("HEAD", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("done.txt");
        fs::write(&path, b"0123456789").unwrap();
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, Some(10)).await;

        assert_eq!(outcome, FetchOutcome::AlreadyComplete);
        assert_file_content(&path, b"0123456789");
        any_get.assert_async().await;
        any_head.assert_async().await;
    }

    #[tokio::test]
    async fn ignored_range_restarts_from_zero() {
        let mut server = Server::new_async().await;
        let content = test_content(4096);
        let mock = server
            .mock("GET", "/blob/f1")
            .match_header("range", "bytes=100-")
            .with_status(200)
            .with_body(&content)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.bin");
        fs::write(&path, vec![0xAAu8; 100]).unwrap();
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server))
            .fetch(&url, &path, Some(content.len() as u64))
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::Downloaded { bytes: 4096, resumed_from: 0 }
        );
        assert_file_content(&path, &content);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn range_not_satisfiable_means_complete() {
        let mut server = Server::new_async().await;
        server
            .mock("HEAD", "/blob/f1")
            .with_status(200)
            .create_async()
            .await;
        let mock = server
            .mock("GET", "/blob/f1")
            .match_header("range", "bytes=5-")
            .with_status(416)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.txt");
        fs::write(&path, b"hello").unwrap();
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, None).await;

        assert_eq!(outcome, FetchOutcome::AlreadyComplete);
        assert_file_content(&path, b"hello");
        mock.assert_async().await;
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn error_status_fails_and_keeps_partial_bytes() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/blob/f1")
            .with_status(403)
            .with_body("expired")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.bin");
        fs::write(&path, b"abc").unwrap();
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, Some(10)).await;

        match outcome {
            FetchOutcome::Failed(reason) => assert!(reason.contains("403")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_file_content(&path, b"abc");
    }

    #[tokio::test]
    async fn refused_head_probe_falls_back_to_get() {
        let mut server = Server::new_async().await;
        let head = server
            .mock("HEAD", "/blob/f1")
            .with_status(405)
            .expect(1)
            .create_async()
            .await;
        let get = mock_blob(&mut server, "f1", b"hello").await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.bin");
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, None).await;

        assert_eq!(
            outcome,
            FetchOutcome::Downloaded { bytes: 5, resumed_from: 0 }
        );
        assert_file_content(&path, b"hello");
        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn range_not_satisfiable_with_known_size_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/blob/f1")
            .match_header("range", "bytes=5-")
            .with_status(416)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.txt");
        fs::write(&path, b"hello").unwrap();
        let url = format!("{}/blob/f1", server.url());

        let outcome = fetcher(&test_config(&server)).fetch(&url, &path, Some(10)).await;

        match outcome {
            FetchOutcome::Failed(reason) => assert!(reason.contains("416")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_file_content(&path, b"hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_host_fails() {
        let server = Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.bin");

        let outcome = fetcher(&test_config(&server))
            .fetch("http://127.0.0.1:1/blob", &path, Some(10))
            .await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }
}
