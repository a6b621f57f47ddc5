mod common;

use common::{MemoryClient, write_tree};
use omni_core::sync::SyncAction;
use omni_core::{DirSync, Direction, Error, LocalClient, SyncMode, SyncOptions};
use tempfile::TempDir;

fn local(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), files);
    dir
}

#[tokio::test]
async fn sync_upload_adds_missing_files_only() {
    let dir = local(&[("a.txt", "local-a"), ("b.txt", "local-b")]);
    let remote = MemoryClient::with_files(&[("root/b.txt", "remote-b"), ("root/c.txt", "remote-c")]);
    let engine = DirSync::new(&remote);

    let plan = engine
        .plan(Direction::Upload, SyncMode::Sync, dir.path(), "root", SyncOptions::default())
        .await
        .unwrap();
    let transfers: Vec<_> = plan.transfers().map(|e| e.relative_path.as_str()).collect();
    let skipped: Vec<_> = plan.skipped().map(|e| e.relative_path.as_str()).collect();
    assert_eq!(transfers, ["a.txt"]);
    assert_eq!(skipped, ["b.txt"]);
    assert!(plan.entries.iter().all(|e| e.relative_path != "c.txt"));

    let report = engine.execute(&plan).await.unwrap();
    assert_eq!(report.completed, ["a.txt"]);
    assert_eq!(report.skipped, ["b.txt"]);
    assert_eq!(remote.get("root/a.txt").as_deref(), Some("local-a"));
    assert_eq!(remote.get("root/b.txt").as_deref(), Some("remote-b"));
    assert_eq!(remote.get("root/c.txt").as_deref(), Some("remote-c"));
}

#[tokio::test]
async fn sync_upload_with_overwrite_replaces_common_files() {
    let dir = local(&[("a.txt", "local-a"), ("b.txt", "local-b")]);
    let remote = MemoryClient::with_files(&[("root/b.txt", "remote-b"), ("root/c.txt", "remote-c")]);
    let options = SyncOptions {
        overwrite: true,
        ..Default::default()
    };

    let report = DirSync::new(&remote)
        .sync_dir(Direction::Upload, dir.path(), "root", options)
        .await
        .unwrap();

    assert_eq!(report.completed, ["a.txt", "b.txt"]);
    assert_eq!(remote.get("root/b.txt").as_deref(), Some("local-b"));
    assert_eq!(remote.get("root/c.txt").as_deref(), Some("remote-c"));
    assert!(!remote.calls().iter().any(|c| c.contains("c.txt")));
}

#[tokio::test]
async fn second_sync_plans_nothing() {
    let dir = local(&[("a.txt", "a"), ("nested/b.txt", "b")]);
    let remote = MemoryClient::new();
    let engine = DirSync::new(&remote);
    let options = SyncOptions {
        recursive: true,
        ..Default::default()
    };

    let first = engine.sync_dir(Direction::Upload, dir.path(), "backup", options).await.unwrap();
    assert_eq!(first.completed, ["a.txt", "nested/b.txt"]);

    let plan = engine
        .plan(Direction::Upload, SyncMode::Sync, dir.path(), "backup", options)
        .await
        .unwrap();
    assert!(plan.is_noop());
    assert_eq!(plan.skipped().count(), 2);
}

#[tokio::test]
async fn skip_failures_attempts_every_transfer() {
    let dir = local(&[("1.txt", "one"), ("2.txt", "two"), ("3.txt", "three")]);
    let remote = MemoryClient::new();
    remote.fail_on("root/2.txt");
    let options = SyncOptions {
        skip_failures: true,
        ..Default::default()
    };

    let report = DirSync::new(&remote)
        .copy_dir(Direction::Upload, dir.path(), "root", options)
        .await
        .unwrap();

    assert_eq!(report.completed, ["1.txt", "3.txt"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].relative_path, "2.txt");
    assert!(matches!(report.failures[0].error, Error::Network(_)));
    assert!(remote.calls().contains(&"upload:root/3.txt".to_string()));
    assert!(!report.is_success());
}

#[tokio::test]
async fn first_failure_aborts_without_skip_failures() {
    let dir = local(&[("1.txt", "one"), ("2.txt", "two"), ("3.txt", "three")]);
    let remote = MemoryClient::new();
    remote.fail_on("root/2.txt");

    let err = DirSync::new(&remote)
        .copy_dir(Direction::Upload, dir.path(), "root", SyncOptions::default())
        .await
        .unwrap_err();

    match &err {
        Error::Transfer { path, .. } => assert_eq!(path, "2.txt"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert_eq!(remote.calls(), ["upload:root/1.txt", "upload:root/2.txt"]);
    assert!(remote.get("root/3.txt").is_none());
}

#[tokio::test]
async fn copy_overwrites_without_diffing() {
    let dir = local(&[("a.txt", "new")]);
    let remote = MemoryClient::with_files(&[("root/a.txt", "old")]);

    let report = DirSync::new(&remote)
        .copy_dir(Direction::Upload, dir.path(), "root", SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.completed, ["a.txt"]);
    assert_eq!(remote.get("root/a.txt").as_deref(), Some("new"));
}

#[tokio::test]
async fn skip_existing_spares_destination_files() {
    let dir = local(&[("a.txt", "new"), ("b.txt", "new")]);
    let remote = MemoryClient::with_files(&[("root/a.txt", "old")]);
    let options = SyncOptions {
        overwrite: true,
        skip_existing: true,
        ..Default::default()
    };

    let plan = DirSync::new(&remote)
        .plan(Direction::Upload, SyncMode::Copy, dir.path(), "root", options)
        .await
        .unwrap();

    assert_eq!(plan.entries[0].action, SyncAction::Skip);
    assert_eq!(plan.entries[1].action, SyncAction::Transfer);
}

#[tokio::test]
async fn sync_download_into_missing_folder() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("restore");
    let remote = MemoryClient::with_files(&[("root/x/y.txt", "deep"), ("root/top.txt", "top")]);
    let options = SyncOptions {
        recursive: true,
        ..Default::default()
    };

    let report = DirSync::new(&remote)
        .sync_dir(Direction::Download, &target, "root", options)
        .await
        .unwrap();

    assert_eq!(report.completed, ["top.txt", "x/y.txt"]);
    assert_eq!(std::fs::read_to_string(target.join("x/y.txt")).unwrap(), "deep");
}

#[tokio::test]
async fn non_recursive_download_ignores_subfolders() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryClient::with_files(&[("root/x/y.txt", "deep"), ("root/top.txt", "top")]);

    let plan = DirSync::new(&remote)
        .plan(Direction::Download, SyncMode::Sync, dir.path(), "root", SyncOptions::default())
        .await
        .unwrap();

    let transfers: Vec<_> = plan.transfers().map(|e| e.relative_path.as_str()).collect();
    assert_eq!(transfers, ["top.txt"]);
}

#[tokio::test]
async fn listing_error_aborts_before_any_transfer() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryClient::with_files(&[("other/a.txt", "a")]);

    let err = DirSync::new(&remote)
        .sync_dir(Direction::Download, dir.path(), "missing", SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn missing_local_source_is_not_found() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryClient::new();

    let err = DirSync::new(&remote)
        .sync_dir(Direction::Upload, &dir.path().join("nope"), "root", SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn delete_folder_contents_keeps_folder_siblings() {
    let remote = MemoryClient::with_files(&[
        ("root/a.txt", "a"),
        ("root/sub/b.txt", "b"),
        ("root/sub/c.txt", "c"),
        ("other/d.txt", "d"),
    ]);

    let report = DirSync::new(&remote)
        .delete_folder_contents("root", false)
        .await
        .unwrap();

    assert_eq!(report.completed, ["a.txt", "sub"]);
    assert_eq!(remote.paths(), ["other/d.txt"]);
}

#[tokio::test]
async fn delete_folder_contents_skips_failures() {
    let remote = MemoryClient::with_files(&[("root/a.txt", "a"), ("root/sub/b.txt", "b")]);
    remote.fail_on("root/a.txt");

    let report = DirSync::new(&remote)
        .delete_folder_contents("root", true)
        .await
        .unwrap();

    assert_eq!(report.completed, ["sub"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].relative_path, "a.txt");
    assert_eq!(remote.paths(), ["root/a.txt"]);
}

#[tokio::test]
async fn sync_between_local_folders() {
    let source = local(&[("docs/readme.md", "hello"), ("docs/img/logo.png", "png")]);
    let mirror = TempDir::new().unwrap();
    let client = LocalClient::new(mirror.path());
    let options = SyncOptions {
        recursive: true,
        ..Default::default()
    };

    let report = DirSync::new(&client)
        .sync_dir(Direction::Upload, &source.path().join("docs"), "copy", options)
        .await
        .unwrap();

    assert_eq!(report.completed, ["img/logo.png", "readme.md"]);
    assert_eq!(
        std::fs::read_to_string(mirror.path().join("copy/img/logo.png")).unwrap(),
        "png"
    );

    let again = DirSync::new(&client)
        .plan(Direction::Upload, SyncMode::Sync, &source.path().join("docs"), "copy", options)
        .await
        .unwrap();
    assert!(again.is_noop());
}

#[tokio::test]
async fn download_refuses_keys_that_leave_the_destination() {
    let remote = MemoryClient::with_files(&[("root/../escaped.txt", "evil"), ("root/ok.txt", "fine")]);
    let outer = TempDir::new().unwrap();
    let target = outer.path().join("restore");
    let options = SyncOptions {
        recursive: true,
        ..Default::default()
    };

    let err = DirSync::new(&remote)
        .sync_dir(Direction::Download, &target, "root", options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidPath(ref msg) if msg.contains("../escaped.txt")));
    assert!(!outer.path().join("escaped.txt").exists());
    // planning failed, so nothing was fetched
    assert!(!target.join("ok.txt").exists());
    assert!(remote.calls().iter().all(|c| !c.starts_with("download")));
}
