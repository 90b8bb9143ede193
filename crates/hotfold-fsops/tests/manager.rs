use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hotfold_config::{FolderLayout, HotfolderConfig};
use hotfold_fsops::{FileManager, StabilityChecker, StagePaths};
use hotfold_store::{EntryKind, LocalStore};
use hotfold_test_support::{MemoryStore, fixtures};

fn manager(store: &Arc<MemoryStore>) -> FileManager {
    FileManager::new(
        store.clone(),
        StagePaths::resolve("hot", &FolderLayout::default()),
    )
}

#[tokio::test]
async fn ensure_layout_reports_failed_stages_and_continues() {
    let store = Arc::new(MemoryStore::new());
    store.fail_mkdir("hot/processing");
    let files = manager(&store);

    let failed = files.ensure_layout().await;
    assert_eq!(failed, vec!["processing"]);
    assert!(store.has_dir("hot/incoming"));
    assert!(store.has_dir("hot/success"));
    assert!(store.has_dir("hot/errors"));
}

#[tokio::test]
async fn listing_skips_directories_and_resolves_missing_sizes() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_dir("hot/incoming/sub");
    store.put_file("hot/incoming/a.txt", b"12345");
    store.omit_listing_sizes();
    let files = manager(&store);

    let entries = files.list("hot/incoming").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].kind, EntryKind::File);
    assert_eq!(entries[0].size, 5);
    Ok(())
}

#[tokio::test]
async fn listing_failure_surfaces_as_store_error() {
    let store = Arc::new(MemoryStore::new());
    store.put_dir("hot/incoming");
    store.fail_next_lists(1);
    let err = manager(&store).list("hot/incoming").await.unwrap_err();
    assert!(!err.is_collision());
}

#[tokio::test]
async fn move_unique_prefers_plain_name_then_suffix() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/processing/a.txt", b"one");
    store.put_file("hot/processing/b.txt", b"two");
    store.put_file("hot/success/b.txt", b"old");
    let files = manager(&store);

    let plain = files
        .move_unique("hot/processing/a.txt", "hot/success", "a.txt")
        .await?;
    assert_eq!(plain, "hot/success/a.txt");

    let suffixed = files
        .move_unique("hot/processing/b.txt", "hot/success", "b.txt")
        .await?;
    assert!(suffixed.starts_with("hot/success/b-"));
    assert!(suffixed.ends_with(".txt"));
    assert_eq!(store.contents(&suffixed), Some(b"two".to_vec()));
    assert_eq!(store.contents("hot/success/b.txt"), Some(b"old".to_vec()));
    Ok(())
}

#[tokio::test]
async fn move_file_reports_collision_on_delete_pending_target() {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/processing/a.txt", b"one");
    store.put_dir("hot/success");
    store.reserve("hot/success/a.txt");
    let err = manager(&store)
        .move_file("hot/processing/a.txt", "hot/success/a.txt")
        .await
        .unwrap_err();
    assert!(err.is_collision());
}

#[tokio::test]
async fn delete_if_exists_is_gated_on_presence() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/errors/a.txt", b"x");
    let files = manager(&store);

    assert!(files.delete_if_exists("hot/errors/a.txt").await?);
    assert!(!files.delete_if_exists("hot/errors/a.txt").await?);
    assert!(!files.is_accessible("hot/errors/a.txt").await?);
    Ok(())
}

#[tokio::test]
async fn prewarm_passes_connection_settings_through() {
    let store = Arc::new(MemoryStore::new());
    let files = manager(&store);
    let config = HotfolderConfig::for_address("memory");

    assert!(files.prewarm(&config.connection).await.is_ok());
    store.fail_connect();
    assert!(files.prewarm(&config.connection).await.is_err());
    assert_eq!(store.connect_calls(), 2);
}

#[tokio::test]
async fn stability_detects_constant_and_growing_files() {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/done.pdf", b"abcd");
    store.put_file("hot/incoming/uploading.pdf", b"abcd");
    store.grow_on_stat("hot/incoming/uploading.pdf", 1);
    let files = manager(&store);
    let checker = StabilityChecker::new(3, Duration::from_millis(1));

    assert!(checker.is_stable(&files, "hot/incoming/done.pdf").await);
    assert!(!checker.is_stable(&files, "hot/incoming/uploading.pdf").await);
    assert!(!checker.is_stable(&files, "hot/incoming/missing.pdf").await);
}

#[tokio::test]
async fn single_check_reads_once_without_waiting() {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/uploading.pdf", b"abcd");
    store.grow_on_stat("hot/incoming/uploading.pdf", 1);
    let files = manager(&store);
    let checker = StabilityChecker::new(1, Duration::from_secs(60));

    assert!(checker.is_stable(&files, "hot/incoming/uploading.pdf").await);
}

#[tokio::test]
async fn local_store_backs_the_same_operations() -> Result<()> {
    let dir = fixtures::temp_dir()?;
    fixtures::write_file(dir.path(), "hot/incoming/scan.pdf", b"pdf")?;
    let files = FileManager::new(
        Arc::new(LocalStore::new(dir.path())),
        StagePaths::resolve("hot", &FolderLayout::default()),
    );

    assert!(files.ensure_layout().await.is_empty());
    let entries = files.list("hot/incoming").await?;
    assert_eq!(entries.len(), 1);
    let moved = files
        .move_unique("hot/incoming/scan.pdf", "hot/processing", "scan.pdf")
        .await?;
    assert_eq!(moved, "hot/processing/scan.pdf");
    assert_eq!(
        fixtures::file_names(dir.path(), "hot/processing")?,
        vec!["scan.pdf"]
    );
    Ok(())
}
