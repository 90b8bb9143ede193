use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use hotfold_config::{FailurePolicy, HotfolderConfig};
use hotfold_engine::{
    CycleOutcome, EngineStatus, FileDescriptor, FileHandler, Poller, handler_fn,
};
use hotfold_store::LocalStore;
use hotfold_telemetry::{Metrics, PollOutcomeLabel};
use hotfold_test_support::{MemoryStore, fixtures};
use serde_json::{Value, json};

fn config() -> HotfolderConfig {
    let mut config = HotfolderConfig::for_address("memory");
    config.base_path = "hot".into();
    config.stability.checks = 1;
    config.stability.interval_ms = 1;
    config.poll_interval.initial_ms = 10;
    config.poll_interval.max_ms = 1_000;
    config.poll_interval.backoff_factor = 2.0;
    config.handler.timeout_ms = 1_000;
    config
}

fn ok_handler() -> Arc<dyn FileHandler> {
    Arc::new(handler_fn(|file: FileDescriptor| async move {
        Ok(json!({ "handled": file.name }))
    }))
}

fn failing_handler(reason: &'static str) -> Arc<dyn FileHandler> {
    Arc::new(handler_fn(move |_file: FileDescriptor| async move {
        Err(anyhow!(reason))
    }))
}

async fn poller(
    config: &HotfolderConfig,
    store: &Arc<MemoryStore>,
    handler: Arc<dyn FileHandler>,
) -> Result<(Poller, Metrics)> {
    let metrics = Metrics::new()?;
    let poller = Poller::new(config, store.clone(), handler, metrics.clone())?;
    poller.prepare().await;
    Ok((poller, metrics))
}

#[tokio::test]
async fn processes_a_stable_file_into_success() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let mut config = config();
    config.filters.extensions = Some(vec!["txt".into()]);
    let (mut poller, metrics) = poller(&config, &store, ok_handler()).await?;

    let outcome = poller.poll_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Processed {
            name: "hello.txt".into(),
            destination: "hot/success/hello.txt".into(),
            renamed: false,
        }
    );
    assert_eq!(store.contents("hot/success/hello.txt"), Some(b"hello".to_vec()));
    assert!(store.file_names("hot/processing").is_empty());
    assert!(store.file_names("hot/incoming").is_empty());

    let stats = poller.stats();
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.status, EngineStatus::Polling);
    assert!(stats.last_poll.is_some());
    assert_eq!(metrics.snapshot().files_processed_total, 1);
    assert_eq!(metrics.polls(PollOutcomeLabel::Processed), 1);
    Ok(())
}

#[tokio::test]
async fn processes_files_on_a_mounted_share() -> Result<()> {
    let dir = fixtures::temp_dir()?;
    fixtures::write_file(dir.path(), "hot/incoming/hello.txt", b"hello")?;
    let store = Arc::new(LocalStore::new(dir.path()));
    let mut poller = Poller::new(&config(), store, ok_handler(), Metrics::new()?)?;
    poller.prepare().await;

    assert!(matches!(poller.poll_once().await, CycleOutcome::Processed { .. }));
    assert_eq!(std::fs::read(dir.path().join("hot/success/hello.txt"))?, b"hello");
    assert!(fixtures::file_names(dir.path(), "hot/processing")?.is_empty());
    assert!(dir.path().join("hot/errors").is_dir());
    Ok(())
}

#[tokio::test]
async fn handler_failure_leaves_file_in_processing() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let (mut poller, metrics) = poller(&config(), &store, failing_handler("ocr engine offline")).await?;

    let outcome = poller.poll_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Failed {
            name: "hello.txt".into(),
            path: "hot/processing/hello.txt".into(),
        }
    );
    assert_eq!(store.file_names("hot/processing"), vec!["hello.txt"]);
    let stats = poller.stats();
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_processed, 0);
    assert_eq!(stats.status, EngineStatus::Error);
    assert_eq!(metrics.snapshot().files_failed_total, 1);
    Ok(())
}

#[tokio::test]
async fn claim_collision_uses_unique_processing_name() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    store.put_dir("hot/processing");
    store.reserve("hot/processing/hello.txt");
    let (mut poller, _) = poller(&config(), &store, failing_handler("rejected")).await?;

    let CycleOutcome::Failed { path, .. } = poller.poll_once().await else {
        bail!("expected failure outcome");
    };
    assert!(path.starts_with("hot/processing/hello-"), "{path}");
    assert!(path.ends_with(".txt"));
    assert_eq!(store.contents(&path), Some(b"hello".to_vec()));
    assert_eq!(poller.stats().files_failed, 1);
    Ok(())
}

#[tokio::test]
async fn occupied_success_name_gets_unique_suffix() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/success/hello.txt", b"older");
    store.put_file("hot/incoming/hello.txt", b"hello");
    let (mut poller, metrics) = poller(&config(), &store, ok_handler()).await?;

    let CycleOutcome::Processed {
        destination,
        renamed,
        ..
    } = poller.poll_once().await
    else {
        bail!("expected processed outcome");
    };
    assert!(renamed);
    assert!(destination.starts_with("hot/success/hello-"), "{destination}");
    assert!(destination.ends_with(".txt"));
    assert_eq!(store.contents(&destination), Some(b"hello".to_vec()));
    assert_eq!(store.contents("hot/success/hello.txt"), Some(b"older".to_vec()));
    assert_eq!(poller.stats().files_processed, 1);
    assert_eq!(metrics.snapshot().collisions_resolved_total, 1);
    Ok(())
}

#[tokio::test]
async fn only_included_files_are_ever_selected() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/a_report.txt", b"aaaa");
    store.put_file("hot/incoming/b_invoice.txt", b"bbbb");
    let mut config = config();
    config.filters.include = vec![r"^b_".into()];
    let (mut poller, _) = poller(&config, &store, ok_handler()).await?;

    assert!(matches!(
        poller.poll_once().await,
        CycleOutcome::Processed { ref name, .. } if name == "b_invoice.txt"
    ));
    for _ in 0..3 {
        assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
    }
    assert_eq!(store.file_names("hot/incoming"), vec!["a_report.txt"]);
    assert_eq!(poller.stats().files_processed, 1);
    Ok(())
}

#[tokio::test]
async fn empty_incoming_only_backs_off() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (mut poller, metrics) = poller(&config(), &store, ok_handler()).await?;

    assert_eq!(poller.current_interval(), Duration::from_millis(10));
    assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
    assert_eq!(poller.current_interval(), Duration::from_millis(20));
    assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
    assert_eq!(poller.current_interval(), Duration::from_millis(40));

    let stats = poller.stats();
    assert_eq!(stats.files_processed, 0);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.status, EngineStatus::Polling);
    for stage in ["incoming", "processing", "success", "errors"] {
        assert!(store.has_dir(&format!("hot/{stage}")));
        assert!(store.file_names(&format!("hot/{stage}")).is_empty());
    }
    assert_eq!(metrics.snapshot().poll_interval_ms, 40);
    Ok(())
}

#[tokio::test]
async fn found_work_resets_the_interval() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (mut poller, _) = poller(&config(), &store, ok_handler()).await?;
    for _ in 0..4 {
        poller.poll_once().await;
    }
    assert_eq!(poller.current_interval(), Duration::from_millis(160));

    store.put_file("hot/incoming/scan.pdf", b"%PDF");
    assert!(matches!(poller.poll_once().await, CycleOutcome::Processed { .. }));
    assert_eq!(poller.current_interval(), Duration::from_millis(10));
    Ok(())
}

#[tokio::test]
async fn collision_reported_by_handler_routes_to_success() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let (mut poller, _) = poller(
        &config(),
        &store,
        failing_handler("write failed: STATUS_OBJECT_NAME_COLLISION"),
    )
    .await?;

    assert!(matches!(poller.poll_once().await, CycleOutcome::Processed { .. }));
    let stats = poller.stats();
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.status, EngineStatus::Polling);
    assert_eq!(store.file_names("hot/success"), vec!["hello.txt"]);
    Ok(())
}

#[tokio::test]
async fn claim_failure_changes_no_counters() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let (mut poller, _) = poller(&config(), &store, ok_handler()).await?;
    poller.poll_once().await;
    store.put_file("hot/incoming/second.txt", b"again");
    store.fail_renames_to("hot/processing");

    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::ClaimFailed {
            name: "second.txt".into()
        }
    );
    let stats = poller.stats();
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.status, EngineStatus::Error);
    assert_eq!(stats.current_interval_ms, 10);
    assert_eq!(store.file_names("hot/incoming"), vec!["second.txt"]);
    Ok(())
}

#[tokio::test]
async fn listing_failure_sets_error_and_recovers() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (mut poller, _) = poller(&config(), &store, ok_handler()).await?;
    store.fail_next_lists(1);

    assert_eq!(poller.poll_once().await, CycleOutcome::ListingFailed);
    assert_eq!(poller.stats().status, EngineStatus::Error);
    assert_eq!(poller.current_interval(), Duration::from_millis(20));

    assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
    assert_eq!(poller.stats().status, EngineStatus::Polling);
    Ok(())
}

#[tokio::test]
async fn growing_file_is_deferred_not_skipped() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/uploading.pdf", b"1234");
    store.put_file("hot/incoming/ready.pdf", b"done");
    store.grow_on_stat("hot/incoming/uploading.pdf", 16);
    let mut config = config();
    config.stability.checks = 2;
    let (mut poller, _) = poller(&config, &store, ok_handler()).await?;

    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::Unstable {
            name: "uploading.pdf".into()
        }
    );
    assert_eq!(
        store.file_names("hot/incoming"),
        vec!["uploading.pdf", "ready.pdf"]
    );
    assert_eq!(poller.current_interval(), Duration::from_millis(20));
    assert_eq!(poller.stats().files_processed, 0);
    Ok(())
}

#[tokio::test]
async fn quarantine_policy_moves_failures_to_errors() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/bad.pdf", b"junk");
    let mut config = config();
    config.handler.on_failure = FailurePolicy::Quarantine;
    let (mut poller, _) = poller(&config, &store, failing_handler("corrupt pdf")).await?;

    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::Failed {
            name: "bad.pdf".into(),
            path: "hot/errors/bad.pdf".into(),
        }
    );
    assert!(store.file_names("hot/processing").is_empty());
    assert_eq!(poller.stats().files_failed, 1);
    Ok(())
}

#[tokio::test]
async fn failed_success_routing_counts_as_failure() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    store.fail_renames_to("hot/success");
    let (mut poller, _) = poller(&config(), &store, ok_handler()).await?;

    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::Failed {
            name: "hello.txt".into(),
            path: "hot/processing/hello.txt".into(),
        }
    );
    assert_eq!(poller.stats().files_failed, 1);
    assert_eq!(poller.stats().status, EngineStatus::Error);
    Ok(())
}

struct Sleeper;

#[async_trait]
impl FileHandler for Sleeper {
    async fn handle(&self, _file: FileDescriptor) -> Result<Value> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn handler_timeout_is_isolated_from_the_engine() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/slow.txt", b"slow");
    let mut config = config();
    config.handler.timeout_ms = 20;
    let (mut poller, _) = poller(&config, &store, Arc::new(Sleeper)).await?;

    assert!(matches!(poller.poll_once().await, CycleOutcome::Failed { .. }));
    assert_eq!(poller.stats().status, EngineStatus::Error);
    assert_eq!(poller.poll_once().await, CycleOutcome::Idle);
    assert_eq!(poller.stats().status, EngineStatus::Polling);
    Ok(())
}

struct Explodes;

#[async_trait]
impl FileHandler for Explodes {
    async fn handle(&self, file: FileDescriptor) -> Result<Value> {
        if file.name.starts_with("boom") {
            panic!("handler crashed on {}", file.name);
        }
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn handler_panic_is_counted_and_engine_continues() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/boom.txt", b"x");
    store.put_file("hot/incoming/fine.txt", b"y");
    let (mut poller, _) = poller(&config(), &store, Arc::new(Explodes)).await?;

    assert!(matches!(poller.poll_once().await, CycleOutcome::Failed { ref name, .. } if name == "boom.txt"));
    assert!(matches!(poller.poll_once().await, CycleOutcome::Processed { ref name, .. } if name == "fine.txt"));
    let stats = poller.stats();
    assert_eq!((stats.files_processed, stats.files_failed), (1, 1));
    Ok(())
}

struct FailsOnce {
    calls: AtomicU32,
}

#[async_trait]
impl FileHandler for FailsOnce {
    async fn handle(&self, _file: FileDescriptor) -> Result<Value> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            bail!("share briefly unavailable");
        }
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn retry_budget_rescues_transient_failures() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let mut config = config();
    config.handler.retries = 1;
    let handler = Arc::new(FailsOnce {
        calls: AtomicU32::new(0),
    });
    let (mut poller, _) = poller(&config, &store, handler.clone()).await?;

    assert!(matches!(poller.poll_once().await, CycleOutcome::Processed { .. }));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    assert_eq!(poller.stats().files_failed, 0);
    Ok(())
}

#[tokio::test]
async fn stats_are_published_to_subscribers() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.put_file("hot/incoming/hello.txt", b"hello");
    let (mut poller, _) = poller(&config(), &store, ok_handler()).await?;
    let mut stats = poller.subscribe();
    assert_eq!(stats.borrow_and_update().status, EngineStatus::Starting);

    poller.poll_once().await;
    assert!(stats.has_changed()?);
    assert_eq!(stats.borrow_and_update().files_processed, 1);
    Ok(())
}
