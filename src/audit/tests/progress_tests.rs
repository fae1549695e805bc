//! Unit tests for progress snapshots and the polling publisher.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        AuditTask, AuditTaskId, ProjectId, QualityScore, ScanConfig, TaskKind, TaskPatch,
        TaskStatus,
    },
    ports::{TaskStore, TaskStoreError},
    services::{ProgressPublisher, ProgressSnapshot},
};
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;
use tokio::sync::watch;

async fn stored_task(store: &InMemoryTaskStore) -> eyre::Result<AuditTaskId> {
    let task = AuditTask::new(
        ProjectId::new(),
        TaskKind::Repository,
        ScanConfig::new(),
        &DefaultClock,
    );
    store.create_task(&task).await?;
    Ok(task.id())
}

fn snapshot(status: TaskStatus, total_files: u64, scanned_files: u64) -> ProgressSnapshot {
    ProgressSnapshot {
        status,
        total_files,
        scanned_files,
        issues_count: 0,
        quality_score: QualityScore::MIN,
    }
}

#[rstest]
#[case(snapshot(TaskStatus::Pending, 0, 0), 0)]
#[case(snapshot(TaskStatus::Running, 4, 1), 25)]
#[case(snapshot(TaskStatus::Running, 3, 2), 66)]
#[case(snapshot(TaskStatus::Cancelled, 10, 4), 40)]
#[case(snapshot(TaskStatus::Completed, 500, 200), 100)]
fn percent_reflects_scanned_share(#[case] progress: ProgressSnapshot, #[case] expected: u8) {
    assert_eq!(progress.percent(), expected);
}

#[rstest]
#[tokio::test]
async fn poll_once_suppresses_unchanged_snapshots() -> eyre::Result<()> {
    let store = Arc::new(InMemoryTaskStore::new());
    let id = stored_task(&store).await?;
    let mut publisher = ProgressPublisher::new(Arc::clone(&store), id, Duration::from_secs(1));

    let first = publisher.poll_once().await?;
    let repeat = publisher.poll_once().await?;
    store
        .update_task(
            id,
            &TaskPatch::new()
                .status(TaskStatus::Running)
                .total_files(3)
                .scanned_files(1),
        )
        .await?;
    let changed = publisher.poll_once().await?;

    ensure!(first.is_some_and(|seen| seen.status == TaskStatus::Pending));
    ensure!(repeat.is_none());
    ensure!(changed.is_some_and(|seen| seen.scanned_files == 1));
    ensure!(publisher.last() == changed);
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn run_stops_after_publishing_terminal_snapshot() -> eyre::Result<()> {
    let store = Arc::new(InMemoryTaskStore::new());
    let id = stored_task(&store).await?;
    let publisher = ProgressPublisher::new(Arc::clone(&store), id, Duration::from_millis(100));
    let (tx, mut rx) = watch::channel(None);
    let handle = tokio::spawn(publisher.run(tx));

    rx.wait_for(|seen| seen.is_some_and(|snapshot| snapshot.status == TaskStatus::Pending))
        .await?;
    store
        .update_task(id, &TaskPatch::new().status(TaskStatus::Running).total_files(2))
        .await?;
    rx.wait_for(|seen| seen.is_some_and(|snapshot| snapshot.status == TaskStatus::Running))
        .await?;
    store
        .update_task(
            id,
            &TaskPatch::new()
                .status(TaskStatus::Completed)
                .scanned_files(2),
        )
        .await?;

    let last = handle.await??;
    ensure!(last.is_some_and(|snapshot| snapshot.is_terminal()));
    ensure!(rx.borrow().is_some_and(|snapshot| snapshot.percent() == 100));
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn run_stops_when_observers_leave() -> eyre::Result<()> {
    let store = Arc::new(InMemoryTaskStore::new());
    let id = stored_task(&store).await?;
    let publisher = ProgressPublisher::new(Arc::clone(&store), id, Duration::from_millis(100));
    let (tx, rx) = watch::channel(None);
    drop(rx);

    let last = publisher.run(tx).await?;
    ensure!(last.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn run_reports_missing_task() {
    let store = Arc::new(InMemoryTaskStore::new());
    let publisher =
        ProgressPublisher::new(store, AuditTaskId::new(), Duration::from_millis(100));
    let (tx, _rx) = watch::channel(None);

    let result = publisher.run(tx).await;
    assert!(matches!(result, Err(TaskStoreError::NotFound(_))));
}
