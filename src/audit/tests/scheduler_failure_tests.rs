//! Scheduler behaviour when the task store misbehaves.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::support::{config, one_issue_analyzer, rust_files};
use crate::audit::{
    adapters::memory::{InMemoryAnalyzer, InMemoryFileSource},
    domain::{
        AuditDomainError, AuditIssue, AuditTask, AuditTaskId, ProjectId, ScanConfig, TaskKind,
        TaskPatch, TaskStatus,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
    services::{AuditScheduler, CancellationRegistry, SchedulerConfig, SchedulerError},
};
use async_trait::async_trait;
use eyre::ensure;
use mockable::DefaultClock;
use mockall::{Sequence, mock};
use rstest::{fixture, rstest};

mock! {
    pub Store {}

    #[async_trait]
    impl TaskStore for Store {
        async fn create_task(&self, task: &AuditTask) -> TaskStoreResult<()>;
        async fn get_task(&self, id: AuditTaskId) -> TaskStoreResult<AuditTask>;
        async fn update_task(&self, id: AuditTaskId, patch: &TaskPatch) -> TaskStoreResult<()>;
        async fn append_issues(&self, id: AuditTaskId, issues: &[AuditIssue]) -> TaskStoreResult<()>;
        async fn list_issues(&self, id: AuditTaskId) -> TaskStoreResult<Vec<AuditIssue>>;
    }
}

fn unavailable() -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other("database unavailable"))
}

#[fixture]
fn pending() -> AuditTask {
    AuditTask::new(
        ProjectId::new(),
        TaskKind::Instant,
        ScanConfig::new(),
        &DefaultClock,
    )
}

fn scheduler_with(
    store: MockStore,
    scheduler_config: SchedulerConfig,
) -> (
    AuditScheduler<MockStore, InMemoryAnalyzer, InMemoryFileSource, DefaultClock>,
    Arc<CancellationRegistry>,
    InMemoryFileSource,
) {
    let registry = Arc::new(CancellationRegistry::default());
    let files = rust_files(3);
    let scheduler = AuditScheduler::new(
        Arc::new(store),
        Arc::new(one_issue_analyzer(0)),
        Arc::new(files.clone()),
        Arc::clone(&registry),
        Arc::new(DefaultClock),
        scheduler_config,
    );
    (scheduler, registry, files)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn final_flush_failure_marks_task_failed(pending: AuditTask) -> eyre::Result<()> {
    let id = pending.id();
    let mut store = MockStore::new();
    let mut sequence = Sequence::new();
    store
        .expect_get_task()
        .returning(move |_| Ok(pending.clone()));
    store.expect_append_issues().returning(|_, _| Ok(()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status == Some(TaskStatus::Running))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status.is_none())
        .returning(|_, _| Ok(()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status == Some(TaskStatus::Completed))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Err(unavailable()));
    store
        .expect_update_task()
        .withf(|_, patch| {
            patch.status == Some(TaskStatus::Failed)
                && patch
                    .error_message
                    .as_deref()
                    .is_some_and(|message| message.starts_with("final flush failed"))
        })
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(()));

    let (scheduler, registry, files) = scheduler_with(store, config(1, 0));
    let result = scheduler.run(id, files.source_files()).await;

    ensure!(matches!(result, Err(SchedulerError::Store(_))));
    ensure!(!registry.is_cancelled(id));
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn batched_flush_failures_are_retried(pending: AuditTask) -> eyre::Result<()> {
    let id = pending.id();
    let append_calls = Arc::new(AtomicUsize::new(0));
    let appended = Arc::new(AtomicUsize::new(0));
    let mut store = MockStore::new();
    store
        .expect_get_task()
        .returning(move |_| Ok(pending.clone()));
    store.expect_update_task().returning(|_, _| Ok(()));
    let calls = Arc::clone(&append_calls);
    let persisted = Arc::clone(&appended);
    store
        .expect_append_issues()
        .returning(move |_, issues| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(unavailable());
            }
            persisted.fetch_add(issues.len(), Ordering::SeqCst);
            Ok(())
        });

    let frequent = SchedulerConfig {
        flush_every_files: 1,
        ..config(1, 0)
    };
    let (scheduler, _registry, files) = scheduler_with(store, frequent);
    let report = scheduler.run(id, files.source_files()).await?;

    ensure!(report.status == TaskStatus::Completed);
    ensure!(report.issues_count == 3);
    ensure!(appended.load(Ordering::SeqCst) == 3);
    ensure!(append_calls.load(Ordering::SeqCst) >= 2);
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_counter_flush_is_retried_next_batch(pending: AuditTask) -> eyre::Result<()> {
    let id = pending.id();
    let counter_writes = Arc::new(Mutex::new(Vec::new()));
    let mut store = MockStore::new();
    store
        .expect_get_task()
        .returning(move |_| Ok(pending.clone()));
    store.expect_append_issues().returning(|_, _| Ok(()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status.is_some())
        .returning(|_, _| Ok(()));
    let seen = Arc::clone(&counter_writes);
    store
        .expect_update_task()
        .withf(|_, patch| patch.status.is_none())
        .returning(move |_, patch| {
            let mut writes = seen.lock().expect("counter log lock");
            writes.push(patch.scanned_files);
            if writes.len() == 1 {
                return Err(unavailable());
            }
            Ok(())
        });

    let batched = SchedulerConfig {
        flush_every_files: 2,
        ..config(1, 0)
    };
    let (scheduler, _registry, files) = scheduler_with(store, batched);
    let report = scheduler.run(id, files.source_files()).await?;

    let writes = counter_writes.lock().expect("counter log lock").clone();
    ensure!(report.status == TaskStatus::Completed);
    ensure!(report.scanned_files == 3);
    ensure!(
        writes == [Some(2), Some(3)],
        "counter flushes after a failure: {writes:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn start_write_lost_to_another_claim_is_refused(pending: AuditTask) -> eyre::Result<()> {
    let id = pending.id();
    let mut store = MockStore::new();
    store
        .expect_get_task()
        .returning(move |_| Ok(pending.clone()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status == Some(TaskStatus::Running))
        .times(1)
        .returning(|task_id, _| {
            Err(TaskStoreError::Rejected(
                AuditDomainError::InvalidStatusTransition {
                    task_id,
                    from: TaskStatus::Running,
                    to: TaskStatus::Running,
                },
            ))
        });

    let (scheduler, registry, files) = scheduler_with(store, config(2, 0));
    let result = scheduler.run(id, files.source_files()).await;

    ensure!(matches!(result, Err(SchedulerError::AlreadyRunning { task_id }) if task_id == id));
    ensure!(!registry.is_running(id));
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn start_failure_is_reported_and_recorded(pending: AuditTask) -> eyre::Result<()> {
    let id = pending.id();
    let mut store = MockStore::new();
    store
        .expect_get_task()
        .returning(move |_| Ok(pending.clone()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status == Some(TaskStatus::Running))
        .times(1)
        .returning(|_, _| Err(unavailable()));
    store
        .expect_update_task()
        .withf(|_, patch| patch.status == Some(TaskStatus::Failed))
        .times(1)
        .returning(|_, _| Ok(()));

    let (scheduler, _registry, files) = scheduler_with(store, config(2, 0));
    let result = scheduler.run(id, files.source_files()).await;

    ensure!(matches!(result, Err(SchedulerError::Store(_))));
    Ok(())
}
