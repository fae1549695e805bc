//! Shared builders for audit unit tests.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{
    adapters::memory::{InMemoryAnalyzer, InMemoryFileSource, InMemoryTaskStore},
    domain::{AuditTask, AuditTaskId, ProjectId, ScanConfig, TaskKind},
    ports::TaskStore,
    services::{AuditScheduler, CancellationRegistry, SchedulerConfig},
};
use mockable::DefaultClock;

pub(super) type MemoryScheduler =
    AuditScheduler<InMemoryTaskStore, InMemoryAnalyzer, InMemoryFileSource, DefaultClock>;

/// In-memory collaborators plus a scheduler wired to them.
pub(super) struct Harness {
    pub store: InMemoryTaskStore,
    pub analyzer: InMemoryAnalyzer,
    pub files: InMemoryFileSource,
    pub registry: Arc<CancellationRegistry>,
    pub scheduler: MemoryScheduler,
}

impl Harness {
    pub fn new(
        analyzer: InMemoryAnalyzer,
        files: InMemoryFileSource,
        config: SchedulerConfig,
    ) -> Self {
        let store = InMemoryTaskStore::new();
        let registry = Arc::new(CancellationRegistry::default());
        let scheduler = AuditScheduler::new(
            Arc::new(store.clone()),
            Arc::new(analyzer.clone()),
            Arc::new(files.clone()),
            Arc::clone(&registry),
            Arc::new(DefaultClock),
            config,
        );
        Self {
            store,
            analyzer,
            files,
            registry,
            scheduler,
        }
    }

    /// Stores a fresh `pending` task and returns its identifier.
    pub async fn pending_task(&self) -> AuditTaskId {
        let task = AuditTask::new(
            ProjectId::new(),
            TaskKind::Repository,
            ScanConfig::new(),
            &DefaultClock,
        );
        self.store
            .create_task(&task)
            .await
            .expect("task should be stored");
        task.id()
    }

    pub async fn task(&self, id: AuditTaskId) -> AuditTask {
        self.store.get_task(id).await.expect("task should exist")
    }
}

/// Scheduler configuration with the given pool size and gap.
pub(super) fn config(max_concurrency: usize, gap_ms: u64) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrency,
        inter_dispatch_gap: Duration::from_millis(gap_ms),
        ..SchedulerConfig::default()
    }
}

/// A source holding `count` small Rust files named `src/file_<n>.rs`.
pub(super) fn rust_files(count: usize) -> InMemoryFileSource {
    InMemoryFileSource::new(
        (1..=count).map(|index| (format!("src/file_{index}.rs"), "fn main() {}\n")),
    )
    .expect("paths are valid")
}

/// Analyzer reporting one issue per file with the given latency.
pub(super) fn one_issue_analyzer(latency_ms: u64) -> InMemoryAnalyzer {
    InMemoryAnalyzer::with_default(
        crate::audit::adapters::memory::ScriptedResponse::issues(1, 80.0),
        Duration::from_millis(latency_ms),
    )
}
