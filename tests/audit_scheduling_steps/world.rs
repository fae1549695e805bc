//! Shared world state for audit scheduling BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use auditflow::audit::{
    adapters::memory::{InMemoryAnalyzer, InMemoryFileSource, InMemoryTaskStore},
    domain::AuditTaskId,
    services::{
        AuditScheduler, AuditTaskService, AuditTaskServiceResult, CancelAck, CancellationRegistry,
        RunReport, SchedulerConfig,
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestAuditService =
    AuditTaskService<InMemoryTaskStore, InMemoryAnalyzer, InMemoryFileSource, DefaultClock>;

/// Scenario world for audit scheduling behaviour tests.
pub struct AuditSchedulingWorld {
    pub store: InMemoryTaskStore,
    pub registry: Arc<CancellationRegistry>,
    pub analyzer: InMemoryAnalyzer,
    pub files: InMemoryFileSource,
    pub task_id: Option<AuditTaskId>,
    pub last_report: Option<AuditTaskServiceResult<RunReport>>,
    pub last_cancel_ack: Option<CancelAck>,
}

impl AuditSchedulingWorld {
    /// Creates a world with no files and a quiet analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: InMemoryTaskStore::new(),
            registry: Arc::new(CancellationRegistry::default()),
            analyzer: InMemoryAnalyzer::new(),
            files: InMemoryFileSource::default(),
            task_id: None,
            last_report: None,
            last_cancel_ack: None,
        }
    }

    /// Builds a service over the world's collaborators.
    #[must_use]
    pub fn service(&self, max_concurrency: usize) -> TestAuditService {
        let scheduler = AuditScheduler::new(
            Arc::new(self.store.clone()),
            Arc::new(self.analyzer.clone()),
            Arc::new(self.files.clone()),
            Arc::clone(&self.registry),
            Arc::new(DefaultClock),
            SchedulerConfig {
                max_concurrency,
                inter_dispatch_gap: Duration::ZERO,
                ..SchedulerConfig::default()
            },
        );
        AuditTaskService::new(scheduler, Duration::from_millis(10))
    }

    /// Returns the scenario's task identifier.
    pub fn task_id(&self) -> Result<AuditTaskId, eyre::Report> {
        self.task_id
            .ok_or_else(|| eyre::eyre!("missing audit task in scenario world"))
    }
}

impl Default for AuditSchedulingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AuditSchedulingWorld {
    AuditSchedulingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
