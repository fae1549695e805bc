//! Facade used by the surrounding application to drive audit tasks.

use super::{
    AuditScheduler, CancellationRegistry, ProgressPublisher, ProgressSnapshot, RunReport,
    SchedulerError,
};
use crate::audit::{
    domain::{
        AuditDomainError, AuditIssue, AuditTask, AuditTaskId, ProjectId, ScanConfig, TaskKind,
        TaskStatus,
    },
    ports::{Analyzer, FileSource, TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Request payload for creating an audit task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAuditTaskRequest {
    project_id: ProjectId,
    kind: TaskKind,
    exclude_patterns: Vec<String>,
    max_depth: Option<u32>,
}

impl CreateAuditTaskRequest {
    /// Creates a request with required fields.
    #[must_use]
    pub const fn new(project_id: ProjectId, kind: TaskKind) -> Self {
        Self {
            project_id,
            kind,
            exclude_patterns: Vec::new(),
            max_depth: None,
        }
    }

    /// Sets glob patterns excluded from the scan.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.exclude_patterns = patterns.into_iter().collect();
        self
    }

    /// Limits directory traversal depth.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Acknowledgement returned by [`AuditTaskService::request_cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAck {
    /// Intent was recorded; the running loop will stop dispatching.
    Recorded,
    /// The task had already finished; nothing was recorded.
    AlreadyTerminal(TaskStatus),
}

/// Service-level errors for audit task operations.
#[derive(Debug, Clone, Error)]
pub enum AuditTaskServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] AuditDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
    /// The run failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Result type for audit task service operations.
pub type AuditTaskServiceResult<T> = Result<T, AuditTaskServiceError>;

/// Create, run, observe, and cancel audit tasks.
///
/// Cancellation goes through the registry only; the service never writes a
/// task's status itself.
pub struct AuditTaskService<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync + 'static,
{
    scheduler: AuditScheduler<S, A, F, C>,
    poll_interval: Duration,
}

impl<S, A, F, C> Clone for AuditTaskService<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

impl<S, A, F, C> AuditTaskService<S, A, F, C>
where
    S: TaskStore + 'static,
    A: Analyzer + 'static,
    F: FileSource + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a service around a scheduler.
    #[must_use]
    pub const fn new(scheduler: AuditScheduler<S, A, F, C>, poll_interval: Duration) -> Self {
        Self {
            scheduler,
            poll_interval,
        }
    }

    /// Returns the underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &AuditScheduler<S, A, F, C> {
        &self.scheduler
    }

    const fn store(&self) -> &Arc<S> {
        self.scheduler.store()
    }

    const fn registry(&self) -> &Arc<CancellationRegistry> {
        self.scheduler.registry()
    }

    /// Creates and stores a `pending` task.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTaskServiceError::Domain`] when an exclude pattern is
    /// blank or malformed, or [`AuditTaskServiceError::Store`] when the store
    /// rejects the task.
    pub async fn create_task(
        &self,
        request: CreateAuditTaskRequest,
    ) -> AuditTaskServiceResult<AuditTask> {
        let mut scan_config = ScanConfig::new().with_exclude_patterns(request.exclude_patterns)?;
        if let Some(depth) = request.max_depth {
            scan_config = scan_config.with_max_depth(depth);
        }
        let task = AuditTask::new(
            request.project_id,
            request.kind,
            scan_config,
            &**self.scheduler.clock(),
        );
        self.store().create_task(&task).await?;
        tracing::info!(task_id = %task.id(), kind = %task.kind(), "audit task created");
        Ok(task)
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTaskServiceError::Store`] when the task cannot be read.
    pub async fn get_task(&self, task_id: AuditTaskId) -> AuditTaskServiceResult<AuditTask> {
        Ok(self.store().get_task(task_id).await?)
    }

    /// Lists the issues recorded for a task.
    ///
    /// Ordering across files is unspecified when the run used more than one
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTaskServiceError::Store`] when the issues cannot be
    /// read.
    pub async fn list_issues(
        &self,
        task_id: AuditTaskId,
    ) -> AuditTaskServiceResult<Vec<AuditIssue>> {
        Ok(self.store().list_issues(task_id).await?)
    }

    /// Records cancellation intent for a task.
    ///
    /// Terminal tasks are acknowledged without recording anything.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTaskServiceError::Store`] when the task is unknown or
    /// cannot be read.
    pub async fn request_cancel(&self, task_id: AuditTaskId) -> AuditTaskServiceResult<CancelAck> {
        let task = self.store().get_task(task_id).await?;
        if task.status().is_terminal() {
            return Ok(CancelAck::AlreadyTerminal(task.status()));
        }
        self.registry().request_cancel(task_id);
        tracing::info!(task_id = %task_id, status = %task.status(), "cancellation intent recorded");
        Ok(CancelAck::Recorded)
    }

    /// Runs a task and waits for its terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTaskServiceError::Scheduler`] when the run fails.
    pub async fn run(&self, task_id: AuditTaskId) -> AuditTaskServiceResult<RunReport> {
        Ok(self.scheduler.run_task(task_id).await?)
    }

    /// Spawns a run in the background.
    #[must_use]
    pub fn launch(&self, task_id: AuditTaskId) -> JoinHandle<AuditTaskServiceResult<RunReport>> {
        let service = self.clone();
        tokio::spawn(async move { service.run(task_id).await })
    }

    /// Creates a publisher that polls this task.
    #[must_use]
    pub fn progress(&self, task_id: AuditTaskId) -> ProgressPublisher<S> {
        ProgressPublisher::new(Arc::clone(self.store()), task_id, self.poll_interval)
    }

    /// Spawns a publisher and returns a receiver of changed snapshots.
    ///
    /// The publisher stops once the task is terminal or the receiver and its
    /// clones are dropped.
    #[must_use]
    pub fn watch_progress(&self, task_id: AuditTaskId) -> watch::Receiver<Option<ProgressSnapshot>> {
        let (tx, rx) = watch::channel(None);
        let publisher = self.progress(task_id);
        tokio::spawn(async move {
            if let Err(err) = publisher.run(tx).await {
                tracing::warn!(task_id = %task_id, error = %err, "progress publisher stopped");
            }
        });
        rx
    }
}
