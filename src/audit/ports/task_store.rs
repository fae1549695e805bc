//! Persistence port for audit tasks and their issues.

use crate::audit::domain::{AuditDomainError, AuditIssue, AuditTask, AuditTaskId, TaskPatch};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Durable record of task status, counters, and issues.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier already
    /// exists.
    async fn create_task(&self, task: &AuditTask) -> TaskStoreResult<()>;

    /// Reads a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn get_task(&self, id: AuditTaskId) -> TaskStoreResult<AuditTask>;

    /// Applies a partial update. Only supplied fields change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist and
    /// [`TaskStoreError::Rejected`] when the patch violates the status state
    /// machine.
    async fn update_task(&self, id: AuditTaskId, patch: &TaskPatch) -> TaskStoreResult<()>;

    /// Appends issues to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn append_issues(&self, id: AuditTaskId, issues: &[AuditIssue]) -> TaskStoreResult<()>;

    /// Lists a task's issues. Ordering follows insertion.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn list_issues(&self, id: AuditTaskId) -> TaskStoreResult<Vec<AuditIssue>>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(AuditTaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(AuditTaskId),

    /// The update conflicts with the stored record.
    #[error(transparent)]
    Rejected(#[from] AuditDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
