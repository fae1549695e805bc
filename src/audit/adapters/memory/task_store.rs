//! In-memory task store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::audit::{
    domain::{AuditIssue, AuditTask, AuditTaskId, TaskPatch},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};

/// Thread-safe in-memory task store.
///
/// Every successful `update_task` is also appended to a per-task history so
/// tests can assert on the sequence of persisted snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    tasks: HashMap<AuditTaskId, AuditTask>,
    issues: HashMap<AuditTaskId, Vec<AuditIssue>>,
    history: HashMap<AuditTaskId, Vec<AuditTask>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every persisted state of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when lock acquisition fails.
    pub fn history(&self, id: AuditTaskId) -> TaskStoreResult<Vec<AuditTask>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.history.get(&id).cloned().unwrap_or_default())
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, task: &AuditTask) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        state.issues.insert(task.id(), Vec::new());
        state.history.insert(task.id(), vec![task.clone()]);
        Ok(())
    }

    async fn get_task(&self, id: AuditTaskId) -> TaskStoreResult<AuditTask> {
        let state = self.state.read().map_err(poisoned)?;
        state
            .tasks
            .get(&id)
            .cloned()
            .ok_or(TaskStoreError::NotFound(id))
    }

    async fn update_task(&self, id: AuditTaskId, patch: &TaskPatch) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let task = state.tasks.get_mut(&id).ok_or(TaskStoreError::NotFound(id))?;
        let mut updated = task.clone();
        updated.apply(patch)?;
        task.clone_from(&updated);
        state.history.entry(id).or_default().push(updated);
        Ok(())
    }

    async fn append_issues(&self, id: AuditTaskId, issues: &[AuditIssue]) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.tasks.contains_key(&id) {
            return Err(TaskStoreError::NotFound(id));
        }
        state
            .issues
            .entry(id)
            .or_default()
            .extend(issues.iter().cloned());
        Ok(())
    }

    async fn list_issues(&self, id: AuditTaskId) -> TaskStoreResult<Vec<AuditIssue>> {
        let state = self.state.read().map_err(poisoned)?;
        if !state.tasks.contains_key(&id) {
            return Err(TaskStoreError::NotFound(id));
        }
        Ok(state.issues.get(&id).cloned().unwrap_or_default())
    }
}
