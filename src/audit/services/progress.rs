//! Observer-side progress polling with change suppression.

use crate::audit::{
    domain::{AuditTask, AuditTaskId, QualityScore, TaskStatus},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Default delay between progress polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Counters an observer renders for a task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Files discovered before the cap.
    pub total_files: u64,
    /// Files processed so far.
    pub scanned_files: u64,
    /// Issues persisted so far.
    pub issues_count: u64,
    /// Aggregate quality score as last written.
    pub quality_score: QualityScore,
}

impl ProgressSnapshot {
    /// Captures the observable counters of a task.
    #[must_use]
    pub const fn of(task: &AuditTask) -> Self {
        Self {
            status: task.status(),
            total_files: task.total_files(),
            scanned_files: task.scanned_files(),
            issues_count: task.issues_count(),
            quality_score: task.quality_score(),
        }
    }

    /// Returns completion as a whole percentage.
    ///
    /// A completed task reports 100 even when the file cap left files
    /// unscanned; a task with nothing to scan reports 0.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.status == TaskStatus::Completed {
            return 100;
        }
        let ratio = self
            .scanned_files
            .saturating_mul(100)
            .checked_div(self.total_files)
            .unwrap_or(0)
            .min(100);
        u8::try_from(ratio).unwrap_or(100)
    }

    /// Returns `true` once the task can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Polls the task store and emits a snapshot only when it changed.
pub struct ProgressPublisher<S>
where
    S: TaskStore,
{
    store: Arc<S>,
    task_id: AuditTaskId,
    poll_interval: Duration,
    last: Option<ProgressSnapshot>,
}

impl<S> ProgressPublisher<S>
where
    S: TaskStore,
{
    /// Creates a publisher for one task.
    #[must_use]
    pub const fn new(store: Arc<S>, task_id: AuditTaskId, poll_interval: Duration) -> Self {
        Self {
            store,
            task_id,
            poll_interval,
            last: None,
        }
    }

    /// Returns the most recently observed snapshot.
    #[must_use]
    pub const fn last(&self) -> Option<ProgressSnapshot> {
        self.last
    }

    /// Reads the task once.
    ///
    /// Returns `Some` only when the snapshot differs from the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the task cannot be read.
    pub async fn poll_once(&mut self) -> TaskStoreResult<Option<ProgressSnapshot>> {
        let task = self.store.get_task(self.task_id).await?;
        let snapshot = ProgressSnapshot::of(&task);
        if self.last == Some(snapshot) {
            return Ok(None);
        }
        self.last = Some(snapshot);
        Ok(Some(snapshot))
    }

    /// Publishes changed snapshots every poll interval.
    ///
    /// Returns after a terminal snapshot has been published or once every
    /// receiver has been dropped. Read failures are logged and retried on
    /// the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task disappears.
    pub async fn run(
        mut self,
        tx: watch::Sender<Option<ProgressSnapshot>>,
    ) -> TaskStoreResult<Option<ProgressSnapshot>> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                tracing::debug!(task_id = %self.task_id, "progress observers gone");
                return Ok(self.last);
            }
            match self.poll_once().await {
                Ok(Some(snapshot)) => {
                    tx.send_replace(Some(snapshot));
                    if snapshot.is_terminal() {
                        return Ok(Some(snapshot));
                    }
                }
                Ok(None) => {}
                Err(err @ TaskStoreError::NotFound(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(task_id = %self.task_id, error = %err, "progress poll failed");
                }
            }
        }
    }
}
