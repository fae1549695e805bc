//! Partial task updates.

use super::{QualityScore, TaskStatus};
use chrono::{DateTime, Utc};

/// Partial update for an [`super::AuditTask`].
///
/// `None` means "leave unchanged"; there is no way to clear a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    /// New lifecycle status.
    pub status: Option<TaskStatus>,
    /// Files discovered before the cap.
    pub total_files: Option<u64>,
    /// Files processed so far.
    pub scanned_files: Option<u64>,
    /// Lines across analyzed files.
    pub total_lines: Option<u64>,
    /// Issues persisted so far.
    pub issues_count: Option<u64>,
    /// Aggregate quality score.
    pub quality_score: Option<QualityScore>,
    /// Time the task entered `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// Time the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure condition.
    pub error_message: Option<String>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status.
    #[must_use]
    pub const fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the discovered file count.
    #[must_use]
    pub const fn total_files(mut self, value: u64) -> Self {
        self.total_files = Some(value);
        self
    }

    /// Sets the processed file count.
    #[must_use]
    pub const fn scanned_files(mut self, value: u64) -> Self {
        self.scanned_files = Some(value);
        self
    }

    /// Sets the analyzed line count.
    #[must_use]
    pub const fn total_lines(mut self, value: u64) -> Self {
        self.total_lines = Some(value);
        self
    }

    /// Sets the issue count.
    #[must_use]
    pub const fn issues_count(mut self, value: u64) -> Self {
        self.issues_count = Some(value);
        self
    }

    /// Sets the quality score.
    #[must_use]
    pub const fn quality_score(mut self, value: QualityScore) -> Self {
        self.quality_score = Some(value);
        self
    }

    /// Sets the start timestamp.
    #[must_use]
    pub const fn started_at(mut self, value: DateTime<Utc>) -> Self {
        self.started_at = Some(value);
        self
    }

    /// Sets the completion timestamp.
    #[must_use]
    pub const fn completed_at(mut self, value: DateTime<Utc>) -> Self {
        self.completed_at = Some(value);
        self
    }

    /// Records a failure condition.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
