//! Audit task aggregate root.

use super::{
    AuditDomainError, AuditTaskId, ProjectId, QualityScore, ScanConfig, TaskKind, TaskPatch,
    TaskStatus,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Audit task aggregate root.
///
/// While a task is `running` the scheduler is its only writer; once it is
/// terminal the record is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTask {
    id: AuditTaskId,
    project_id: ProjectId,
    kind: TaskKind,
    status: TaskStatus,
    total_files: u64,
    scanned_files: u64,
    total_lines: u64,
    issues_count: u64,
    quality_score: QualityScore,
    scan_config: ScanConfig,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted audit task.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedAuditTask {
    /// Persisted task identifier.
    pub id: AuditTaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Task kind.
    pub kind: TaskKind,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Files discovered before the cap was applied.
    pub total_files: u64,
    /// Files processed so far.
    pub scanned_files: u64,
    /// Lines across analyzed files.
    pub total_lines: u64,
    /// Issues persisted for this task.
    pub issues_count: u64,
    /// Aggregate quality score.
    pub quality_score: QualityScore,
    /// File selection rules.
    pub scan_config: ScanConfig,
    /// Failure condition, if the task failed.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Time the task entered `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// Time the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl AuditTask {
    /// Creates a new `pending` task.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        kind: TaskKind,
        scan_config: ScanConfig,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: AuditTaskId::new(),
            project_id,
            kind,
            status: TaskStatus::Pending,
            total_files: 0,
            scanned_files: 0,
            total_lines: 0,
            issues_count: 0,
            quality_score: QualityScore::MIN,
            scan_config,
            error_message: None,
            created_at: clock.utc(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAuditTask) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            kind: data.kind,
            status: data.status,
            total_files: data.total_files,
            scanned_files: data.scanned_files,
            total_lines: data.total_lines,
            issues_count: data.issues_count,
            quality_score: data.quality_score,
            scan_config: data.scan_config,
            error_message: data.error_message,
            created_at: data.created_at,
            started_at: data.started_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> AuditTaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the number of files discovered before the cap.
    #[must_use]
    pub const fn total_files(&self) -> u64 {
        self.total_files
    }

    /// Returns the number of processed files.
    #[must_use]
    pub const fn scanned_files(&self) -> u64 {
        self.scanned_files
    }

    /// Returns the line count across analyzed files.
    #[must_use]
    pub const fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Returns the persisted issue count.
    #[must_use]
    pub const fn issues_count(&self) -> u64 {
        self.issues_count
    }

    /// Returns the aggregate quality score.
    #[must_use]
    pub const fn quality_score(&self) -> QualityScore {
        self.quality_score
    }

    /// Returns the scan configuration.
    #[must_use]
    pub const fn scan_config(&self) -> &ScanConfig {
        &self.scan_config
    }

    /// Returns the recorded failure condition.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the time the task entered `running`.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns the time the task reached a terminal status.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Applies a partial update. Only supplied fields change.
    ///
    /// Terminal statuses are absorbing: a terminal task accepts only a patch
    /// that re-asserts its own status, so two writers agreeing on the final
    /// value do not conflict. `running` cannot be re-asserted, which makes
    /// the start write a claim that only one run can win.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::InvalidStatusTransition`] when the patch
    /// moves the status along an edge the state machine forbids,
    /// [`AuditDomainError::TerminalTask`] when a patch without a status
    /// targets a terminal task, and [`AuditDomainError::ScannedExceedsTotal`]
    /// when the resulting counters would break `scanned <= total`. The task
    /// is left unchanged in every case.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), AuditDomainError> {
        self.check_status(patch.status)?;
        let total = patch.total_files.unwrap_or(self.total_files);
        let scanned = patch.scanned_files.unwrap_or(self.scanned_files);
        if scanned > total {
            return Err(AuditDomainError::ScannedExceedsTotal {
                task_id: self.id,
                scanned,
                total,
            });
        }

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(total_files) = patch.total_files {
            self.total_files = total_files;
        }
        if let Some(scanned_files) = patch.scanned_files {
            self.scanned_files = scanned_files;
        }
        if let Some(total_lines) = patch.total_lines {
            self.total_lines = total_lines;
        }
        if let Some(issues_count) = patch.issues_count {
            self.issues_count = issues_count;
        }
        if let Some(quality_score) = patch.quality_score {
            self.quality_score = quality_score;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(message) = &patch.error_message {
            self.error_message = Some(message.clone());
        }
        Ok(())
    }

    fn check_status(&self, target: Option<TaskStatus>) -> Result<(), AuditDomainError> {
        match target {
            None if self.status.is_terminal() => Err(AuditDomainError::TerminalTask {
                task_id: self.id,
                status: self.status,
            }),
            None => Ok(()),
            Some(status) if status == self.status && status.is_terminal() => Ok(()),
            Some(status) if self.status.can_transition_to(status) => Ok(()),
            Some(status) => Err(AuditDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: status,
            }),
        }
    }
}
