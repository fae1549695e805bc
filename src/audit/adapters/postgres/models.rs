//! Diesel row models for audit persistence.

use super::schema::{audit_issues, audit_tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for audit tasks.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task kind.
    pub kind: String,
    /// Lifecycle status.
    pub status: String,
    /// Files discovered before the cap.
    pub total_files: i64,
    /// Files processed.
    pub scanned_files: i64,
    /// Lines across analyzed files.
    pub total_lines: i64,
    /// Persisted issue count.
    pub issues_count: i64,
    /// Aggregate quality score.
    pub quality_score: f64,
    /// Scan configuration JSON payload.
    pub scan_config: Value,
    /// Failure condition.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insert model for audit tasks.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task kind.
    pub kind: String,
    /// Lifecycle status.
    pub status: String,
    /// Files discovered before the cap.
    pub total_files: i64,
    /// Files processed.
    pub scanned_files: i64,
    /// Lines across analyzed files.
    pub total_lines: i64,
    /// Persisted issue count.
    pub issues_count: i64,
    /// Aggregate quality score.
    pub quality_score: f64,
    /// Scan configuration JSON payload.
    pub scan_config: Value,
    /// Failure condition.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Partial update for audit tasks. `None` columns are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = audit_tasks)]
pub struct TaskPatchRow {
    /// Lifecycle status.
    pub status: Option<String>,
    /// Files discovered before the cap.
    pub total_files: Option<i64>,
    /// Files processed.
    pub scanned_files: Option<i64>,
    /// Lines across analyzed files.
    pub total_lines: Option<i64>,
    /// Persisted issue count.
    pub issues_count: Option<i64>,
    /// Aggregate quality score.
    pub quality_score: Option<f64>,
    /// Failure condition.
    pub error_message: Option<String>,
    /// Start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Query result row for audit issues.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_issues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IssueRow {
    /// Issue identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Root-relative file path.
    pub file_path: String,
    /// 1-based line.
    pub line: Option<i32>,
    /// 1-based column.
    pub column_number: Option<i32>,
    /// Analyzer category.
    pub issue_type: String,
    /// Severity.
    pub severity: String,
    /// Summary.
    pub title: String,
    /// Description.
    pub description: String,
    /// Suggested remediation.
    pub suggestion: Option<String>,
    /// Offending code excerpt.
    pub code_snippet: Option<String>,
    /// Structured explanation.
    pub ai_explanation: Option<Value>,
    /// Review status.
    pub status: String,
}

/// Insert model for audit issues.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_issues)]
pub struct NewIssueRow {
    /// Issue identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Root-relative file path.
    pub file_path: String,
    /// 1-based line.
    pub line: Option<i32>,
    /// 1-based column.
    pub column_number: Option<i32>,
    /// Analyzer category.
    pub issue_type: String,
    /// Severity.
    pub severity: String,
    /// Summary.
    pub title: String,
    /// Description.
    pub description: String,
    /// Suggested remediation.
    pub suggestion: Option<String>,
    /// Offending code excerpt.
    pub code_snippet: Option<String>,
    /// Structured explanation.
    pub ai_explanation: Option<Value>,
    /// Review status.
    pub status: String,
}
