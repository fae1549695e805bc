//! `PostgreSQL` task store implementation.

use super::{
    models::{IssueRow, NewIssueRow, NewTaskRow, TaskPatchRow, TaskRow},
    schema::{audit_issues, audit_tasks},
};
use crate::audit::{
    domain::{
        AuditIssue, AuditIssueId, AuditTask, AuditTaskId, IssueDraft, IssueStatus,
        PersistedAuditTask, ProjectId, QualityScore, ScanConfig, Severity, TaskKind, TaskPatch,
        TaskStatus,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by audit adapters.
pub type AuditPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
///
/// Status changes are validated against the stored row inside a
/// `SELECT ... FOR UPDATE` transaction, so concurrent writers cannot move a
/// terminal task backwards.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: AuditPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: AuditPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

impl From<DieselError> for TaskStoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create_task(&self, task: &AuditTask) -> TaskStoreResult<()> {
        let task_id = task.id();
        let new_row = to_new_row(task)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(audit_tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskStoreError::DuplicateTask(task_id)
                    }
                    _ => TaskStoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn get_task(&self, id: AuditTaskId) -> TaskStoreResult<AuditTask> {
        self.run_blocking(move |connection| {
            let row = audit_tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?
                .ok_or(TaskStoreError::NotFound(id))?;
            row_to_task(row)
        })
        .await
    }

    async fn update_task(&self, id: AuditTaskId, patch: &TaskPatch) -> TaskStoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let owned_patch = patch.clone();
        let changeset = to_patch_row(patch)?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                let row = audit_tasks::table
                    .find(id.into_inner())
                    .select(TaskRow::as_select())
                    .for_update()
                    .first::<TaskRow>(tx)
                    .optional()?
                    .ok_or(TaskStoreError::NotFound(id))?;
                row_to_task(row)?.apply(&owned_patch)?;

                diesel::update(audit_tasks::table.find(id.into_inner()))
                    .set(&changeset)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn append_issues(&self, id: AuditTaskId, issues: &[AuditIssue]) -> TaskStoreResult<()> {
        let rows = issues
            .iter()
            .map(to_new_issue_row)
            .collect::<TaskStoreResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskStoreError, _>(|tx| {
                ensure_task_exists(tx, id)?;
                if !rows.is_empty() {
                    diesel::insert_into(audit_issues::table)
                        .values(&rows)
                        .execute(tx)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn list_issues(&self, id: AuditTaskId) -> TaskStoreResult<Vec<AuditIssue>> {
        self.run_blocking(move |connection| {
            ensure_task_exists(connection, id)?;
            let rows = audit_issues::table
                .filter(audit_issues::task_id.eq(id.into_inner()))
                .order(audit_issues::seq.asc())
                .select(IssueRow::as_select())
                .load::<IssueRow>(connection)?;
            rows.into_iter().map(row_to_issue).collect()
        })
        .await
    }
}

fn ensure_task_exists(connection: &mut PgConnection, id: AuditTaskId) -> TaskStoreResult<()> {
    let found = audit_tasks::table
        .find(id.into_inner())
        .select(audit_tasks::id)
        .first::<uuid::Uuid>(connection)
        .optional()?;
    found.map(|_| ()).ok_or(TaskStoreError::NotFound(id))
}

fn to_i64(value: u64) -> TaskStoreResult<i64> {
    i64::try_from(value).map_err(TaskStoreError::persistence)
}

fn to_u64(value: i64) -> TaskStoreResult<u64> {
    u64::try_from(value).map_err(TaskStoreError::persistence)
}

fn to_i32(value: Option<u32>) -> TaskStoreResult<Option<i32>> {
    value
        .map(|inner| i32::try_from(inner).map_err(TaskStoreError::persistence))
        .transpose()
}

fn to_u32(value: Option<i32>) -> TaskStoreResult<Option<u32>> {
    value
        .map(|inner| u32::try_from(inner).map_err(TaskStoreError::persistence))
        .transpose()
}

fn to_new_row(task: &AuditTask) -> TaskStoreResult<NewTaskRow> {
    let scan_config =
        serde_json::to_value(task.scan_config()).map_err(TaskStoreError::persistence)?;
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        project_id: task.project_id().into_inner(),
        kind: task.kind().as_str().to_owned(),
        status: task.status().as_str().to_owned(),
        total_files: to_i64(task.total_files())?,
        scanned_files: to_i64(task.scanned_files())?,
        total_lines: to_i64(task.total_lines())?,
        issues_count: to_i64(task.issues_count())?,
        quality_score: task.quality_score().value(),
        scan_config,
        error_message: task.error_message().map(str::to_owned),
        created_at: task.created_at(),
        started_at: task.started_at(),
        completed_at: task.completed_at(),
    })
}

fn to_patch_row(patch: &TaskPatch) -> TaskStoreResult<TaskPatchRow> {
    Ok(TaskPatchRow {
        status: patch.status.map(|status| status.as_str().to_owned()),
        total_files: patch.total_files.map(to_i64).transpose()?,
        scanned_files: patch.scanned_files.map(to_i64).transpose()?,
        total_lines: patch.total_lines.map(to_i64).transpose()?,
        issues_count: patch.issues_count.map(to_i64).transpose()?,
        quality_score: patch.quality_score.map(QualityScore::value),
        error_message: patch.error_message.clone(),
        started_at: patch.started_at,
        completed_at: patch.completed_at,
    })
}

fn row_to_task(row: TaskRow) -> TaskStoreResult<AuditTask> {
    let scan_config = serde_json::from_value::<ScanConfig>(row.scan_config)
        .map_err(TaskStoreError::persistence)?;
    let kind = TaskKind::try_from(row.kind.as_str()).map_err(TaskStoreError::persistence)?;
    let status = TaskStatus::try_from(row.status.as_str()).map_err(TaskStoreError::persistence)?;

    Ok(AuditTask::from_persisted(PersistedAuditTask {
        id: AuditTaskId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        kind,
        status,
        total_files: to_u64(row.total_files)?,
        scanned_files: to_u64(row.scanned_files)?,
        total_lines: to_u64(row.total_lines)?,
        issues_count: to_u64(row.issues_count)?,
        quality_score: QualityScore::new(row.quality_score),
        scan_config,
        error_message: row.error_message,
        created_at: row.created_at,
        started_at: row.started_at,
        completed_at: row.completed_at,
    }))
}

fn to_new_issue_row(issue: &AuditIssue) -> TaskStoreResult<NewIssueRow> {
    let detail = issue.detail();
    let ai_explanation = detail
        .ai_explanation
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(TaskStoreError::persistence)?;
    Ok(NewIssueRow {
        id: issue.id().into_inner(),
        task_id: issue.task_id().into_inner(),
        file_path: issue.file_path().to_owned(),
        line: to_i32(detail.line)?,
        column_number: to_i32(detail.column)?,
        issue_type: detail.issue_type.clone(),
        severity: detail.severity.as_str().to_owned(),
        title: detail.title.clone(),
        description: detail.description.clone(),
        suggestion: detail.suggestion.clone(),
        code_snippet: detail.code_snippet.clone(),
        ai_explanation,
        status: issue.status().as_str().to_owned(),
    })
}

fn row_to_issue(row: IssueRow) -> TaskStoreResult<AuditIssue> {
    let severity = Severity::try_from(row.severity.as_str()).map_err(TaskStoreError::persistence)?;
    let status = IssueStatus::try_from(row.status.as_str()).map_err(TaskStoreError::persistence)?;
    let ai_explanation = row
        .ai_explanation
        .map(serde_json::from_value)
        .transpose()
        .map_err(TaskStoreError::persistence)?;

    let detail = IssueDraft {
        line: to_u32(row.line)?,
        column: to_u32(row.column_number)?,
        issue_type: row.issue_type,
        severity,
        title: row.title,
        description: row.description,
        suggestion: row.suggestion,
        code_snippet: row.code_snippet,
        ai_explanation,
    };
    Ok(AuditIssue::from_persisted(
        AuditIssueId::from_uuid(row.id),
        AuditTaskId::from_uuid(row.task_id),
        row.file_path,
        status,
        detail,
    ))
}
