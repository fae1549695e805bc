//! Error types for audit domain validation and parsing.

use super::{AuditTaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating audit domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditDomainError {
    /// The requested lifecycle transition is not permitted.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Task whose transition was rejected.
        task_id: AuditTaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The task reached a terminal status; only a re-assertion of that
    /// status may still touch it.
    #[error("task {task_id} is {status} and can no longer change")]
    TerminalTask {
        /// Task the patch targeted.
        task_id: AuditTaskId,
        /// Terminal status held by the task.
        status: TaskStatus,
    },

    /// The patch would count more processed files than were discovered.
    #[error("task {task_id} cannot scan {scanned} of {total} files")]
    ScannedExceedsTotal {
        /// Task the patch targeted.
        task_id: AuditTaskId,
        /// Resulting processed file count.
        scanned: u64,
        /// Resulting discovered file count.
        total: u64,
    },

    /// An exclusion pattern is blank after trimming.
    #[error("exclusion patterns must not be blank")]
    BlankExcludePattern,

    /// An exclusion pattern is not valid glob syntax.
    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidExcludePattern {
        /// Offending pattern.
        pattern: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A source file path is empty after trimming.
    #[error("source file path must not be empty")]
    EmptyFilePath,

    /// An issue title is empty after trimming.
    #[error("issue title must not be empty")]
    EmptyIssueTitle,
}

/// Error returned while parsing lifecycle enums from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// Raw value that failed to parse.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
