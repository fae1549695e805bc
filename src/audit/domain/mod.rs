//! Domain model for audit task orchestration.
//!
//! The audit domain models task lifecycle, issue records, scan
//! configuration, and the quality aggregate while keeping persistence and
//! analyzer concerns outside of the domain boundary.

mod error;
mod ids;
mod issue;
mod patch;
mod quality;
mod scan;
mod status;
mod task;

pub use error::{AuditDomainError, ParseEnumError};
pub use ids::{AuditIssueId, AuditTaskId, ProjectId};
pub use issue::{AiExplanation, AuditIssue, IssueDraft, IssueStatus, Severity};
pub use patch::TaskPatch;
pub use quality::{QualityAggregate, QualityScore};
pub use scan::{ScanConfig, SourceFile};
pub use status::{TaskKind, TaskStatus};
pub use task::{AuditTask, PersistedAuditTask};
