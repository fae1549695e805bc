//! Issue records produced by file analysis.

use super::{AuditDomainError, AuditIssueId, AuditTaskId, ParseEnumError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be fixed before release.
    Critical,
    /// Likely defect or vulnerability.
    High,
    /// Maintainability or robustness concern.
    Medium,
    /// Style or minor improvement.
    Low,
}

impl Severity {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl TryFrom<&str> for Severity {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseEnumError::new("severity", value)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of an issue. The scheduler only ever creates `Open` issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Awaiting triage.
    Open,
    /// Fixed by the project owner.
    Resolved,
    /// Dismissed as not a real problem.
    FalsePositive,
}

impl IssueStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::FalsePositive => "false_positive",
        }
    }
}

impl TryFrom<&str> for IssueStatus {
    type Error = ParseEnumError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "false_positive" => Ok(Self::FalsePositive),
            _ => Err(ParseEnumError::new("issue status", value)),
        }
    }
}

/// Structured explanation attached by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiExplanation {
    /// What the problem is.
    pub what: String,
    /// Why it matters.
    pub why: String,
    /// How to fix it.
    pub how: String,
    /// Optional pointer to further reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more: Option<String>,
}

/// Analyzer-reported issue before it is bound to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    /// Optional 1-based line.
    pub line: Option<u32>,
    /// Optional 1-based column.
    pub column: Option<u32>,
    /// Analyzer category, e.g. `security` or `performance`.
    pub issue_type: String,
    /// Severity.
    pub severity: Severity,
    /// One-line summary.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Suggested remediation.
    pub suggestion: Option<String>,
    /// Offending code excerpt.
    pub code_snippet: Option<String>,
    /// Structured explanation.
    pub ai_explanation: Option<AiExplanation>,
}

impl IssueDraft {
    /// Creates a draft with required fields.
    #[must_use]
    pub fn new(
        issue_type: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            line: None,
            column: None,
            issue_type: issue_type.into(),
            severity,
            title: title.into(),
            description: description.into(),
            suggestion: None,
            code_snippet: None,
            ai_explanation: None,
        }
    }

    /// Sets the source location.
    #[must_use]
    pub const fn at(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }

    /// Sets the remediation suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Sets the code excerpt.
    #[must_use]
    pub fn with_code_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }

    /// Sets the structured explanation.
    #[must_use]
    pub fn with_explanation(mut self, explanation: AiExplanation) -> Self {
        self.ai_explanation = Some(explanation);
        self
    }
}

/// Issue record owned by exactly one audit task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditIssue {
    id: AuditIssueId,
    task_id: AuditTaskId,
    file_path: String,
    status: IssueStatus,
    #[serde(flatten)]
    detail: IssueDraft,
}

impl AuditIssue {
    /// Binds an analyzer draft to a task and file.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::EmptyIssueTitle`] when the draft has a
    /// blank title.
    pub fn from_draft(
        task_id: AuditTaskId,
        file_path: impl Into<String>,
        draft: IssueDraft,
    ) -> Result<Self, AuditDomainError> {
        if draft.title.trim().is_empty() {
            return Err(AuditDomainError::EmptyIssueTitle);
        }
        Ok(Self {
            id: AuditIssueId::new(),
            task_id,
            file_path: file_path.into(),
            status: IssueStatus::Open,
            detail: draft,
        })
    }

    /// Reconstructs an issue from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: AuditIssueId,
        task_id: AuditTaskId,
        file_path: String,
        status: IssueStatus,
        detail: IssueDraft,
    ) -> Self {
        Self {
            id,
            task_id,
            file_path,
            status,
            detail,
        }
    }

    /// Returns the issue identifier.
    #[must_use]
    pub const fn id(&self) -> AuditIssueId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> AuditTaskId {
        self.task_id
    }

    /// Returns the root-relative file path.
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Returns the review status.
    #[must_use]
    pub const fn status(&self) -> IssueStatus {
        self.status
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.detail.severity
    }

    /// Returns the analyzer-reported detail.
    #[must_use]
    pub const fn detail(&self) -> &IssueDraft {
        &self.detail
    }
}
