//! Analyzer port: inspects one file and reports issues.

use crate::audit::domain::{IssueDraft, QualityScore};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for analyzer calls.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Input for a single analysis call.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    /// Root-relative path of the file.
    pub path: &'a str,
    /// Language, when known.
    pub language: Option<&'a str>,
    /// File contents.
    pub content: &'a str,
}

/// Output of a successful analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAnalysis {
    /// Issues found in the file.
    pub issues: Vec<IssueDraft>,
    /// The file's contribution to the task quality score.
    pub quality: QualityScore,
}

impl FileAnalysis {
    /// Creates an analysis result.
    #[must_use]
    pub const fn new(issues: Vec<IssueDraft>, quality: QualityScore) -> Self {
        Self { issues, quality }
    }
}

/// Code analysis capability.
///
/// Implementations enforce their own per-call timeout; the scheduler never
/// aborts an in-flight call.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzes one file.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalyzerError`] whose [`AnalyzerError::class`] drives the
    /// scheduler's retry policy.
    async fn analyze(&self, request: AnalysisRequest<'_>) -> AnalyzerResult<FileAnalysis>;
}

/// How the scheduler reacts to an analyzer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Retry the same file within the attempt bound.
    Transient,
    /// Skip the file; the task carries on.
    Permanent,
    /// The task cannot proceed.
    Fatal,
}

/// Errors returned by analyzer implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The provider asked the caller to slow down.
    #[error("analyzer rate limited: {0}")]
    RateLimited(String),

    /// The call exceeded its time limit.
    #[error("analyzer call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Network blip or other retryable failure.
    #[error("transient analyzer failure: {0}")]
    Transient(String),

    /// The language is not supported.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The input could not be analyzed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The file exceeds the analyzer's size limit.
    #[error("file too large: {size} bytes exceeds {limit}")]
    FileTooLarge {
        /// File size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: u64,
    },

    /// The provider refused the request for a non-retryable reason.
    #[error("analysis rejected: {0}")]
    Rejected(String),

    /// The analyzer cannot be reached at all.
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
}

impl AnalyzerError {
    /// Classifies the error for the retry policy.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::RateLimited(_) | Self::Timeout(_) | Self::Transient(_) => {
                FailureClass::Transient
            }
            Self::UnsupportedLanguage(_)
            | Self::MalformedInput(_)
            | Self::FileTooLarge { .. }
            | Self::Rejected(_) => FailureClass::Permanent,
            Self::Unavailable(_) => FailureClass::Fatal,
        }
    }
}
