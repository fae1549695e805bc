//! Port contracts for audit orchestration.
//!
//! Ports define infrastructure-agnostic interfaces used by audit services.

pub mod analyzer;
pub mod file_source;
pub mod task_store;

pub use analyzer::{
    AnalysisRequest, Analyzer, AnalyzerError, AnalyzerResult, FailureClass, FileAnalysis,
};
pub use file_source::{FileSource, FileSourceError, FileSourceResult};
pub use task_store::{TaskStore, TaskStoreError, TaskStoreResult};
