//! File set port: enumerates and reads the files of a scan.

use crate::audit::domain::{ScanConfig, SourceFile};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for file source operations.
pub type FileSourceResult<T> = Result<T, FileSourceError>;

/// Provider of scan inputs.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Lists admitted files in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`FileSourceError::Io`] when the root cannot be enumerated.
    async fn list_files(&self, config: &ScanConfig) -> FileSourceResult<Vec<SourceFile>>;

    /// Reads a file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`FileSourceError::NotFound`], [`FileSourceError::NotUtf8`], or
    /// [`FileSourceError::Io`].
    async fn read_to_string(&self, file: &SourceFile) -> FileSourceResult<String>;
}

/// Errors returned by file source implementations.
#[derive(Debug, Clone, Error)]
pub enum FileSourceError {
    /// The file no longer exists.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The file is not valid UTF-8.
    #[error("file is not valid UTF-8: {0}")]
    NotUtf8(String),

    /// Underlying I/O failure.
    #[error("file source I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for FileSourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
