//! In-memory file source.

use async_trait::async_trait;
use std::sync::Arc;

use crate::audit::{
    domain::{AuditDomainError, ScanConfig, SourceFile},
    ports::{FileSource, FileSourceError, FileSourceResult},
};

/// File source backed by an ordered map of path to contents.
///
/// Scan configuration is ignored; every file is listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileSource {
    files: Arc<Vec<(SourceFile, Option<String>)>>,
}

impl InMemoryFileSource {
    /// Creates a source from `(path, contents)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::EmptyFilePath`] for blank paths.
    pub fn new<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Result<Self, AuditDomainError>
    where
        P: Into<String>,
        C: Into<String>,
    {
        let entries = files
            .into_iter()
            .map(|(path, contents)| {
                let file = SourceFile::new(Into::<String>::into(path))?;
                Ok((file, Some(contents.into())))
            })
            .collect::<Result<Vec<_>, AuditDomainError>>()?;
        Ok(Self {
            files: Arc::new(entries),
        })
    }

    /// Returns a copy of this source with an additional unreadable entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::EmptyFilePath`] for blank paths.
    pub fn with_unreadable(self, path: impl Into<String>) -> Result<Self, AuditDomainError> {
        let mut entries: Vec<_> = self.files.iter().cloned().collect();
        entries.push((SourceFile::new(Into::<String>::into(path))?, None));
        Ok(Self {
            files: Arc::new(entries),
        })
    }

    /// Returns the listed files, in order.
    #[must_use]
    pub fn source_files(&self) -> Vec<SourceFile> {
        self.files.iter().map(|(file, _)| file.clone()).collect()
    }
}

#[async_trait]
impl FileSource for InMemoryFileSource {
    async fn list_files(&self, _config: &ScanConfig) -> FileSourceResult<Vec<SourceFile>> {
        Ok(self.source_files())
    }

    async fn read_to_string(&self, file: &SourceFile) -> FileSourceResult<String> {
        let path = file.path().as_str();
        let entry = self
            .files
            .iter()
            .find(|(candidate, _)| candidate.path().as_str() == path);
        match entry {
            Some((_, Some(contents))) => Ok(contents.clone()),
            Some((_, None)) => Err(FileSourceError::NotUtf8(path.to_owned())),
            None => Err(FileSourceError::NotFound(path.to_owned())),
        }
    }
}
