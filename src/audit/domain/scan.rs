//! Scan configuration and the files a scan admits.

use super::AuditDomainError;
use camino::{Utf8Path, Utf8PathBuf};
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::fmt;

/// File selection rules persisted with each task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    exclude_patterns: Vec<String>,
    max_depth: Option<u32>,
}

impl ScanConfig {
    /// Creates a configuration that admits every file at any depth.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets glob exclusion patterns, matched against root-relative paths.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::BlankExcludePattern`] for blank entries and
    /// [`AuditDomainError::InvalidExcludePattern`] when a pattern does not
    /// parse as a glob.
    pub fn with_exclude_patterns(
        mut self,
        patterns: impl IntoIterator<Item = String>,
    ) -> Result<Self, AuditDomainError> {
        let mut validated = Vec::new();
        for raw in patterns {
            let pattern = raw.trim();
            if pattern.is_empty() {
                return Err(AuditDomainError::BlankExcludePattern);
            }
            Glob::new(pattern).map_err(|err| AuditDomainError::InvalidExcludePattern {
                pattern: pattern.to_owned(),
                reason: err.kind().to_string(),
            })?;
            validated.push(pattern.to_owned());
        }
        self.exclude_patterns = validated;
        Ok(self)
    }

    /// Limits directory traversal depth. Depth `0` admits only root files.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Returns the exclusion patterns.
    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    /// Returns the traversal depth limit, if any.
    #[must_use]
    pub const fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }
}

/// One file admitted to a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    path: Utf8PathBuf,
    language: Option<String>,
}

impl SourceFile {
    /// Creates a source file entry, inferring its language from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`AuditDomainError::EmptyFilePath`] when the path is blank.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Result<Self, AuditDomainError> {
        let raw: Utf8PathBuf = path.into();
        if raw.as_str().trim().is_empty() {
            return Err(AuditDomainError::EmptyFilePath);
        }
        let language = language_for_path(&raw).map(str::to_owned);
        Ok(Self {
            path: raw,
            language,
        })
    }

    /// Overrides the inferred language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let value = language.into();
        let normalized = value.trim();
        self.language = (!normalized.is_empty()).then(|| normalized.to_ascii_lowercase());
        self
    }

    /// Returns the root-relative path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the language, or `None` when it could not be inferred.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

fn language_for_path(path: &Utf8Path) -> Option<&'static str> {
    let extension = path.extension()?.to_ascii_lowercase();
    let language = match extension.as_str() {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "vue" => "vue",
        "dart" => "dart",
        _ => return None,
    };
    Some(language)
}
