//! Directory-backed file source with capability-scoped access.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io;

use crate::audit::{
    domain::{ScanConfig, SourceFile},
    ports::{FileSource, FileSourceError, FileSourceResult},
};

/// Lists and reads files beneath a project root.
///
/// All access goes through a [`Dir`] handle opened on the root, so paths
/// cannot escape it. Hidden entries and symlinks are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryFileSource {
    root: Utf8PathBuf,
}

impl DirectoryFileSource {
    /// Creates a file source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the project root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    async fn run_blocking<F, T>(&self, f: F) -> FileSourceResult<T>
    where
        F: FnOnce(&Dir) -> FileSourceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let dir = Dir::open_ambient_dir(&root, ambient_authority())?;
            f(&dir)
        })
        .await
        .map_err(|err| FileSourceError::from(io::Error::other(err)))?
    }
}

#[async_trait]
impl FileSource for DirectoryFileSource {
    async fn list_files(&self, config: &ScanConfig) -> FileSourceResult<Vec<SourceFile>> {
        let excludes = build_excludes(config.exclude_patterns())?;
        let max_depth = config.max_depth();
        self.run_blocking(move |dir| {
            let mut files = Vec::new();
            let walk = Walk {
                excludes: &excludes,
                max_depth,
            };
            walk.visit(dir, Utf8Path::new(""), 0, &mut files)?;
            files.sort_by(|left, right| left.path().cmp(right.path()));
            Ok(files)
        })
        .await
    }

    async fn read_to_string(&self, file: &SourceFile) -> FileSourceResult<String> {
        let path = file.path().to_owned();
        self.run_blocking(move |dir| {
            dir.read_to_string(&path).map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => FileSourceError::NotFound(path.to_string()),
                io::ErrorKind::InvalidData => FileSourceError::NotUtf8(path.to_string()),
                _ => FileSourceError::from(err),
            })
        })
        .await
    }
}

fn build_excludes(patterns: &[String]) -> FileSourceResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| FileSourceError::from(io::Error::new(io::ErrorKind::InvalidInput, err)))
}

struct Walk<'a> {
    excludes: &'a GlobSet,
    max_depth: Option<u32>,
}

impl Walk<'_> {
    fn visit(
        &self,
        dir: &Dir,
        prefix: &Utf8Path,
        depth: u32,
        files: &mut Vec<SourceFile>,
    ) -> io::Result<()> {
        for item in dir.entries()? {
            let entry = item?;
            let name = entry.file_name()?;
            if name.starts_with('.') {
                continue;
            }
            let relative = prefix.join(&name);
            if self.excludes.is_match(relative.as_str()) {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if self.max_depth.is_none_or(|limit| depth < limit) {
                    let child = entry.open_dir()?;
                    self.visit(&child, &relative, depth.saturating_add(1), files)?;
                }
            } else if file_type.is_file() {
                files.push(SourceFile::new(relative).map_err(io::Error::other)?);
            }
        }
        Ok(())
    }
}
