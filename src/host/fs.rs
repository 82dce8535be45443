use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use log::debug;
use walkdir::WalkDir;

use super::{DocumentSymbol, Host, Location, TextPosition};
use crate::error::{GraphError, Result};

/// Host backed by the local filesystem. There is no language server behind it,
/// so outline and definition queries come back empty.
#[derive(Debug, Clone)]
pub struct FsHost {
    root: PathBuf,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn walk(&self, include: &GlobMatcher, exclude: Option<&GlobMatcher>, limit: usize) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
                !exclude.is_some_and(|matcher| {
                    matcher.is_match(relative) || matcher.is_match(relative.join("x"))
                })
            })
            .filter_map(|entry| entry.ok())
        {
            if found.len() >= limit {
                break;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if include.is_match(relative) {
                found.push(entry.path().to_path_buf());
            }
        }
        found
    }
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|error| GraphError::Unavailable(format!("invalid glob {pattern}: {error}")))
}

#[async_trait]
impl Host for FsHost {
    async fn open_document(&self, path: &Path) -> Result<()> {
        let path = self.resolve(path);
        if tokio::fs::metadata(&path).await.is_ok_and(|meta| meta.is_file()) {
            debug!("open {}", path.display());
            Ok(())
        } else {
            Err(GraphError::NotFound(path.display().to_string()))
        }
    }

    async fn close_document(&self, path: &Path) -> Result<()> {
        debug!("close {}", path.display());
        Ok(())
    }

    async fn read_document(&self, path: &Path) -> Result<String> {
        let path = self.resolve(path);
        tokio::fs::read_to_string(&path).await.map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => GraphError::NotFound(path.display().to_string()),
            _ => GraphError::Io(error),
        })
    }

    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(self.resolve(path))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn document_symbols(&self, _path: &Path) -> Result<Vec<DocumentSymbol>> {
        Ok(Vec::new())
    }

    async fn definition_location(
        &self,
        _path: &Path,
        _position: TextPosition,
    ) -> Result<Option<Location>> {
        Ok(None)
    }

    async fn find_files(
        &self,
        include: &str,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PathBuf>> {
        let include = compile_glob(include)?;
        let exclude = exclude.map(compile_glob).transpose()?;
        let host = self.clone();
        tokio::task::spawn_blocking(move || host.walk(&include, exclude.as_ref(), limit))
            .await
            .map_err(|error| GraphError::Unavailable(format!("file search aborted: {error}")))
    }
}
