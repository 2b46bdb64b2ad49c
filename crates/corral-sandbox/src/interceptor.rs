//! Filesystem requests made by the script engine itself.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use corral_shell::{HandlerError, OpenMode, Opener};
use tracing::trace;

use crate::error::SandboxError;
use crate::resolver::SandboxRoot;

/// Vets redirection targets, glob listings and `cd` targets.
#[derive(Debug, Clone)]
pub(crate) struct OpenInterceptor {
    root: SandboxRoot,
}

impl OpenInterceptor {
    pub(crate) const fn new(root: SandboxRoot) -> Self {
        Self { root }
    }
}

impl Opener for OpenInterceptor {
    fn open(&self, dir: &Path, path: &str, mode: OpenMode) -> Result<File, HandlerError> {
        let resolved = self.root.resolve(dir, path)?;
        trace!(path = %resolved.display(), ?mode, "opening redirection target");
        mode.options()
            .open(&resolved)
            .map_err(|source| SandboxError::filesystem("open", path, source).into())
    }

    fn read_dir(&self, dir: &Path, path: &str) -> Result<Vec<String>, HandlerError> {
        let resolved = self.root.resolve(dir, path)?;
        trace!(path = %resolved.display(), "listing directory for expansion");
        fs::read_dir(&resolved)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|found| found.file_name().to_string_lossy().into_owned()))
                    .collect::<io::Result<Vec<_>>>()
            })
            .map_err(|source| SandboxError::filesystem("glob", path, source).into())
    }

    fn change_dir(&self, dir: &Path, path: &str) -> Result<PathBuf, HandlerError> {
        let resolved = self.root.resolve(dir, path)?;
        match fs::metadata(&resolved) {
            Ok(metadata) if metadata.is_dir() => Ok(resolved),
            Ok(_) => {
                let source = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
                Err(SandboxError::filesystem("cd", path, source).into())
            }
            Err(source) => Err(SandboxError::filesystem("cd", path, source).into()),
        }
    }
}
