//! Path containment checks.
//!
//! Every path a script reaches for is made absolute against the current
//! directory, normalised lexically, and then has its longest existing prefix
//! canonicalised so symlinks are followed the way the host would follow them.
//! The result must sit under the canonical root, compared component by
//! component, or the request is refused.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::SandboxError;

/// Upper bound on symlinks followed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

/// The canonical directory a sandbox is confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    path: PathBuf,
}

impl SandboxRoot {
    /// Canonicalises `path` and checks that it is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::RootUnavailable`] when the path cannot be
    /// canonicalised and [`SandboxError::RootNotDirectory`] when it is not a
    /// directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let supplied = root.as_ref();
        let canonical = fs::canonicalize(supplied).map_err(|source| SandboxError::RootUnavailable {
            path: supplied.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(SandboxError::RootNotDirectory { path: canonical });
        }
        Ok(Self { path: canonical })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves `raw` against `dir`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Violation`] when the resolved path is not the
    /// root or a descendant of it.
    pub fn resolve(&self, dir: &Path, raw: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let absolute = normalise(&dir.join(raw.as_ref()));
        self.contain(&absolute, canonicalise_existing(&absolute))
    }

    /// Resolves `raw` against `dir` without following a symlink in the final
    /// component, for operations that act on a directory entry itself
    /// (`rm`, `mv`, `ln`).
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Violation`] when the entry's parent is outside
    /// the root or the entry is the root itself.
    pub fn resolve_entry(
        &self,
        dir: &Path,
        raw: impl AsRef<Path>,
    ) -> Result<PathBuf, SandboxError> {
        let absolute = normalise(&dir.join(raw.as_ref()));
        let resolved = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => canonicalise_existing(parent).join(name),
            _ => canonicalise_existing(&absolute),
        };
        if resolved == self.path {
            warn!(path = %absolute.display(), "refusing to operate on the sandbox root");
            return Err(SandboxError::Violation { path: absolute });
        }
        self.contain(&absolute, resolved)
    }

    fn contain(&self, absolute: &Path, resolved: PathBuf) -> Result<PathBuf, SandboxError> {
        if resolved.starts_with(&self.path) {
            Ok(resolved)
        } else {
            warn!(
                path = %absolute.display(),
                resolved = %resolved.display(),
                "path escapes sandbox root"
            );
            Err(SandboxError::Violation {
                path: absolute.to_path_buf(),
            })
        }
    }
}

/// Removes `.` and `..` components without touching the filesystem. `..` at
/// the filesystem root stays at the root.
fn normalise(path: &Path) -> PathBuf {
    let mut normalised = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalised.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                normalised.pop();
            }
        }
    }
    normalised
}

/// Canonicalises the longest existing prefix of an absolute, normalised path
/// and appends the remaining components unchanged.
fn canonicalise_existing(path: &Path) -> PathBuf {
    canonicalise_with_hops(path, MAX_SYMLINK_HOPS)
}

fn canonicalise_with_hops(path: &Path, hops: usize) -> PathBuf {
    let mut existing = path;
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return append(canonical, &missing);
        }
        // A dangling symlink fails to canonicalise but still redirects any
        // write through it, so follow it by hand.
        if hops > 0
            && let Ok(target) = fs::read_link(existing)
            && let Some(parent) = existing.parent()
        {
            let redirected = normalise(&parent.join(target));
            return append(canonicalise_with_hops(&redirected, hops - 1), &missing);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn append(mut base: PathBuf, missing: &[OsString]) -> PathBuf {
    for name in missing.iter().rev() {
        base.push(name);
    }
    base
}
