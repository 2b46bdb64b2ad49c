//! Capability traits through which the runner touches the outside world.
//!
//! The runner never opens a file, lists a directory, changes directory or
//! launches a program by itself. Every such request is routed through an
//! [`Opener`] or an [`Executor`] supplied when the runner is built, so the
//! host decides what a script may reach.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::HandlerError;

/// How a redirection target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `< file`
    Read,
    /// `> file`: create or truncate.
    Truncate,
    /// `>> file`: create or append.
    Append,
}

impl OpenMode {
    /// Returns the [`OpenOptions`] matching this mode.
    #[must_use]
    pub fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::Read => {
                options.read(true);
            }
            Self::Truncate => {
                options.write(true).create(true).truncate(true);
            }
            Self::Append => {
                options.append(true).create(true);
            }
        }
        options
    }
}

/// Filesystem access requested by the runner itself.
///
/// `dir` is always the runner's current directory and `path` the raw,
/// already-expanded path from the script.
pub trait Opener {
    /// Opens a redirection target.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the host refuses or the open fails.
    fn open(&self, dir: &Path, path: &str, mode: OpenMode) -> Result<File, HandlerError>;

    /// Lists the entry names of a directory for pathname expansion.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the directory may not or cannot be
    /// listed; the pattern is then left unexpanded.
    fn read_dir(&self, dir: &Path, path: &str) -> Result<Vec<String>, HandlerError>;

    /// Resolves the target of `cd`, returning the new absolute directory.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the host refuses or the target is not
    /// a directory.
    fn change_dir(&self, dir: &Path, path: &str) -> Result<PathBuf, HandlerError>;
}

/// Runs every command that is not an engine builtin.
pub trait Executor {
    /// Executes `argv`, returning the command's exit status.
    ///
    /// `argv` always holds at least the command name.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the command cannot be run; the runner
    /// records it and treats the command as failed with status 1.
    fn exec(&self, ctx: &mut HandlerContext<'_>, argv: &[String]) -> Result<u8, HandlerError>;
}

/// Per-command view of the runner handed to an [`Executor`].
pub struct HandlerContext<'a> {
    dir: &'a Path,
    env: &'a [(String, String)],
    stdin: &'a mut dyn Read,
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
}

impl<'a> HandlerContext<'a> {
    /// Bundles a directory, environment and streams into a context.
    #[must_use]
    pub const fn new(
        dir: &'a Path,
        env: &'a [(String, String)],
        stdin: &'a mut dyn Read,
        stdout: &'a mut dyn Write,
        stderr: &'a mut dyn Write,
    ) -> Self {
        Self {
            dir,
            env,
            stdin,
            stdout,
            stderr,
        }
    }

    /// The runner's current directory.
    #[must_use]
    pub const fn dir(&self) -> &Path {
        self.dir
    }

    /// Exported variables visible to the command.
    #[must_use]
    pub const fn env(&self) -> &[(String, String)] {
        self.env
    }

    /// Standard input for the command.
    pub const fn stdin(&mut self) -> &mut dyn Read {
        &mut *self.stdin
    }

    /// Standard output for the command.
    pub const fn stdout(&mut self) -> &mut dyn Write {
        &mut *self.stdout
    }

    /// Standard error for the command.
    pub const fn stderr(&mut self) -> &mut dyn Write {
        &mut *self.stderr
    }
}
