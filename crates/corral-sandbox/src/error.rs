//! Domain errors raised by the sandbox.

use std::io;
use std::path::PathBuf;

use corral_shell::{HandlerError, ParseError, RunError};
use thiserror::Error;
use tracing::warn;

/// Errors raised while building a sandbox or evaluating a script in it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SandboxError {
    /// The root directory could not be canonicalised.
    #[error("sandbox root {path} is unavailable: {source}")]
    RootUnavailable {
        /// Root as supplied by the caller.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// The root exists but is not a directory.
    #[error("sandbox root {path} is not a directory")]
    RootNotDirectory {
        /// Canonical form of the supplied root.
        path: PathBuf,
    },

    /// A path resolved outside the sandbox root.
    #[error("sandbox violation: {path} is outside the sandbox root")]
    Violation {
        /// The offending path, made absolute.
        path: PathBuf,
    },

    /// The command is neither a builtin nor an allowed executable.
    #[error("unsupported command: {command}")]
    UnsupportedCommand {
        /// Name the script used for the command.
        command: String,
    },

    /// A builtin rejected its arguments.
    #[error("{command}: {message}")]
    OptionParse {
        /// Builtin name.
        command: String,
        /// Description of the problem.
        message: String,
    },

    /// A filesystem operation failed on an allowed path.
    #[error("{command}: {path}: {source}")]
    Filesystem {
        /// Command (or `open` for redirections) that made the call.
        command: String,
        /// Path as written in the script.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// A builtin could not write to its output stream.
    #[error("{command}: write error: {source}")]
    Output {
        /// Builtin name.
        command: String,
        /// Underlying IO error.
        source: io::Error,
    },

    /// The script could not be parsed.
    #[error("syntax error: {0}")]
    ScriptSyntax(#[from] ParseError),

    /// The script failed for a reason the sandbox did not cause.
    #[error("script failed: {0}")]
    ScriptRuntime(#[source] RunError),
}

/// Coarse classification of a [`SandboxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The sandbox could not be built.
    Configuration,
    /// A path escaped the root.
    Violation,
    /// A command is not available inside the sandbox.
    UnsupportedCommand,
    /// A builtin was called with malformed options.
    OptionParse,
    /// An operation on an allowed path failed.
    Filesystem,
    /// The script is malformed.
    ScriptSyntax,
    /// The script failed at run time.
    ScriptRuntime,
}

impl SandboxError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RootUnavailable { .. } | Self::RootNotDirectory { .. } => {
                ErrorKind::Configuration
            }
            Self::Violation { .. } => ErrorKind::Violation,
            Self::UnsupportedCommand { .. } => ErrorKind::UnsupportedCommand,
            Self::OptionParse { .. } => ErrorKind::OptionParse,
            Self::Filesystem { .. } | Self::Output { .. } => ErrorKind::Filesystem,
            Self::ScriptSyntax(_) => ErrorKind::ScriptSyntax,
            Self::ScriptRuntime(_) => ErrorKind::ScriptRuntime,
        }
    }

    /// Returns true when the error marks the sandbox boundary: a violation
    /// or an unsupported command.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::Violation { .. } | Self::UnsupportedCommand { .. }
        )
    }

    /// Returns true when the script's stderr has not seen this error.
    ///
    /// Command failures are written to the script's stderr as they happen,
    /// and a bare exit status has no message, so a host only needs to report
    /// errors raised before the run started or by the streams themselves.
    #[must_use]
    pub const fn needs_reporting(&self) -> bool {
        matches!(
            self,
            Self::RootUnavailable { .. }
                | Self::RootNotDirectory { .. }
                | Self::ScriptSyntax(_)
                | Self::ScriptRuntime(RunError::Stream { .. })
        )
    }

    pub(crate) fn filesystem(
        command: &str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            command: command.to_owned(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn output(command: &str, source: io::Error) -> Self {
        Self::Output {
            command: command.to_owned(),
            source,
        }
    }

    /// Recovers the sandbox error carried by a failed run, if any.
    pub(crate) fn from_run(error: RunError) -> Self {
        match error {
            RunError::Handler {
                command,
                denied,
                source,
            } => match source.downcast::<Self>() {
                Ok(inner) => *inner,
                Err(source) => Self::ScriptRuntime(RunError::Handler {
                    command,
                    denied,
                    source,
                }),
            },
            other => Self::ScriptRuntime(other),
        }
    }
}

impl From<SandboxError> for HandlerError {
    fn from(error: SandboxError) -> Self {
        if error.is_denial() {
            warn!(%error, "sandbox refused operation");
            Self::denied(error)
        } else {
            Self::failure(error)
        }
    }
}
