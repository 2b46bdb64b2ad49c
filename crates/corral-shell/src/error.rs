//! Error types raised while parsing and running scripts.
//!
//! Parse failures carry the line and column at which the lexer or parser
//! gave up. Run failures distinguish a plain non-zero exit status from an
//! error reported by one of the injected capability handlers, so the host can
//! recover its own error type from the boxed source.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Boxed error returned by capability handlers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while turning script text into a [`crate::Script`].
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// A quoted section was not closed before the end of input.
    #[error("{line}:{column}: unterminated {quote} quote")]
    UnterminatedQuote {
        /// Human-readable quote name (`single` or `double`).
        quote: &'static str,
        /// Line at which the quote was opened.
        line: usize,
        /// Column at which the quote was opened.
        column: usize,
    },

    /// A `${` expansion was not closed.
    #[error("{line}:{column}: unterminated parameter expansion")]
    UnterminatedExpansion {
        /// Line at which the expansion started.
        line: usize,
        /// Column at which the expansion started.
        column: usize,
    },

    /// A token appeared where the grammar does not allow it.
    #[error("{line}:{column}: unexpected {found}")]
    UnexpectedToken {
        /// Description of the offending token.
        found: String,
        /// Line of the offending token.
        line: usize,
        /// Column of the offending token.
        column: usize,
    },

    /// The script ended while a construct was still open.
    #[error("unexpected end of script: expected {expected}")]
    UnexpectedEnd {
        /// Description of what the parser was waiting for.
        expected: &'static str,
    },

    /// The script uses shell syntax this engine deliberately omits.
    #[error("{line}:{column}: {construct} is not supported")]
    Unsupported {
        /// Description of the rejected construct.
        construct: String,
        /// Line of the construct.
        line: usize,
        /// Column of the construct.
        column: usize,
    },
}

impl ParseError {
    pub(crate) fn unexpected(found: impl Into<String>, line: usize, column: usize) -> Self {
        Self::UnexpectedToken {
            found: found.into(),
            line,
            column,
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Unsupported {
            construct: construct.into(),
            line,
            column,
        }
    }
}

/// Error returned by an [`crate::Opener`] or [`crate::Executor`].
///
/// Every handler error makes the command fail. A denial is additionally
/// remembered by the runner and reported once the run finishes, even if the
/// script recovered from the failed command.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The command failed; the script's own error policy decides what next.
    #[error("{0}")]
    Failure(BoxError),
    /// The host refused the operation.
    #[error("{0}")]
    Denied(BoxError),
}

impl HandlerError {
    /// Wraps an ordinary command failure.
    pub fn failure(error: impl Into<BoxError>) -> Self {
        Self::Failure(error.into())
    }

    /// Wraps a refusal by the host.
    pub fn denied(error: impl Into<BoxError>) -> Self {
        Self::Denied(error.into())
    }

    /// Returns true when the host refused the operation.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn into_source(self) -> BoxError {
        match self {
            Self::Failure(source) | Self::Denied(source) => source,
        }
    }
}

/// Errors surfaced by [`crate::Runner::run`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The script finished, or was aborted, with a non-zero status.
    #[error("exit status {0}")]
    ExitStatus(u8),

    /// A capability handler reported an error.
    #[error("{source}")]
    Handler {
        /// Name of the command (or engine operation) that failed.
        command: String,
        /// True when the handler refused the operation.
        denied: bool,
        /// The error produced by the handler.
        #[source]
        source: BoxError,
    },

    /// Writing to one of the runner's standard streams failed.
    #[error("failed to write to {stream}: {source}")]
    Stream {
        /// Name of the stream.
        stream: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub(crate) fn handler(command: &str, error: HandlerError) -> Self {
        let denied = error.is_denial();
        Self::Handler {
            command: command.to_owned(),
            denied,
            source: error.into_source(),
        }
    }

    /// Returns true when this error records a host refusal.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(self, Self::Handler { denied: true, .. })
    }
}
