//! A small POSIX shell interpreter whose side effects go through injected
//! handlers.
//!
//! `corral-shell` parses a practical subset of the POSIX shell language and
//! runs it with a [`Runner`]. The runner keeps its own variables, options and
//! current directory, and handles the few builtins that act on that state
//! (`cd`, `export`, `set`, `exit` and friends). Everything else is delegated:
//!
//! - every non-builtin command goes to an [`Executor`];
//! - redirection targets, glob listings and `cd` targets go to an
//!   [`Opener`].
//!
//! A host that implements both traits therefore sees every filesystem path
//! and every program a script reaches for, which is what makes the engine
//! suitable for confinement.
//!
//! Compound commands beyond subshells and brace groups (`if`, loops, `case`,
//! functions), command substitution, background jobs and here-documents are
//! rejected at parse time with [`ParseError::Unsupported`].

mod ast;
mod error;
mod expand;
mod handler;
mod lexer;
mod parser;
mod runner;

pub use ast::Script;
pub use error::{BoxError, HandlerError, ParseError, RunError};
pub use handler::{Executor, HandlerContext, OpenMode, Opener};
pub use parser::parse;
pub use runner::{Runner, RunnerBuilder};

#[cfg(test)]
mod tests;
