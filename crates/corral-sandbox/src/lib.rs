//! Confinement for shell scripts.
//!
//! The `corral-sandbox` crate runs shell scripts so that every filesystem
//! effect and every process launch stays inside a declared root directory
//! and an explicit list of executable search paths. Scripts are parsed and
//! run by `corral-shell`; the sandbox plugs into that engine at its two
//! capability seams:
//!
//! - opening files, listing directories for globs and changing directory go
//!   through an opener that resolves each path under the root first;
//! - every command goes through a dispatcher that runs builtins (`ls`,
//!   `mkdir`, `rm`, `touch`, `cat`, `cp`, `mv`, `ln`) on resolved paths,
//!   runs allowed executables, and refuses everything else.
//!
//! A path that resolves outside the root is a [`SandboxError::Violation`],
//! never clamped. `..` segments and symlinks are followed before the check.
//!
//! ```rust,no_run
//! use corral_sandbox::{ErrorKind, Sandbox};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sandbox = Sandbox::builder("/tmp/sbx").path(["/usr/bin"]).build()?;
//! sandbox.evaluate("mkdir -p build && echo ok > build/status")?;
//!
//! let error = sandbox.evaluate("rm -rf /").expect_err("escapes the root");
//! assert_eq!(error.kind(), ErrorKind::Violation);
//! # Ok(()) }
//! ```
//!
//! A [`Sandbox`] evaluates one script at a time; [`Sandbox::evaluate`]
//! takes `&mut self`. Use one sandbox per concurrent script.

mod builtins;
mod dispatch;
mod error;
mod interceptor;
mod resolver;
mod session;

pub use error::{ErrorKind, SandboxError};
pub use resolver::SandboxRoot;
pub use session::{Sandbox, SandboxBuilder};

#[cfg(test)]
mod tests;
