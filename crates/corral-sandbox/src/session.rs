//! Sandbox sessions: one root, one engine, many evaluations.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use corral_shell::{Runner, RunnerBuilder, parse};
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::error::SandboxError;
use crate::interceptor::OpenInterceptor;
use crate::resolver::SandboxRoot;

/// Runs shell scripts confined to a root directory.
///
/// The session owns its script engine. Every [`Sandbox::evaluate`] call
/// starts from the same clean state: working directory at the root, only the
/// injected variables set, and `set -e` only when fail-fast was requested.
pub struct Sandbox {
    root: SandboxRoot,
    runner: Runner,
}

impl Sandbox {
    /// Creates a sandbox rooted at `root` with default options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `root` is missing or not a
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        Self::builder(root).build()
    }

    /// Starts configuring a sandbox rooted at `root`.
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> SandboxBuilder {
        SandboxBuilder::new(root)
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Parses and runs `script`.
    ///
    /// Engine state is reset before the run, so nothing from a previous call
    /// is visible.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::ScriptSyntax`] for malformed scripts. Otherwise
    /// returns the first sandbox denial, the error that aborted a fail-fast
    /// run, or the error of the final failing command.
    pub fn evaluate(&mut self, script: &str) -> Result<(), SandboxError> {
        let parsed = parse(script)?;
        self.runner.reset();
        debug!(root = %self.root.path().display(), lists = parsed.len(), "evaluating script");
        self.runner.run(&parsed).map_err(SandboxError::from_run)
    }
}

/// Builder for [`Sandbox`].
pub struct SandboxBuilder {
    root: PathBuf,
    search_path: Vec<PathBuf>,
    env: Vec<(String, String)>,
    fail_fast: bool,
    stdin: Option<Box<dyn Read + Send>>,
    stdout: Option<Box<dyn Write + Send>>,
    stderr: Option<Box<dyn Write + Send>>,
}

impl SandboxBuilder {
    fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search_path: Vec::new(),
            env: Vec::new(),
            fail_fast: false,
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Appends directories searched for non-builtin commands. Relative
    /// entries are taken relative to the root.
    #[must_use]
    pub fn path<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Injects an exported variable into every evaluation.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs every evaluation under `set -e`.
    #[must_use]
    pub const fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Replaces the scripts' standard input, which is empty by default.
    #[must_use]
    pub fn stdin(mut self, stdin: impl Read + Send + 'static) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    /// Replaces the scripts' standard output.
    #[must_use]
    pub fn stdout(mut self, stdout: impl Write + Send + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    /// Replaces the scripts' standard error.
    #[must_use]
    pub fn stderr(mut self, stderr: impl Write + Send + 'static) -> Self {
        self.stderr = Some(Box::new(stderr));
        self
    }

    /// Canonicalises the root and builds the sandbox.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::RootUnavailable`] or
    /// [`SandboxError::RootNotDirectory`] for an unusable root.
    pub fn build(self) -> Result<Sandbox, SandboxError> {
        let root = SandboxRoot::new(&self.root)?;
        let search_path: Vec<PathBuf> = self
            .search_path
            .into_iter()
            .map(|entry| root.path().join(entry))
            .collect();
        info!(
            root = %root.path().display(),
            search_path = ?search_path,
            "sandbox ready"
        );

        let mut builder = RunnerBuilder::new(
            root.path(),
            OpenInterceptor::new(root.clone()),
            Dispatcher::new(root.clone(), search_path),
        )
        .errexit(self.fail_fast);
        for (key, value) in self.env {
            builder = builder.env(key, value);
        }
        if let Some(stdin) = self.stdin {
            builder = builder.stdin(stdin);
        }
        if let Some(stdout) = self.stdout {
            builder = builder.stdout(stdout);
        }
        if let Some(stderr) = self.stderr {
            builder = builder.stderr(stderr);
        }

        Ok(Sandbox {
            root,
            runner: builder.build(),
        })
    }
}
