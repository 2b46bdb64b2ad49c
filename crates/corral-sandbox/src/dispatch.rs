//! Routing of every command the script engine cannot run itself.
//!
//! A command is either a registered builtin, an executable under the root
//! named by a path (`./configure`), or an executable found in one of the
//! configured search-path directories. Anything else is refused before the
//! filesystem is touched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use corral_shell::{Executor, HandlerContext, HandlerError};
use tracing::{debug, warn};

use crate::builtins::{self, CommandContext};
use crate::error::SandboxError;
use crate::resolver::SandboxRoot;

/// Executes commands on behalf of the script engine.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    root: SandboxRoot,
    search_path: Vec<PathBuf>,
}

impl Dispatcher {
    pub(crate) const fn new(root: SandboxRoot, search_path: Vec<PathBuf>) -> Self {
        Self { root, search_path }
    }

    fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        argv: &[String],
    ) -> Result<u8, SandboxError> {
        let Some((name, args)) = argv.split_first() else {
            return Ok(0);
        };
        if let Some(construct) = builtins::lookup(name) {
            debug!(command = %name, "running builtin");
            let builtin = construct(argv)?;
            builtin.run(&mut CommandContext::new(&self.root, ctx, name))?;
            return Ok(0);
        }

        let program = self.locate(ctx.dir(), name)?;
        debug!(command = %name, program = %program.display(), "running external program");
        run_external(name, &program, args, ctx)
    }

    /// Finds the executable for a non-builtin command.
    fn locate(&self, dir: &Path, name: &str) -> Result<PathBuf, SandboxError> {
        let found = if name.contains('/') {
            self.root
                .resolve(dir, name)
                .ok()
                .filter(|path| is_executable(path))
        } else {
            self.search_path
                .iter()
                .map(|entry| entry.join(name))
                .find(|candidate| is_executable(candidate))
        };
        found.ok_or_else(|| {
            warn!(command = %name, "command not available in sandbox");
            SandboxError::UnsupportedCommand {
                command: name.to_owned(),
            }
        })
    }
}

impl Executor for Dispatcher {
    fn exec(&self, ctx: &mut HandlerContext<'_>, argv: &[String]) -> Result<u8, HandlerError> {
        self.dispatch(ctx, argv).map_err(HandlerError::from)
    }
}

fn run_external(
    name: &str,
    program: &Path,
    args: &[String],
    ctx: &mut HandlerContext<'_>,
) -> Result<u8, SandboxError> {
    let spawn_error = |source| SandboxError::filesystem(name, program, source);

    let mut input = Vec::new();
    ctx.stdin()
        .read_to_end(&mut input)
        .map_err(|source| SandboxError::output(name, source))?;

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(ctx.env().iter().map(|(key, value)| (key, value)))
        .current_dir(ctx.dir())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    let stdin = child.stdin.take();
    let output = thread::scope(|scope| {
        if let Some(mut pipe) = stdin {
            // The child may exit without reading its input.
            scope.spawn(move || pipe.write_all(&input).ok());
        }
        child.wait_with_output()
    })
    .map_err(spawn_error)?;

    ctx.stdout()
        .write_all(&output.stdout)
        .and_then(|()| ctx.stderr().write_all(&output.stderr))
        .map_err(|source| SandboxError::output(name, source))?;

    let status = output
        .status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1);
    debug!(command = %name, status, "external program finished");
    Ok(status)
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && has_exec_bit(&metadata))
}

#[cfg(unix)]
fn has_exec_bit(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
const fn has_exec_bit(_metadata: &fs::Metadata) -> bool {
    true
}
