//! Executes parsed scripts.
//!
//! A [`Runner`] owns the run-state of a script (directory, variables,
//! options, last exit status) and the two capability handlers. The
//! run-state is reset in place by [`Runner::reset`], so one runner can
//! evaluate many scripts without state leaking between them.

mod builtins;
mod redirect;

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{AndOr, Command, Connector, Pipeline, Script, SimpleCommand};
use crate::error::{HandlerError, RunError};
use crate::expand::{expand_string, expand_words};
use crate::handler::{Executor, HandlerContext, Opener};

use builtins::EngineBuiltin;
use redirect::Io;

#[derive(Debug, Clone)]
struct Variable {
    value: String,
    exported: bool,
}

/// Mutable run-state of a script.
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) dir: PathBuf,
    vars: BTreeMap<String, Variable>,
    errexit: bool,
    xtrace: bool,
    status: u8,
}

impl State {
    fn new(dir: PathBuf, env: &[(String, String)], errexit: bool) -> Self {
        let vars = env
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    Variable {
                        value: value.clone(),
                        exported: true,
                    },
                )
            })
            .collect();
        Self {
            dir,
            vars,
            errexit,
            xtrace: false,
            status: 0,
        }
    }

    pub(crate) fn var(&self, name: &str) -> Option<String> {
        if name == "?" {
            return Some(self.status.to_string());
        }
        self.vars.get(name).map(|variable| variable.value.clone())
    }

    fn set_var(&mut self, name: &str, value: String) {
        self.vars
            .entry(name.to_owned())
            .and_modify(|variable| variable.value.clone_from(&value))
            .or_insert(Variable {
                value,
                exported: false,
            });
    }

    fn export(&mut self, name: &str, value: Option<String>) {
        let variable = self.vars.entry(name.to_owned()).or_insert(Variable {
            value: String::new(),
            exported: true,
        });
        variable.exported = true;
        if let Some(assigned) = value {
            variable.value = assigned;
        }
    }

    fn unset(&mut self, name: &str) {
        self.vars.remove(name);
    }

    fn exported(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter(|(_, variable)| variable.exported)
            .map(|(name, variable)| (name.clone(), variable.value.clone()))
            .collect()
    }
}

/// Reason a run stopped before reaching the end of the script.
enum Halt {
    /// `exit` was called; the status is already recorded.
    Exit,
    /// `set -e` aborted the run.
    Error(RunError),
}

type Flow = Result<(), Halt>;

struct Streams {
    stdin: Box<dyn Read + Send>,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
}

/// Builder for [`Runner`].
pub struct RunnerBuilder {
    dir: PathBuf,
    env: Vec<(String, String)>,
    errexit: bool,
    streams: Streams,
    opener: Box<dyn Opener + Send>,
    executor: Box<dyn Executor + Send>,
}

impl RunnerBuilder {
    /// Starts a runner in `dir` with the given capability handlers.
    ///
    /// The environment starts empty, stdin is empty, and stdout and stderr
    /// are the process streams.
    pub fn new(
        dir: impl Into<PathBuf>,
        opener: impl Opener + Send + 'static,
        executor: impl Executor + Send + 'static,
    ) -> Self {
        Self {
            dir: dir.into(),
            env: Vec::new(),
            errexit: false,
            streams: Streams {
                stdin: Box::new(io::empty()),
                stdout: Box::new(io::stdout()),
                stderr: Box::new(io::stderr()),
            },
            opener: Box::new(opener),
            executor: Box::new(executor),
        }
    }

    /// Adds an exported variable to the initial environment.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Starts every run with `set -e` in effect.
    #[must_use]
    pub const fn errexit(mut self, enabled: bool) -> Self {
        self.errexit = enabled;
        self
    }

    /// Replaces standard input.
    #[must_use]
    pub fn stdin(mut self, stdin: impl Read + Send + 'static) -> Self {
        self.streams.stdin = Box::new(stdin);
        self
    }

    /// Replaces standard output.
    #[must_use]
    pub fn stdout(mut self, stdout: impl Write + Send + 'static) -> Self {
        self.streams.stdout = Box::new(stdout);
        self
    }

    /// Replaces standard error.
    #[must_use]
    pub fn stderr(mut self, stderr: impl Write + Send + 'static) -> Self {
        self.streams.stderr = Box::new(stderr);
        self
    }

    /// Builds the runner.
    #[must_use]
    pub fn build(self) -> Runner {
        let initial = State::new(self.dir, &self.env, self.errexit);
        Runner {
            state: initial.clone(),
            initial,
            streams: self.streams,
            opener: self.opener,
            executor: self.executor,
        }
    }
}

/// Runs scripts against injected capability handlers.
pub struct Runner {
    initial: State,
    state: State,
    streams: Streams,
    opener: Box<dyn Opener + Send>,
    executor: Box<dyn Executor + Send>,
}

impl Runner {
    /// Runs `script` to completion or to the first fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first handler denial if any occurred; otherwise the error
    /// that aborted the run under `set -e`; otherwise, when the final status
    /// is non-zero, the error of the failing command or
    /// [`RunError::ExitStatus`].
    pub fn run(&mut self, script: &Script) -> Result<(), RunError> {
        debug!(lists = script.len(), dir = %self.state.dir.display(), "running script");
        let Self {
            initial,
            state,
            streams,
            opener,
            executor,
        } = self;
        let mut machine = Machine {
            state,
            home: &initial.dir,
            opener: &**opener,
            executor: &**executor,
            denial: None,
            last_failure: None,
            condition_depth: 0,
        };
        let mut io = Io {
            stdin: &mut *streams.stdin,
            stdout: &mut *streams.stdout,
            stderr: &mut *streams.stderr,
        };
        let result = machine.script(script, &mut io);
        let flushed = io.stdout.flush();
        io.stderr.flush().ok();
        let outcome = machine.finish(result);
        match flushed {
            Err(source) if outcome.is_ok() => Err(RunError::Stream {
                stream: "stdout",
                source,
            }),
            _ => outcome,
        }
    }

    /// Restores the initial directory, environment and options and clears
    /// the exit status.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
    }

    /// The current directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.state.dir
    }

    /// The value of a shell variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<String> {
        self.state.var(name)
    }

    /// Exit status of the last command.
    #[must_use]
    pub const fn status(&self) -> u8 {
        self.state.status
    }
}

pub(crate) struct Machine<'r> {
    state: &'r mut State,
    home: &'r Path,
    opener: &'r (dyn Opener + Send),
    executor: &'r (dyn Executor + Send),
    denial: Option<RunError>,
    last_failure: Option<RunError>,
    /// Non-zero while running the left side of `&&`/`||` or a negated
    /// pipeline, where failures do not trigger `set -e`.
    condition_depth: usize,
}

impl Machine<'_> {
    fn finish(&mut self, result: Flow) -> Result<(), RunError> {
        let aborted = match result {
            Ok(()) | Err(Halt::Exit) => None,
            Err(Halt::Error(error)) => Some(error),
        };
        if let Some(denial) = self.denial.take() {
            return Err(denial);
        }
        if let Some(error) = aborted {
            return Err(error);
        }
        match self.state.status {
            0 => Ok(()),
            status => Err(self
                .last_failure
                .take()
                .unwrap_or(RunError::ExitStatus(status))),
        }
    }

    fn script(&mut self, script: &Script, io: &mut Io<'_>) -> Flow {
        for item in &script.items {
            self.and_or(item, io)?;
        }
        Ok(())
    }

    fn and_or(&mut self, list: &AndOr, io: &mut Io<'_>) -> Flow {
        self.pipeline(&list.first, io, !list.rest.is_empty())?;
        for (index, (connector, pipeline)) in list.rest.iter().enumerate() {
            let proceed = match connector {
                Connector::And => self.state.status == 0,
                Connector::Or => self.state.status != 0,
            };
            if proceed {
                let last = index + 1 == list.rest.len();
                self.pipeline(pipeline, io, !last)?;
            }
        }
        Ok(())
    }

    fn pipeline(&mut self, pipeline: &Pipeline, io: &mut Io<'_>, tested: bool) -> Flow {
        let condition = tested || pipeline.negated;
        if condition {
            self.condition_depth += 1;
        }
        let result = self.stages(&pipeline.commands, io);
        if condition {
            self.condition_depth -= 1;
        }
        result?;

        if pipeline.negated {
            self.state.status = u8::from(self.state.status == 0);
        }
        if self.state.status == 0 {
            self.last_failure = None;
        } else if self.state.errexit && self.condition_depth == 0 && !condition {
            return Err(Halt::Error(self.abort_error()));
        }
        Ok(())
    }

    fn abort_error(&mut self) -> RunError {
        self.last_failure
            .take()
            .unwrap_or(RunError::ExitStatus(self.state.status))
    }

    /// Runs pipeline stages one after another, buffering each stage's output
    /// into the next stage's input.
    fn stages(&mut self, commands: &[Command], io: &mut Io<'_>) -> Flow {
        if let [command] = commands {
            return self.command(command, io);
        }
        let mut input: Option<Vec<u8>> = None;
        for (index, command) in commands.iter().enumerate() {
            let last = index + 1 == commands.len();
            let mut cursor = input.take().map(Cursor::new);
            let mut captured = Vec::new();
            let saved = self.state.clone();
            let result = {
                let stdin: &mut dyn Read = match cursor.as_mut() {
                    Some(buffered) => buffered,
                    None => &mut *io.stdin,
                };
                let stdout: &mut dyn Write = if last {
                    &mut *io.stdout
                } else {
                    &mut captured
                };
                let mut stage = Io {
                    stdin,
                    stdout,
                    stderr: &mut *io.stderr,
                };
                self.command(command, &mut stage)
            };
            self.restore(saved);
            match result {
                Ok(()) | Err(Halt::Exit) => {}
                Err(halt) => return Err(halt),
            }
            input = Some(captured);
        }
        Ok(())
    }

    /// Restores a saved state while keeping the latest exit status.
    fn restore(&mut self, saved: State) {
        let status = self.state.status;
        *self.state = saved;
        self.state.status = status;
    }

    fn command(&mut self, command: &Command, io: &mut Io<'_>) -> Flow {
        match command {
            Command::Simple(simple) => self.simple(simple, io),
            Command::Subshell { body, redirects } => {
                self.with_redirects(redirects, io, |machine, io| {
                    let saved = machine.state.clone();
                    let result = machine.script(body, io);
                    machine.restore(saved);
                    match result {
                        Err(Halt::Exit) => Ok(()),
                        other => other,
                    }
                })
            }
            Command::Group { body, redirects } => {
                self.with_redirects(redirects, io, |machine, io| machine.script(body, io))
            }
        }
    }

    fn simple(&mut self, command: &SimpleCommand, io: &mut Io<'_>) -> Flow {
        let argv = expand_words(&command.words, self.state, self.opener);
        let assignments: Vec<(String, String)> = command
            .assignments
            .iter()
            .map(|assignment| {
                (
                    assignment.name.clone(),
                    expand_string(&assignment.value, self.state),
                )
            })
            .collect();

        if argv.is_empty() {
            for (name, value) in assignments {
                self.state.set_var(&name, value);
            }
            self.state.status = 0;
            self.last_failure = None;
            return self.with_redirects(&command.redirects, io, |_, _| Ok(()));
        }

        if self.state.xtrace {
            writeln!(io.stderr, "+ {}", argv.join(" ")).ok();
        }
        self.with_redirects(&command.redirects, io, |machine, io| {
            machine.invoke(&argv, &assignments, io)
        })
    }

    fn invoke(
        &mut self,
        argv: &[String],
        assignments: &[(String, String)],
        io: &mut Io<'_>,
    ) -> Flow {
        let Some(name) = argv.first() else {
            return Ok(());
        };
        if let Some(builtin) = EngineBuiltin::lookup(name) {
            return self.builtin(builtin, argv, io);
        }

        let mut env = self.state.exported();
        for (key, value) in assignments {
            env.retain(|(existing, _)| existing != key);
            env.push((key.clone(), value.clone()));
        }
        let dir = self.state.dir.clone();
        let result = {
            let mut ctx = HandlerContext::new(
                &dir,
                &env,
                &mut *io.stdin,
                &mut *io.stdout,
                &mut *io.stderr,
            );
            self.executor.exec(&mut ctx, argv)
        };
        match result {
            Ok(status) => {
                self.state.status = status;
                self.last_failure = None;
            }
            Err(error) => self.fail(name, error, &mut *io.stderr),
        }
        Ok(())
    }

    /// Records a handler error: the command fails with status 1 and the
    /// message goes to stderr.
    fn fail(&mut self, command: &str, error: HandlerError, stderr: &mut dyn Write) {
        writeln!(stderr, "{error}").ok();
        self.state.status = 1;
        let failure = RunError::handler(command, error);
        if failure.is_denial() {
            debug!(command, error = %failure, "handler denied operation");
            self.last_failure = None;
            if self.denial.is_none() {
                self.denial = Some(failure);
            }
        } else {
            self.last_failure = Some(failure);
        }
    }
}
