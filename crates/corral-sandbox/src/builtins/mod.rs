//! Emulated POSIX utilities that act only on resolved paths.
//!
//! Builtins are a closed set: each variant of [`Builtin`] owns its parsed
//! options, and [`lookup`] maps a command name to the constructor that parses
//! them. Adding a builtin means adding a variant and a registry row.

mod cat;
mod cp;
mod ln;
mod ls;
mod mkdir;
mod mv;
mod rm;
mod touch;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use corral_shell::HandlerContext;

use crate::error::SandboxError;
use crate::resolver::SandboxRoot;

pub(crate) use cat::ConcatArgs;
pub(crate) use cp::CopyArgs;
pub(crate) use ln::LinkArgs;
pub(crate) use ls::ListArgs;
pub(crate) use mkdir::MakeDirArgs;
pub(crate) use mv::MoveArgs;
pub(crate) use rm::RemoveArgs;
pub(crate) use touch::TouchArgs;

/// A builtin with its options parsed.
#[derive(Debug)]
pub(crate) enum Builtin {
    List(ListArgs),
    MakeDir(MakeDirArgs),
    Remove(RemoveArgs),
    Touch(TouchArgs),
    Concat(ConcatArgs),
    Copy(CopyArgs),
    Move(MoveArgs),
    Link(LinkArgs),
}

/// Parses a full argument vector, command name included.
pub(crate) type Constructor = fn(&[String]) -> Result<Builtin, SandboxError>;

const REGISTRY: &[(&str, Constructor)] = &[
    ("ls", |argv| parse(argv).map(Builtin::List)),
    ("mkdir", |argv| parse(argv).map(Builtin::MakeDir)),
    ("rm", |argv| parse(argv).map(Builtin::Remove)),
    ("touch", |argv| parse(argv).map(Builtin::Touch)),
    ("cat", |argv| parse(argv).map(Builtin::Concat)),
    ("cp", |argv| parse(argv).map(Builtin::Copy)),
    ("mv", |argv| parse(argv).map(Builtin::Move)),
    ("ln", |argv| parse(argv).map(Builtin::Link)),
];

/// Finds the constructor registered for `name`.
pub(crate) fn lookup(name: &str) -> Option<Constructor> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, constructor)| *constructor)
}

fn parse<T: Parser>(argv: &[String]) -> Result<T, SandboxError> {
    T::try_parse_from(argv).map_err(|error| {
        let rendered = error.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        SandboxError::OptionParse {
            command: argv.first().cloned().unwrap_or_default(),
            message: first.strip_prefix("error: ").unwrap_or(first).to_owned(),
        }
    })
}

impl Builtin {
    /// Runs the builtin.
    pub(crate) fn run(&self, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
        match self {
            Self::List(args) => ls::run(args, ctx),
            Self::MakeDir(args) => mkdir::run(args, ctx),
            Self::Remove(args) => rm::run(args, ctx),
            Self::Touch(args) => touch::run(args, ctx),
            Self::Concat(args) => cat::run(args, ctx),
            Self::Copy(args) => cp::run(args, ctx),
            Self::Move(args) => mv::run(args, ctx),
            Self::Link(args) => ln::run(args, ctx),
        }
    }
}

/// Everything a builtin may touch during one invocation.
pub(crate) struct CommandContext<'a, 'h> {
    root: &'a SandboxRoot,
    handler: &'a mut HandlerContext<'h>,
    command: &'a str,
}

impl<'a, 'h> CommandContext<'a, 'h> {
    pub(crate) const fn new(
        root: &'a SandboxRoot,
        handler: &'a mut HandlerContext<'h>,
        command: &'a str,
    ) -> Self {
        Self {
            root,
            handler,
            command,
        }
    }

    pub(crate) fn resolve(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        self.root.resolve(self.handler.dir(), raw)
    }

    pub(crate) fn resolve_entry(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        self.root.resolve_entry(self.handler.dir(), raw)
    }

    pub(crate) fn resolve_from(&self, dir: &Path, raw: &Path) -> Result<PathBuf, SandboxError> {
        self.root.resolve(dir, raw)
    }

    /// Resolves the entry `name` inside `dir` without following it.
    pub(crate) fn resolve_entry_from(
        &self,
        dir: &Path,
        name: &Path,
    ) -> Result<PathBuf, SandboxError> {
        self.root.resolve_entry(dir, name)
    }

    /// Checks that the symlink at `link` still points inside the root once
    /// it sits at `placed`.
    ///
    /// Relative targets are read against the new parent, so moving a link to
    /// another depth can carry it past the root.
    pub(crate) fn check_relocated_link(
        &self,
        raw: &str,
        link: &Path,
        placed: &Path,
    ) -> Result<PathBuf, SandboxError> {
        let target = std::fs::read_link(link).map_err(|source| self.fs_error(raw, source))?;
        let parent = placed.parent().unwrap_or(placed);
        self.root.resolve(parent, &target)?;
        Ok(target)
    }

    pub(crate) fn fs_error(
        &self,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> SandboxError {
        SandboxError::filesystem(self.command, path, source)
    }

    pub(crate) fn usage(&self, message: impl Into<String>) -> SandboxError {
        SandboxError::OptionParse {
            command: self.command.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) const fn stdin(&mut self) -> &mut dyn Read {
        self.handler.stdin()
    }

    /// Writes `text` to the command's standard output.
    pub(crate) fn print(&mut self, text: &str) -> Result<(), SandboxError> {
        self.handler
            .stdout()
            .write_all(text.as_bytes())
            .map_err(|source| SandboxError::output(self.command, source))
    }

    pub(crate) fn copy_to_stdout(&mut self, reader: &mut dyn Read) -> Result<(), SandboxError> {
        std::io::copy(reader, self.handler.stdout())
            .map(|_| ())
            .map_err(|source| SandboxError::output(self.command, source))
    }
}
