//! `cp [-r] SOURCE... DEST`

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "cp", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct CopyArgs {
    /// Copy directories recursively.
    #[arg(short = 'r', short_alias = 'R', long = "recursive")]
    recursive: bool,
    #[arg(required = true, num_args = 2..)]
    paths: Vec<String>,
}

pub(super) fn run(args: &CopyArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let Some((dest_raw, sources)) = args.paths.split_last() else {
        return Err(ctx.usage("missing operand"));
    };
    let sources = sources
        .iter()
        .map(|raw| ctx.resolve(raw).map(|path| (raw, path)))
        .collect::<Result<Vec<_>, _>>()?;
    let dest = ctx.resolve(dest_raw)?;
    let into_dir = dest.is_dir();
    if sources.len() > 1 && !into_dir {
        return Err(ctx.usage(format!("target '{dest_raw}' is not a directory")));
    }

    for (raw, source) in sources {
        let name = Path::new(raw).file_name().or_else(|| source.file_name());
        // An existing entry at the target is written through, so follow it.
        let target = match (into_dir, name) {
            (true, Some(file_name)) => ctx.resolve_from(&dest, Path::new(file_name))?,
            _ => dest.clone(),
        };
        if !source.is_dir() {
            fs::copy(&source, &target).map_err(|error| ctx.fs_error(raw, error))?;
        } else if !args.recursive {
            return Err(ctx.fs_error(
                raw,
                io::Error::new(ErrorKind::IsADirectory, "is a directory (use -r)"),
            ));
        } else if target.starts_with(&source) {
            return Err(ctx.fs_error(
                raw,
                io::Error::new(
                    ErrorKind::InvalidInput,
                    "cannot copy a directory into itself",
                ),
            ));
        } else {
            copy_tree(ctx, raw, &source, &target)?;
        }
    }
    Ok(())
}

/// Copies `from` into `to`, resolving each entry it writes under the root.
fn copy_tree(
    ctx: &CommandContext<'_, '_>,
    raw: &str,
    from: &Path,
    to: &Path,
) -> Result<(), SandboxError> {
    let io_error = |error: io::Error| ctx.fs_error(raw, error);
    fs::create_dir_all(to).map_err(io_error)?;
    for listed in fs::read_dir(from).map_err(io_error)? {
        let entry = listed.map_err(io_error)?;
        let kind = entry.file_type().map_err(io_error)?;
        let name = entry.file_name();
        if kind.is_symlink() {
            let target = ctx.resolve_entry_from(to, Path::new(&name))?;
            copy_link(ctx, raw, &entry.path(), &target)?;
        } else {
            let target = ctx.resolve_from(to, Path::new(&name))?;
            if kind.is_dir() {
                copy_tree(ctx, raw, &entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(io_error)?;
            }
        }
    }
    Ok(())
}

/// Recreates a symlink rather than copying what it points at.
#[cfg(unix)]
fn copy_link(
    ctx: &CommandContext<'_, '_>,
    raw: &str,
    from: &Path,
    to: &Path,
) -> Result<(), SandboxError> {
    let target = ctx.check_relocated_link(raw, from, to)?;
    std::os::unix::fs::symlink(target, to).map_err(|error| ctx.fs_error(raw, error))
}

#[cfg(not(unix))]
fn copy_link(
    ctx: &CommandContext<'_, '_>,
    raw: &str,
    from: &Path,
    _to: &Path,
) -> Result<(), SandboxError> {
    Err(ctx.fs_error(
        raw,
        io::Error::new(
            ErrorKind::Unsupported,
            format!("cannot copy symlink {}", from.display()),
        ),
    ))
}
