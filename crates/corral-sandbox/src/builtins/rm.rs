//! `rm [-r] [-f] PATH...`

use std::fs;
use std::io::{self, ErrorKind};

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "rm", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct RemoveArgs {
    /// Remove directories and their contents.
    #[arg(short = 'r', short_alias = 'R', long = "recursive")]
    recursive: bool,
    /// Ignore missing operands.
    #[arg(short = 'f', long = "force")]
    force: bool,
    paths: Vec<String>,
}

pub(super) fn run(args: &RemoveArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    if args.paths.is_empty() {
        return if args.force {
            Ok(())
        } else {
            Err(ctx.usage("missing operand"))
        };
    }
    // Every operand is checked before anything is removed.
    let targets = args
        .paths
        .iter()
        .map(|raw| ctx.resolve_entry(raw).map(|path| (raw, path)))
        .collect::<Result<Vec<_>, _>>()?;

    for (raw, path) in targets {
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == ErrorKind::NotFound && args.force => continue,
            Err(source) => return Err(ctx.fs_error(raw, source)),
        };
        let removed = if !metadata.is_dir() {
            fs::remove_file(&path)
        } else if args.recursive {
            fs::remove_dir_all(&path)
        } else {
            Err(io::Error::new(ErrorKind::IsADirectory, "is a directory"))
        };
        removed.map_err(|source| ctx.fs_error(raw, source))?;
    }
    Ok(())
}
