//! `mkdir [-p] PATH...`

use std::fs;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "mkdir", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct MakeDirArgs {
    /// Create missing parents and accept existing directories.
    #[arg(short = 'p', long = "parents")]
    parents: bool,
    #[arg(required = true)]
    paths: Vec<String>,
}

pub(super) fn run(args: &MakeDirArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let targets = args
        .paths
        .iter()
        .map(|raw| ctx.resolve(raw).map(|path| (raw, path)))
        .collect::<Result<Vec<_>, _>>()?;
    for (raw, path) in targets {
        let created = if args.parents {
            fs::create_dir_all(&path)
        } else {
            fs::create_dir(&path)
        };
        created.map_err(|source| ctx.fs_error(raw, source))?;
    }
    Ok(())
}
