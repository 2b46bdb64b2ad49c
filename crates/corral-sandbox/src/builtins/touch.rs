//! `touch PATH...`

use std::fs::OpenOptions;
use std::time::SystemTime;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "touch", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct TouchArgs {
    #[arg(required = true)]
    paths: Vec<String>,
}

pub(super) fn run(args: &TouchArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let targets = args
        .paths
        .iter()
        .map(|raw| ctx.resolve(raw).map(|path| (raw, path)))
        .collect::<Result<Vec<_>, _>>()?;
    for (raw, path) in targets {
        if path.is_dir() {
            continue;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()))
            .map_err(|source| ctx.fs_error(raw, source))?;
    }
    Ok(())
}
