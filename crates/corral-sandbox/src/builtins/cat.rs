//! `cat [PATH...]`

use std::fs::File;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "cat", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct ConcatArgs {
    /// Files to concatenate; `-` or no operand reads standard input.
    paths: Vec<String>,
}

pub(super) fn run(args: &ConcatArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    if args.paths.is_empty() {
        return copy_stdin(ctx);
    }
    for raw in &args.paths {
        if raw == "-" {
            copy_stdin(ctx)?;
            continue;
        }
        let path = ctx.resolve(raw)?;
        let mut file = File::open(&path).map_err(|source| ctx.fs_error(raw, source))?;
        ctx.copy_to_stdout(&mut file)?;
    }
    Ok(())
}

fn copy_stdin(ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let mut input = Vec::new();
    ctx.stdin()
        .read_to_end(&mut input)
        .map_err(|source| ctx.fs_error("-", source))?;
    ctx.copy_to_stdout(&mut input.as_slice())
}
