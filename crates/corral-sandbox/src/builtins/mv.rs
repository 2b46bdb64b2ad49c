//! `mv SOURCE... DEST`

use std::fs;
use std::path::Path;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "mv", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct MoveArgs {
    #[arg(required = true, num_args = 2..)]
    paths: Vec<String>,
}

pub(super) fn run(args: &MoveArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let Some((dest_raw, sources)) = args.paths.split_last() else {
        return Err(ctx.usage("missing operand"));
    };
    let sources = sources
        .iter()
        .map(|raw| ctx.resolve_entry(raw).map(|path| (raw, path)))
        .collect::<Result<Vec<_>, _>>()?;
    let dest = ctx.resolve(dest_raw)?;
    let into_dir = dest.is_dir();
    if sources.len() > 1 && !into_dir {
        return Err(ctx.usage(format!("target '{dest_raw}' is not a directory")));
    }

    for (raw, source) in sources {
        let target = match (into_dir, source.file_name()) {
            (true, Some(name)) => dest.join(name),
            _ => dest.clone(),
        };
        check_links(ctx, raw, &source, &target)?;
        fs::rename(&source, &target).map_err(|error| ctx.fs_error(raw, error))?;
    }
    Ok(())
}

/// Refuses a move that would leave a symlink in `source` pointing outside the
/// root from its place under `target`.
fn check_links(
    ctx: &CommandContext<'_, '_>,
    raw: &str,
    source: &Path,
    target: &Path,
) -> Result<(), SandboxError> {
    let kind = fs::symlink_metadata(source)
        .map_err(|error| ctx.fs_error(raw, error))?
        .file_type();
    if kind.is_symlink() {
        ctx.check_relocated_link(raw, source, target)?;
    } else if kind.is_dir() {
        for listed in fs::read_dir(source).map_err(|error| ctx.fs_error(raw, error))? {
            let entry = listed.map_err(|error| ctx.fs_error(raw, error))?;
            check_links(ctx, raw, &entry.path(), &target.join(entry.file_name()))?;
        }
    }
    Ok(())
}
