//! `ln [-s] [-f] TARGET LINK`

use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "ln", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct LinkArgs {
    /// Create a symbolic link instead of a hard link.
    #[arg(short = 's', long = "symbolic")]
    symbolic: bool,
    /// Replace an existing link.
    #[arg(short = 'f', long = "force")]
    force: bool,
    target: String,
    link: String,
}

pub(super) fn run(args: &LinkArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let mut link = ctx.resolve_entry(&args.link)?;
    if link.is_dir() {
        let Some(name) = Path::new(&args.target).file_name() else {
            return Err(ctx.usage(format!("cannot derive a link name from '{}'", args.target)));
        };
        // `is_dir` followed the link, so the entry inside it needs its own
        // check.
        link = ctx.resolve_entry_from(&link, Path::new(name))?;
    }
    let Some(parent) = link.parent() else {
        return Err(ctx.usage(format!("invalid link '{}'", args.link)));
    };
    // A symlink target is relative to the link's directory.
    let resolved_target = if args.symbolic {
        ctx.resolve_from(parent, Path::new(&args.target))?
    } else {
        ctx.resolve(&args.target)?
    };

    if args.force && fs::symlink_metadata(&link).is_ok() {
        fs::remove_file(&link).map_err(|source| ctx.fs_error(&args.link, source))?;
    }
    let created = if args.symbolic {
        symlink(Path::new(&args.target), &link)
    } else {
        fs::hard_link(&resolved_target, &link)
    };
    created.map_err(|source| ctx.fs_error(&args.link, source))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
