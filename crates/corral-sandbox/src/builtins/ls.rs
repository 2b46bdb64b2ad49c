//! `ls [-l] [-a] [PATH...]`

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use clap::Parser;
use time::OffsetDateTime;
use time::macros::format_description;

use super::CommandContext;
use crate::error::SandboxError;

#[derive(Debug, Parser)]
#[command(name = "ls", disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct ListArgs {
    /// One entry per line with mode, size and modification time.
    #[arg(short = 'l')]
    long: bool,
    /// Include entries whose names start with a dot.
    #[arg(short = 'a')]
    all: bool,
    paths: Vec<String>,
}

pub(super) fn run(args: &ListArgs, ctx: &mut CommandContext<'_, '_>) -> Result<(), SandboxError> {
    let operands = if args.paths.is_empty() {
        vec![".".to_owned()]
    } else {
        args.paths.clone()
    };
    let targets = operands
        .iter()
        .map(|raw| ctx.resolve(raw).map(|path| (raw.as_str(), path)))
        .collect::<Result<Vec<_>, _>>()?;

    let headed = targets.len() > 1;
    for (index, (raw, path)) in targets.iter().enumerate() {
        let metadata = fs::metadata(path).map_err(|source| ctx.fs_error(*raw, source))?;
        if !metadata.is_dir() {
            let line = entry_line(raw, path, &metadata, args.long)
                .map_err(|source| ctx.fs_error(*raw, source))?;
            ctx.print(&line)?;
            continue;
        }
        if headed {
            let separator = if index == 0 { "" } else { "\n" };
            ctx.print(&format!("{separator}{raw}:\n"))?;
        }
        let listing = list_directory(path, args).map_err(|source| ctx.fs_error(*raw, source))?;
        ctx.print(&listing)?;
    }
    Ok(())
}

fn list_directory(dir: &Path, args: &ListArgs) -> io::Result<String> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|found| found.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.retain(|name| args.all || !name.starts_with('.'));
    names.sort();

    let mut listing = String::new();
    for name in names {
        let path = dir.join(&name);
        let metadata = fs::symlink_metadata(&path)?;
        listing.push_str(&entry_line(&name, &path, &metadata, args.long)?);
    }
    Ok(listing)
}

fn entry_line(name: &str, path: &Path, metadata: &Metadata, long: bool) -> io::Result<String> {
    if !long {
        return Ok(format!("{name}\n"));
    }
    let modified = OffsetDateTime::from(metadata.modified()?)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(io::Error::other)?;
    let mut line = format!(
        "{} {:>8} {modified} {name}",
        mode_string(metadata),
        metadata.len()
    );
    if metadata.file_type().is_symlink() {
        line.push_str(&format!(" -> {}", fs::read_link(path)?.display()));
    }
    line.push('\n');
    Ok(line)
}

fn mode_string(metadata: &Metadata) -> String {
    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        'l'
    } else if file_type.is_dir() {
        'd'
    } else {
        '-'
    };
    format!("{kind}{}", permission_bits(metadata))
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ]
    .iter()
    .map(|&(bit, flag)| if mode & bit == 0 { '-' } else { flag })
    .collect()
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "r-xr-xr-x".to_owned()
    } else {
        "rwxrwxrwx".to_owned()
    }
}
