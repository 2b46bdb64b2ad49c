//! Command-line arguments for `corral`.

use std::path::PathBuf;

use clap::Parser;

/// Runs a shell script confined to a directory.
#[derive(Parser, Debug)]
#[command(name = "corral", version)]
pub(crate) struct Cli {
    /// Directory every path in the script must stay under.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub(crate) root: PathBuf,
    /// Allows commands found in DIR. Relative directories are taken relative
    /// to the root. Repeatable.
    #[arg(long = "path", value_name = "DIR")]
    pub(crate) path: Vec<PathBuf>,
    /// Aborts the script at the first failing command.
    #[arg(long)]
    pub(crate) fail_fast: bool,
    /// Evaluates SCRIPT instead of reading a file.
    #[arg(short = 'c', value_name = "SCRIPT", conflicts_with = "file")]
    pub(crate) command: Option<String>,
    /// Script file to evaluate. It is read from the host, not the sandbox.
    #[arg(value_name = "FILE", required_unless_present = "command")]
    pub(crate) file: Option<PathBuf>,
}
