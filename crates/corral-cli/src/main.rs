//! Entry point for the `corral` binary.
//!
//! Delegates to [`corral_cli::run`], which loads configuration, installs
//! telemetry and evaluates one script inside a sandbox. Standard input is
//! handed to the script only when it is not a terminal.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use corral_cli::Streams;

fn main() -> ExitCode {
    let mut streams = Streams::new(io::stdout(), io::stderr());
    if !io::stdin().is_terminal() {
        streams = streams.with_stdin(io::stdin());
    }
    corral_cli::run(std::env::args_os(), streams)
}
