//! Command-line runtime for `corral`.
//!
//! The runtime splits configuration flags from the binary's own arguments,
//! loads layered configuration, installs telemetry and evaluates a single
//! script inside a [`corral_sandbox::Sandbox`]. Configuration loading and
//! the standard streams can be substituted so tests drive it in-process.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use corral_config::Config;
use corral_sandbox::Sandbox;
use tracing::debug;

mod cli;
mod config;
mod errors;
mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, prepare_cli_arguments, split_config_arguments};
use errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `corral_config::Config`
/// that take a value on the command line.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--log-filter", "--log-format"];

/// Standard streams handed to the evaluated script.
pub struct Streams {
    stdin: Option<Box<dyn Read + Send>>,
    stdout: Box<dyn Write + Send>,
    stderr: SharedWriter,
}

impl Streams {
    /// Wires the script's output streams. Standard input starts empty.
    #[must_use]
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self {
            stdin: None,
            stdout: Box::new(stdout),
            stderr: SharedWriter::new(stderr),
        }
    }

    /// Feeds `stdin` to the script.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Read + Send + 'static) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }
}

/// A writer shared between the sandbox and the runtime's own messages.
#[derive(Clone)]
struct SharedWriter(Arc<Mutex<Box<dyn Write + Send>>>);

impl SharedWriter {
    fn new(inner: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(inner))))
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("stderr lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("stderr lock poisoned"))?
            .flush()
    }
}

struct CliRunner<'a, L: ConfigLoader> {
    loader: &'a L,
    install_telemetry: bool,
}

impl<'a, L: ConfigLoader> CliRunner<'a, L> {
    const fn new(loader: &'a L) -> Self {
        Self {
            loader,
            install_telemetry: false,
        }
    }

    const fn with_telemetry(mut self) -> Self {
        self.install_telemetry = true;
        self
    }

    fn run<I>(&self, args: I, streams: Streams) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let Streams {
            stdin,
            mut stdout,
            stderr,
        } = streams;
        let mut messages = stderr.clone();
        let argv: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&argv);

        let cli = match Cli::try_parse_from(prepare_cli_arguments(&argv, &split)) {
            Ok(cli) => cli,
            Err(error) => {
                // Help and version requests are not failures.
                let sink: &mut dyn Write = if error.use_stderr() {
                    &mut messages
                } else {
                    &mut stdout
                };
                write!(sink, "{error}").ok();
                return AppError::CliUsage(error).exit_code();
            }
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.evaluate(cli, &config, stdin, stdout, stderr));
        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                if error.needs_reporting() {
                    writeln!(messages, "{error}").ok();
                }
                error.exit_code()
            }
        }
    }

    fn evaluate(
        &self,
        cli: Cli,
        config: &Config,
        stdin: Option<Box<dyn Read + Send>>,
        stdout: Box<dyn Write + Send>,
        stderr: SharedWriter,
    ) -> Result<(), AppError> {
        if self.install_telemetry {
            telemetry::initialise(config)?;
        }
        let (script, script_stdin) = read_script(&cli, stdin)?;
        let mut sandbox = build_sandbox(cli, config, script_stdin, stdout, stderr)?;
        debug!(root = %sandbox.root().display(), "evaluating script");
        sandbox.evaluate(&script)?;
        Ok(())
    }
}

/// Reads the script text. `FILE` of `-` reads the script from standard
/// input, which the script then no longer sees.
fn read_script(
    cli: &Cli,
    stdin: Option<Box<dyn Read + Send>>,
) -> Result<(String, Option<Box<dyn Read + Send>>), AppError> {
    if let Some(command) = &cli.command {
        return Ok((command.clone(), stdin));
    }
    match cli.file.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            let mut script = String::new();
            if let Some(mut input) = stdin {
                input
                    .read_to_string(&mut script)
                    .map_err(AppError::ReadStdin)?;
            }
            Ok((script, None))
        }
        Some(path) => {
            let script = fs::read_to_string(path).map_err(|source| AppError::ReadScript {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((script, stdin))
        }
        None => Ok((String::new(), stdin)),
    }
}

fn build_sandbox(
    cli: Cli,
    config: &Config,
    stdin: Option<Box<dyn Read + Send>>,
    stdout: Box<dyn Write + Send>,
    stderr: SharedWriter,
) -> Result<Sandbox, AppError> {
    let mut builder = Sandbox::builder(cli.root)
        .path(config.search_path().iter().cloned())
        .path(cli.path)
        .fail_fast(config.fail_fast() || cli.fail_fast)
        .stdout(stdout)
        .stderr(stderr);
    if let Some(input) = stdin {
        builder = builder.stdin(input);
    }
    Ok(builder.build()?)
}

/// Runs the binary with the given arguments and streams.
#[must_use]
pub fn run<I>(args: I, streams: Streams) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
{
    CliRunner::new(&OrthoConfigLoader)
        .with_telemetry()
        .run(args, streams)
}

#[cfg(test)]
mod tests;
