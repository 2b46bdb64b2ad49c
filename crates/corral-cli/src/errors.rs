//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use corral_sandbox::SandboxError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Exit status for malformed command lines.
const USAGE_EXIT: u8 = 2;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to read script {path}: {source}")]
    ReadScript { path: PathBuf, source: io::Error },
    #[error("failed to read script from standard input: {0}")]
    ReadStdin(io::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Sandbox(#[from] SandboxError),
}

impl AppError {
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::CliUsage(error) if !error.use_stderr() => ExitCode::SUCCESS,
            Self::CliUsage(_) => ExitCode::from(USAGE_EXIT),
            _ => ExitCode::FAILURE,
        }
    }

    /// Returns false when the message already reached the script's stderr.
    pub(crate) const fn needs_reporting(&self) -> bool {
        match self {
            Self::Sandbox(error) => error.needs_reporting(),
            _ => true,
        }
    }
}
