//! Layered configuration for the `corral` binary.
//!
//! Values are merged from defaults, a TOML file named by `--config-path` or
//! `CORRAL_CONFIG_PATH`, `CORRAL_*` environment variables and finally the
//! command line, each layer overriding the one before.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Log filter applied when no layer sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// How `corral` renders its own events on stderr, which it shares with the
/// script's error output.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// A flattened JSON object per line, easy to split from script output.
    #[default]
    Json,
    /// A terse text line per event, for reading in a terminal.
    Compact,
}

impl LogFormat {
    /// Whether each event is written as a machine-readable record.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Settings shared by every evaluation the binary performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CORRAL")]
pub struct Config {
    /// `tracing` filter directive, for example `corral_sandbox=debug`.
    #[ortho_config(default = default_log_filter())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = LogFormat::Json)]
    pub log_format: LogFormat,
    /// Directories searched for commands that are not builtins.
    #[ortho_config(default = Vec::new(), merge_strategy = "append")]
    pub search_path: Vec<PathBuf>,
    /// Abort each script at the first failing command.
    #[ortho_config(default = false)]
    pub fail_fast: bool,
}

impl Config {
    /// The configured log filter.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// The configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Extra search-path directories.
    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Whether scripts abort at the first failing command.
    #[must_use]
    pub const fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            search_path: Vec::new(),
            fail_fast: false,
        }
    }
}

#[cfg(test)]
mod tests;
