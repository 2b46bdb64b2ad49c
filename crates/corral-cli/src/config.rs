//! Configuration loading helpers for the `corral` binary.
//!
//! Configuration flags lead the command line. They are split off and handed
//! to `ortho_config`, and everything from the first other token onwards is
//! parsed as the binary's own arguments.

use std::ffi::{OsStr, OsString};

use corral_config::Config;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from the leading configuration flags.
    ///
    /// # Flag Ordering
    ///
    /// Flags listed in `CONFIG_CLI_FLAGS` must appear before any other
    /// argument. Later occurrences are parsed as ordinary arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        if !argument_text.starts_with("--") {
            return FlagAction::Skip;
        }

        let (flag, has_inline_value) = argument_text
            .split_once('=')
            .map_or((&*argument_text, false), |(name, _)| (name, true));

        if super::CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }

        FlagAction::Skip
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered: Vec<OsString> = vec![program.clone()];
    let mut command_start = 1usize;
    let mut pending_values = 0usize;

    for argument in args.iter().skip(1) {
        if pending_values > 0 {
            filtered.push(argument.clone());
            pending_values -= 1;
            command_start += 1;
            continue;
        }

        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                command_start += 1;
                if needs_value {
                    pending_values = 1;
                }
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

/// Rebuilds the argument list for the binary's own parser.
pub(crate) fn prepare_cli_arguments(
    args: &[OsString],
    split: &ConfigArgumentSplit,
) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}
