//! Commands the runner handles itself because they act on its own state.

use std::io::Write;

use crate::error::HandlerError;
use crate::lexer::{is_name_char, is_name_start};

use super::{Flow, Halt, Io, Machine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EngineBuiltin {
    Echo,
    Cd,
    Pwd,
    True,
    False,
    Colon,
    Exit,
    Set,
    Export,
    Unset,
}

impl EngineBuiltin {
    pub(super) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "echo" => Self::Echo,
            "cd" => Self::Cd,
            "pwd" => Self::Pwd,
            "true" => Self::True,
            "false" => Self::False,
            ":" => Self::Colon,
            "exit" => Self::Exit,
            "set" => Self::Set,
            "export" => Self::Export,
            "unset" => Self::Unset,
            _ => return None,
        })
    }
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

impl Machine<'_> {
    pub(super) fn builtin(
        &mut self,
        builtin: EngineBuiltin,
        argv: &[String],
        io: &mut Io<'_>,
    ) -> Flow {
        let name = argv.first().map_or("", String::as_str);
        let args = argv.get(1..).unwrap_or_default();
        let result = match builtin {
            EngineBuiltin::Echo => echo(args, &mut *io.stdout),
            EngineBuiltin::Cd => self.cd(args),
            EngineBuiltin::Pwd => writeln!(io.stdout, "{}", self.state.dir.display())
                .map_err(HandlerError::failure),
            EngineBuiltin::True | EngineBuiltin::Colon => Ok(()),
            EngineBuiltin::False => {
                self.state.status = 1;
                self.last_failure = None;
                return Ok(());
            }
            EngineBuiltin::Exit => return self.exit(args, io),
            EngineBuiltin::Set => self.set(args),
            EngineBuiltin::Export => self.export(args),
            EngineBuiltin::Unset => self.unset(args),
        };
        match result {
            Ok(()) => {
                self.state.status = 0;
                self.last_failure = None;
            }
            Err(error) => self.fail(name, error, &mut *io.stderr),
        }
        Ok(())
    }

    fn cd(&mut self, args: &[String]) -> Result<(), HandlerError> {
        match args {
            [] => {
                self.state.dir = self.home.to_path_buf();
                Ok(())
            }
            [target] => {
                self.state.dir = self.opener.change_dir(&self.state.dir, target)?;
                Ok(())
            }
            _ => Err(HandlerError::failure("cd: too many arguments")),
        }
    }

    fn exit(&mut self, args: &[String], io: &mut Io<'_>) -> Flow {
        match args {
            [] => {}
            [code] => match code.parse::<u8>() {
                Ok(code) => self.state.status = code,
                Err(_) => {
                    writeln!(io.stderr, "exit: {code}: numeric argument required").ok();
                    self.state.status = 2;
                }
            },
            _ => {
                writeln!(io.stderr, "exit: too many arguments").ok();
                self.state.status = 1;
                return Ok(());
            }
        }
        // The script's status is now the one `exit` chose.
        self.last_failure = None;
        Err(Halt::Exit)
    }

    fn set(&mut self, args: &[String]) -> Result<(), HandlerError> {
        for arg in args {
            let (enable, flags) = if let Some(flags) = arg.strip_prefix('-') {
                (true, flags)
            } else if let Some(flags) = arg.strip_prefix('+') {
                (false, flags)
            } else {
                return Err(HandlerError::failure(format!(
                    "set: positional parameters are not supported: {arg}"
                )));
            };
            for flag in flags.chars() {
                match flag {
                    'e' => self.state.errexit = enable,
                    'x' => self.state.xtrace = enable,
                    other => {
                        return Err(HandlerError::failure(format!(
                            "set: invalid option: {other}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn export(&mut self, args: &[String]) -> Result<(), HandlerError> {
        for arg in args {
            let (name, value) = arg
                .split_once('=')
                .map_or((arg.as_str(), None), |(key, text)| (key, Some(text.to_owned())));
            if !is_name(name) {
                return Err(HandlerError::failure(format!(
                    "export: not a valid identifier: {name}"
                )));
            }
            self.state.export(name, value);
        }
        Ok(())
    }

    fn unset(&mut self, args: &[String]) -> Result<(), HandlerError> {
        for name in args {
            if !is_name(name) {
                return Err(HandlerError::failure(format!(
                    "unset: not a valid identifier: {name}"
                )));
            }
            self.state.unset(name);
        }
        Ok(())
    }
}

fn echo(args: &[String], stdout: &mut dyn Write) -> Result<(), HandlerError> {
    let (newline, words) = match args.split_first() {
        Some((flag, rest)) if flag == "-n" => (false, rest),
        _ => (true, args),
    };
    let mut line = words.join(" ");
    if newline {
        line.push('\n');
    }
    stdout
        .write_all(line.as_bytes())
        .map_err(HandlerError::failure)
}
