//! Fake capability handlers and a harness for running scripts in a
//! temporary directory.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::{
    Executor, HandlerContext, HandlerError, OpenMode, Opener, RunError, Runner, RunnerBuilder,
    parse,
};

/// Cloneable in-memory sink.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("buffer lock poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("buffer lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opener that refuses any path mentioning `forbidden`.
pub struct TestOpener;

impl TestOpener {
    fn resolve(dir: &Path, path: &str) -> Result<PathBuf, HandlerError> {
        if path.contains("forbidden") {
            return Err(HandlerError::denied(format!("{path}: forbidden")));
        }
        Ok(dir.join(path))
    }
}

impl Opener for TestOpener {
    fn open(&self, dir: &Path, path: &str, mode: OpenMode) -> Result<fs::File, HandlerError> {
        let target = Self::resolve(dir, path)?;
        mode.options().open(target).map_err(HandlerError::failure)
    }

    fn read_dir(&self, dir: &Path, path: &str) -> Result<Vec<String>, HandlerError> {
        let target = Self::resolve(dir, path)?;
        let entries = fs::read_dir(target).map_err(HandlerError::failure)?;
        Ok(entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect())
    }

    fn change_dir(&self, dir: &Path, path: &str) -> Result<PathBuf, HandlerError> {
        let target = Self::resolve(dir, path)?;
        if target.is_dir() {
            Ok(target)
        } else {
            Err(HandlerError::failure(format!("cd: {path}: not a directory")))
        }
    }
}

/// Executor with a handful of canned commands. Every call is recorded.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedExecutor {
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

impl Executor for ScriptedExecutor {
    fn exec(&self, ctx: &mut HandlerContext<'_>, argv: &[String]) -> Result<u8, HandlerError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(argv.to_vec());
        match argv.first().map(String::as_str) {
            Some("fail") => Ok(3),
            Some("deny") => Err(HandlerError::denied("deny: refused")),
            Some("boom") => Err(HandlerError::failure("boom: broken")),
            Some("upper") => {
                let mut input = String::new();
                ctx.stdin()
                    .read_to_string(&mut input)
                    .map_err(HandlerError::failure)?;
                ctx.stdout()
                    .write_all(input.to_uppercase().as_bytes())
                    .map_err(HandlerError::failure)?;
                Ok(0)
            }
            Some("printenv") => {
                let found = ctx
                    .env()
                    .iter()
                    .find(|(key, _)| Some(key) == argv.get(1))
                    .map(|(_, value)| value.clone());
                let Some(value) = found else {
                    return Ok(1);
                };
                writeln!(ctx.stdout(), "{value}").map_err(HandlerError::failure)?;
                Ok(0)
            }
            _ => Ok(0),
        }
    }
}

/// Result of running one script.
pub struct Outcome {
    pub result: Result<(), RunError>,
    pub stdout: String,
    pub stderr: String,
    pub calls: Vec<Vec<String>>,
}

/// A temporary directory with a runner rooted in it.
pub struct Harness {
    pub dir: TempDir,
    pub runner: Runner,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
    executor: ScriptedExecutor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(configure: impl FnOnce(RunnerBuilder) -> RunnerBuilder) -> Self {
        let dir = TempDir::new().expect("failed to allocate temporary directory");
        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let executor = ScriptedExecutor::default();
        let builder = RunnerBuilder::new(dir.path(), TestOpener, executor.clone())
            .stdout(stdout.clone())
            .stderr(stderr.clone());
        let runner = configure(builder).build();
        Self {
            dir,
            runner,
            stdout,
            stderr,
            executor,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn touch(&self, name: &str) {
        fs::write(self.path().join(name), b"").expect("failed to create fixture file");
    }

    pub fn mkdir(&self, name: &str) {
        fs::create_dir_all(self.path().join(name)).expect("failed to create fixture directory");
    }

    pub fn run(&mut self, source: &str) -> Outcome {
        let script = parse(source).expect("script should parse");
        let result = self.runner.run(&script);
        Outcome {
            result,
            stdout: self.stdout.contents(),
            stderr: self.stderr.contents(),
            calls: self.executor.calls(),
        }
    }
}
