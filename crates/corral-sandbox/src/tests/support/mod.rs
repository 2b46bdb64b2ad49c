//! Shared fixtures for sandbox tests.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::error::SandboxError;
use crate::session::{Sandbox, SandboxBuilder};

/// Cloneable in-memory sink used as a script's stdout or stderr.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        let bytes = self.0.lock().expect("buffer lock poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().expect("buffer lock poisoned").clear();
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

/// A sandbox root inside a temporary directory, next to a file the sandbox
/// must never reach.
pub struct TestWorld {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub outside_file: PathBuf,
    pub sandbox: Option<Sandbox>,
    pub result: Option<Result<(), SandboxError>>,
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to allocate temporary directory");
        let root = temp_dir.path().join("sbx");
        fs::create_dir(&root).expect("failed to create sandbox root");
        let outside_file = temp_dir.path().join("outside.txt");
        fs::write(&outside_file, "outside").expect("failed to write outside fixture");
        Self {
            temp_dir,
            root,
            outside_file,
            sandbox: None,
            result: None,
            stdout: SharedBuffer::default(),
            stderr: SharedBuffer::default(),
        }
    }

    /// Builds the sandbox with stdout and stderr captured.
    pub fn build(&mut self, configure: impl FnOnce(SandboxBuilder) -> SandboxBuilder) {
        let builder = Sandbox::builder(&self.root)
            .stdout(self.stdout.clone())
            .stderr(self.stderr.clone());
        let sandbox = configure(builder).build().expect("sandbox should build");
        self.sandbox = Some(sandbox);
    }

    pub fn evaluate(&mut self, script: &str) {
        if self.sandbox.is_none() {
            self.build(|builder| builder);
        }
        let sandbox = self.sandbox.as_mut().expect("sandbox should be built");
        self.result = Some(sandbox.evaluate(script));
    }

    pub fn result(&self) -> &Result<(), SandboxError> {
        self.result.as_ref().expect("no script evaluated")
    }

    pub fn error(&self) -> &SandboxError {
        self.result()
            .as_ref()
            .expect_err("evaluation should have failed")
    }

    pub fn assert_success(&self) {
        if let Err(error) = self.result() {
            panic!(
                "evaluation failed: {error}; stderr: {:?}",
                self.stderr.text()
            );
        }
    }

    pub fn canonical_root(&self) -> PathBuf {
        fs::canonicalize(&self.root).expect("root should canonicalise")
    }

    pub fn write_file(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture parent");
        }
        fs::write(path, contents).expect("failed to write fixture");
    }

    /// Creates a symlink at `relative` under the root without going through
    /// the sandbox.
    #[cfg(unix)]
    pub fn plant_link(&self, relative: &str, target: &Path) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create link parent");
        }
        std::os::unix::fs::symlink(target, path).expect("failed to plant link");
    }

    pub fn root_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .expect("root should be listable")
            .map(|entry| {
                entry
                    .expect("entry should be readable")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    pub fn outside_intact(&self) -> bool {
        fs::read_to_string(&self.outside_file).is_ok_and(|text| text == "outside")
            && self.root.is_dir()
    }
}

/// Returns the first existing path among `candidates`.
pub fn find_binary(candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}
