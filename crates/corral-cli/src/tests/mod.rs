//! In-process tests for the CLI runtime.

use std::fs;
use std::io::{self, Cursor, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use corral_config::Config;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::{CliRunner, Streams};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
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

/// Hands out a fixed configuration and records the arguments it saw.
#[derive(Default)]
struct FixedLoader {
    config: Config,
    seen: Mutex<Vec<String>>,
}

impl ConfigLoader for FixedLoader {
    fn load(&self, args: &[std::ffi::OsString]) -> Result<Config, AppError> {
        let mut seen = self.seen.lock().expect("loader lock poisoned");
        seen.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
        Ok(self.config.clone())
    }
}

struct Harness {
    temp_dir: TempDir,
    loader: FixedLoader,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

impl Harness {
    fn root(&self) -> String {
        self.temp_dir.path().display().to_string()
    }

    fn run(&self, args: &[&str]) -> ExitCode {
        self.run_with_stdin(args, None)
    }

    fn run_with_stdin(&self, args: &[&str], stdin: Option<&str>) -> ExitCode {
        let mut streams = Streams::new(self.stdout.clone(), self.stderr.clone());
        if let Some(text) = stdin {
            streams = streams.with_stdin(Cursor::new(text.to_owned()));
        }
        let argv = std::iter::once("corral")
            .chain(args.iter().copied())
            .map(Into::into);
        CliRunner::new(&self.loader).run(argv, streams)
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        temp_dir: TempDir::new().expect("create temp dir"),
        loader: FixedLoader::default(),
        stdout: SharedBuffer::default(),
        stderr: SharedBuffer::default(),
    }
}

#[rstest]
fn inline_script_runs_inside_the_root(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "-c", "mkdir test && ls"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(harness.stdout.text(), "test\n");
    assert!(harness.temp_dir.path().join("test").is_dir());
}

#[rstest]
fn script_files_are_read_from_the_host(harness: Harness) {
    let script = harness.temp_dir.path().join("setup.sh");
    fs::write(&script, "mkdir -p out\necho done > out/status\ncat out/status\n")
        .expect("write script");
    let root = harness.root();
    let exit = harness.run(&["--root", &root, &script.display().to_string()]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(harness.stdout.text(), "done\n");
}

#[rstest]
fn dash_reads_the_script_from_stdin(harness: Harness) {
    let root = harness.root();
    let exit = harness.run_with_stdin(&["--root", &root, "-"], Some("echo from stdin\n"));
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(harness.stdout.text(), "from stdin\n");
}

#[rstest]
fn stdin_is_passed_to_the_script(harness: Harness) {
    let root = harness.root();
    let exit = harness.run_with_stdin(&["--root", &root, "-c", "cat"], Some("piped"));
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(harness.stdout.text(), "piped");
}

#[rstest]
fn violations_are_reported_once(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "-c", "ls /etc"]);
    assert_eq!(exit, ExitCode::FAILURE);
    let stderr = harness.stderr.text();
    assert_eq!(
        stderr.matches("outside the sandbox root").count(),
        1,
        "stderr={stderr:?}"
    );
}

#[rstest]
fn syntax_errors_are_reported(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "-c", "echo 'open"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(harness.stderr.text().contains("unterminated single quote"));
}

#[rstest]
fn missing_root_is_reported(harness: Harness) {
    let missing = harness.temp_dir.path().join("missing").display().to_string();
    let exit = harness.run(&["--root", &missing, "-c", "ls"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(harness.stderr.text().contains("missing"));
}

#[rstest]
fn missing_script_file_is_reported(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "absent.sh"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(harness.stderr.text().contains("failed to read script absent.sh"));
}

#[rstest]
#[case::no_script(&[])]
#[case::both_sources(&["-c", "ls", "script.sh"])]
#[case::unknown_flag(&["--bogus"])]
fn usage_errors_exit_with_two(harness: Harness, #[case] args: &[&str]) {
    assert_eq!(harness.run(args), ExitCode::from(2));
    assert!(!harness.stderr.text().is_empty());
}

#[rstest]
fn help_goes_to_stdout(harness: Harness) {
    assert_eq!(harness.run(&["--help"]), ExitCode::SUCCESS);
    assert!(harness.stdout.text().contains("--root"));
    assert!(harness.stderr.text().is_empty());
}

#[rstest]
fn fail_fast_flag_stops_at_first_failure(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "--fail-fast", "-c", "rm missing; touch after"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(!harness.temp_dir.path().join("after").exists());
}

#[rstest]
fn configured_fail_fast_applies(mut harness: Harness) {
    harness.loader.config.fail_fast = true;
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "-c", "rm missing; touch after"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(!harness.temp_dir.path().join("after").exists());
}

#[rstest]
fn leading_config_flags_reach_the_loader(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--log-filter", "debug", "--root", &root, "-c", "true"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    let seen = harness.loader.seen.lock().expect("loader lock poisoned").clone();
    assert_eq!(seen, vec!["corral", "--log-filter", "debug"]);
}

#[rstest]
fn unknown_commands_fail(harness: Harness) {
    let root = harness.root();
    let exit = harness.run(&["--root", &root, "-c", "frobnicate"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(harness.stderr.text().contains("unsupported command: frobnicate"));
}
