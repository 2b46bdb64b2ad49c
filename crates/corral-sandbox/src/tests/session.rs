//! Script evaluation through a sandbox session.

use std::fs;

use corral_shell::RunError;
use rstest::{fixture, rstest};

use super::support::{TestWorld, find_binary};
use crate::error::{ErrorKind, SandboxError};

#[fixture]
fn world() -> TestWorld {
    TestWorld::new()
}

#[rstest]
fn redirection_output_is_listed(mut world: TestWorld) {
    world.evaluate("echo hi > t; ls");
    world.assert_success();
    assert_eq!(world.stdout.text(), "t\n");
    assert_eq!(
        fs::read_to_string(world.root.join("t")).expect("t exists"),
        "hi\n"
    );
}

#[rstest]
fn created_directory_is_listed_long(mut world: TestWorld) {
    world.evaluate("mkdir test && ls -l test && ls -l");
    world.assert_success();
    let listing = world.stdout.text();
    let line = listing.lines().next().expect("one entry");
    assert!(line.starts_with('d'), "unexpected listing {listing:?}");
    assert!(line.ends_with(" test"), "unexpected listing {listing:?}");
}

#[rstest]
fn ls_options_and_sections(mut world: TestWorld) {
    world.write_file("dir/.hidden", "");
    world.write_file("dir/b", "");
    world.write_file("dir/a", "");
    world.write_file("file.txt", "12345");
    world.evaluate("ls dir; ls -a dir; ls file.txt dir");
    world.assert_success();
    assert_eq!(
        world.stdout.text(),
        "a\nb\n.hidden\na\nb\nfile.txt\n\ndir:\na\nb\n"
    );
}

#[rstest]
#[case::list_absolute("ls /etc")]
#[case::remove_root("rm -rf /")]
#[case::remove_parent("rm -rf ..")]
#[case::redirect_out("echo x > ../escape")]
#[case::read_out("cat < ../outside.txt")]
#[case::cd_out("cd ..")]
#[case::copy_out("cp ../outside.txt inside.txt")]
#[case::link_out("ln -s ../outside.txt link")]
fn escapes_are_violations(mut world: TestWorld, #[case] script: &str) {
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::Violation);
    assert!(world.outside_intact());
    assert!(!world.temp_dir.path().join("escape").exists());
    assert!(world.root_entries().is_empty());
}

#[rstest]
#[case::ln_through_moved_link(
    "mkdir -p a; ln -s .. a/up; mv a/up up; echo pwn > outside.txt; ln -f outside.txt up"
)]
#[case::cp_through_moved_link(
    "mkdir -p a/b; ln -s ../../outside.txt a/b/outside.txt; \
     mv a/b/outside.txt a/outside.txt; echo pwn > outside.txt; cp outside.txt a"
)]
#[case::mv_directory_holding_link("mkdir -p a/b; ln -s ../.. a/b/up; mv a/b b")]
#[case::cp_tree_holding_link("mkdir -p a/b; ln -s ../.. a/b/up; cp -r a/b c")]
fn relocated_links_are_violations(mut world: TestWorld, #[case] script: &str) {
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::Violation);
    assert!(world.outside_intact());
}

#[cfg(unix)]
#[rstest]
#[case::ln_into_linked_directory("up", true, "echo pwn > outside.txt; ln -f outside.txt up")]
#[case::cp_onto_linked_file("a/outside.txt", false, "echo pwn > outside.txt; cp outside.txt a")]
#[case::cp_tree_into_linked_directory(
    "dst/src/sub",
    true,
    "mkdir -p src/sub; echo pwn > src/sub/outside.txt; cp -r src dst"
)]
fn writes_through_planted_links_are_violations(
    mut world: TestWorld,
    #[case] link: &str,
    #[case] to_directory: bool,
    #[case] script: &str,
) {
    let target = if to_directory {
        world.temp_dir.path().to_path_buf()
    } else {
        world.outside_file.clone()
    };
    world.plant_link(link, &target);
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::Violation);
    assert!(world.outside_intact());
}

#[rstest]
fn links_moved_within_reach_are_kept(mut world: TestWorld) {
    world.evaluate("mkdir -p a/b c; echo data > f; ln -s ../../f a/b/f; mv a/b c; cat c/b/f");
    world.assert_success();
    assert_eq!(world.stdout.text(), "data\n");
}

#[rstest]
fn remove_star_clears_only_the_root(mut world: TestWorld) {
    world.write_file("a.txt", "a");
    world.write_file("nested/deeper/b.txt", "b");
    world.write_file("c/d", "d");
    world.evaluate("rm -rf *");
    world.assert_success();
    assert!(world.root_entries().is_empty());
    assert!(world.outside_intact());
}

#[rstest]
fn violation_is_reported_even_when_the_script_recovers(mut world: TestWorld) {
    world.evaluate("ls /etc || echo ignored; touch after");
    assert_eq!(world.error().kind(), ErrorKind::Violation);
    assert_eq!(world.stdout.text(), "ignored\n");
    assert!(world.stderr.text().contains("outside the sandbox root"));
    assert!(world.root.join("after").exists());
}

#[rstest]
fn state_does_not_leak_between_evaluations(mut world: TestWorld) {
    world.evaluate("X=1; export Y=2; set -e; mkdir d; cd d");
    world.assert_success();
    world.stdout.clear();

    world.evaluate("pwd; echo ${X:-unset} ${Y:-unset}; false; echo continued");
    world.assert_success();
    assert_eq!(
        world.stdout.text(),
        format!("{}\nunset unset\ncontinued\n", world.canonical_root().display())
    );
}

#[rstest]
fn unknown_commands_are_unsupported(mut world: TestWorld) {
    world.evaluate("frobnicate --all > out.txt");
    match world.error() {
        SandboxError::UnsupportedCommand { command } => assert_eq!(command, "frobnicate"),
        other => panic!("expected unsupported command, got {other:?}"),
    }
    // Only the redirection target was created.
    assert_eq!(world.root_entries(), vec!["out.txt"]);
}

#[rstest]
#[case::path_outside_root("/bin/sh -c true")]
#[case::missing_under_root("./configure")]
fn executables_outside_allowed_locations_are_unsupported(
    mut world: TestWorld,
    #[case] script: &str,
) {
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::UnsupportedCommand);
}

#[rstest]
#[case::unknown_flag("ls -z")]
#[case::missing_operand("rm")]
#[case::mkdir_without_path("mkdir")]
#[case::mv_single_operand("mv a")]
fn malformed_options_are_reported(mut world: TestWorld, #[case] script: &str) {
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::OptionParse);
}

#[rstest]
#[case::missing_file("rm missing")]
#[case::directory_without_recursion("mkdir d; rm d")]
#[case::mkdir_existing_file("touch f; mkdir f")]
#[case::cat_missing("cat nothing-here")]
fn filesystem_failures_are_reported(mut world: TestWorld, #[case] script: &str) {
    world.evaluate(script);
    assert_eq!(world.error().kind(), ErrorKind::Filesystem);
}

#[rstest]
fn exit_status_outlives_an_earlier_failure(mut world: TestWorld) {
    world.evaluate("rm missing; exit 3");
    match world.error() {
        SandboxError::ScriptRuntime(RunError::ExitStatus(status)) => assert_eq!(*status, 3),
        other => panic!("expected exit status 3, got {other:?}"),
    }
}

#[rstest]
fn force_ignores_missing_operands(mut world: TestWorld) {
    world.evaluate("rm -f missing; rm -f");
    world.assert_success();
}

#[rstest]
fn failures_continue_unless_fail_fast(mut world: TestWorld) {
    world.evaluate("rm missing; touch after");
    world.assert_success();
    assert!(world.root.join("after").exists());

    let mut strict = TestWorld::new();
    strict.build(|builder| builder.fail_fast(true));
    strict.evaluate("rm missing; touch after");
    assert_eq!(strict.error().kind(), ErrorKind::Filesystem);
    assert!(!strict.root.join("after").exists());
}

#[rstest]
fn globs_do_not_expand_outside_root(mut world: TestWorld) {
    world.write_file("inner.txt", "");
    world.evaluate("echo ../* *.txt");
    world.assert_success();
    assert_eq!(world.stdout.text(), "../* inner.txt\n");
}

#[rstest]
fn file_builtins_compose(mut world: TestWorld) {
    world.evaluate(
        "mkdir -p a/b; echo data > a/b/f; cp -r a copy; mv copy/b/f moved; \
         ln -s moved link; cat link a/b/f; echo piped | cat",
    );
    world.assert_success();
    assert_eq!(world.stdout.text(), "data\ndata\npiped\n");
    assert!(world.root.join("copy/b").is_dir());
    assert!(!world.root.join("copy/b/f").exists());
}

#[rstest]
fn parse_errors_are_syntax_errors(mut world: TestWorld) {
    world.evaluate("echo 'unterminated");
    assert_eq!(world.error().kind(), ErrorKind::ScriptSyntax);
}

#[cfg(unix)]
#[rstest]
fn external_programs_see_only_injected_variables(mut world: TestWorld) {
    let Some(env) = find_binary(&["/usr/bin/env", "/bin/env"]) else {
        return;
    };
    let bin_dir = env.parent().expect("binary has a parent").to_path_buf();
    world.build(|builder| builder.path([bin_dir]).env("KEEP", "1"));
    world.evaluate("LOCAL=x; export EXTRA=2; env");
    world.assert_success();
    let mut lines: Vec<String> = world.stdout.text().lines().map(str::to_owned).collect();
    lines.sort();
    assert_eq!(lines, vec!["EXTRA=2", "KEEP=1"]);
}

#[cfg(unix)]
#[rstest]
fn external_programs_run_in_the_current_directory(mut world: TestWorld) {
    let Some(env) = find_binary(&["/usr/bin/env", "/bin/env"]) else {
        return;
    };
    let bin_dir = env.parent().expect("binary has a parent").to_path_buf();
    if !bin_dir.join("pwd").is_file() {
        return;
    }
    let search = bin_dir.display().to_string();
    world.write_file("sub/.keep", "");
    world.build(|builder| builder.path([bin_dir]).env("PATH", search));
    world.evaluate("cd sub && env pwd");
    world.assert_success();
    assert_eq!(
        world.stdout.text(),
        format!("{}\n", world.canonical_root().join("sub").display())
    );
}

#[rstest]
#[case::violation("ls /etc", false)]
#[case::exit_status("exit 3", false)]
#[case::syntax("echo 'open", true)]
fn only_unseen_errors_need_reporting(
    mut world: TestWorld,
    #[case] script: &str,
    #[case] expected: bool,
) {
    world.evaluate(script);
    assert_eq!(world.error().needs_reporting(), expected);
}

#[rstest]
fn sandboxes_move_between_threads(mut world: TestWorld) {
    fn assert_send<T: Send>() {}
    assert_send::<crate::Sandbox>();

    world.build(|builder| builder);
    let mut sandbox = world.sandbox.take().expect("sandbox should be built");
    let result = std::thread::spawn(move || sandbox.evaluate("mkdir worker"))
        .join()
        .expect("worker thread panicked");
    assert!(result.is_ok());
    assert!(world.root.join("worker").is_dir());
}
