//! `cd` changes the process's working directory, so these tests live in
//! their own binary and run as a single test.

use std::env;
use std::fs;

use dlsh::{Flow, Shell};
use dlsh_exec::JobControl;

fn run(shell: &mut Shell, line: &str) -> String {
    let mut diag = Vec::new();
    assert_eq!(shell.run_line(line, &mut diag), Flow::Continue);
    String::from_utf8(diag).unwrap()
}

#[test]
fn cd_behaviour() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    let mut sh = Shell::new(JobControl::disabled());

    // Commands run in the new directory; redirect targets were opened
    // when the line was parsed.
    assert_eq!(run(&mut sh, &format!("cd {}", root.display())), "");
    assert_eq!(env::current_dir().unwrap(), root);
    assert_eq!(run(&mut sh, "cd sub && pwd > here"), "");
    assert_eq!(
        fs::read_to_string(root.join("here")).unwrap().trim(),
        root.join("sub").display().to_string()
    );

    // A failed cd abandons the rest of the line.
    let diag = run(&mut sh, "cd missing-dir && echo hi > after");
    assert!(diag.starts_with("dlsh: cd: missing-dir:"), "{diag:?}");
    assert_eq!(fs::read_to_string(root.join("sub/after")).unwrap(), "");
    assert_eq!(sh.last_status(), 1);

    let diag = run(&mut sh, "cd a b");
    assert_eq!(diag, "dlsh: cd: too many arguments\n");
    assert_eq!(env::current_dir().unwrap(), root.join("sub"));

    // No argument goes home.
    if let Some(home) = dirs_home() {
        run(&mut sh, "cd");
        assert_eq!(env::current_dir().unwrap(), home);
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    env::var_os("HOME")
        .map(std::path::PathBuf::from)
        .and_then(|home| home.canonicalize().ok())
}
