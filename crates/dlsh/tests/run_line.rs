//! Whole-line behaviour of the shell runner: diagnostics, statuses,
//! builtins that do not touch the working directory, and background jobs.

use std::fs;
use std::io::Cursor;
use std::time::{Duration, Instant};

use dlsh::{Flow, Shell};
use dlsh_exec::JobControl;

// ── Helpers ─────────────────────────────────────────────────────────────

fn shell() -> Shell {
    Shell::new(JobControl::disabled())
}

fn run(shell: &mut Shell, line: &str) -> (Flow, String) {
    let mut diag = Vec::new();
    let flow = shell.run_line(line, &mut diag);
    (flow, String::from_utf8(diag).unwrap())
}

// ═════════════════════════════════════════════════════════════════════════
// Commands and statuses
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn pipeline_counts_words() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("count");
    let mut sh = shell();

    let (flow, diag) = run(&mut sh, &format!(r#"echo "a b" | wc -w > {}"#, out.display()));
    assert_eq!(flow, Flow::Continue);
    assert_eq!(diag, "");
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "1");
    assert_eq!(sh.last_status(), 0);
}

#[test]
fn failure_status_is_kept() {
    let mut sh = shell();
    run(&mut sh, "false");
    assert_eq!(sh.last_status(), 1);
    run(&mut sh, "true");
    assert_eq!(sh.last_status(), 0);
}

#[test]
fn syntax_error_is_reported() {
    let mut sh = shell();
    let (flow, diag) = run(&mut sh, "ls |");
    assert_eq!(flow, Flow::Continue);
    assert_eq!(diag, "dlsh: syntax error near `|`\n");
    assert_eq!(sh.last_status(), 2);
}

#[test]
fn unknown_command_is_127() {
    let mut sh = shell();
    let (_, diag) = run(&mut sh, "dlsh-no-such-command-xyz arg");
    assert_eq!(diag, "dlsh: dlsh-no-such-command-xyz: command not found\n");
    assert_eq!(sh.last_status(), 127);
}

#[test]
fn conditional_chain() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = shell();

    // The target is opened when the line is parsed.
    run(&mut sh, &format!("false && echo no > {}", out.display()));
    assert_eq!(fs::read_to_string(&out).unwrap(), "");

    run(&mut sh, &format!("true && echo yes > {}", out.display()));
    assert_eq!(fs::read_to_string(&out).unwrap(), "yes\n");
}

#[test]
fn unstartable_last_stage_stops_chain() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = shell();

    let (_, diag) = run(&mut sh, &format!("true | dlsh-no-such-xyz && echo ran > {}", out.display()));
    assert_eq!(diag, "dlsh: dlsh-no-such-xyz: command not found\n");
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
    assert_eq!(sh.last_status(), 127);
}

// ═════════════════════════════════════════════════════════════════════════
// exit
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn exit_with_and_without_code() {
    let mut sh = shell();
    assert_eq!(run(&mut sh, "exit 3").0, Flow::Exit(3));

    run(&mut sh, "false");
    assert_eq!(run(&mut sh, "exit").0, Flow::Exit(1));
}

#[test]
fn exit_rejects_bad_code() {
    let mut sh = shell();
    let (flow, diag) = run(&mut sh, "exit soon");
    assert_eq!(flow, Flow::Continue);
    assert!(diag.contains("numeric argument required"));
}

#[test]
fn exit_stops_the_rest_of_the_line() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut sh = shell();
    let (flow, _) = run(&mut sh, &format!("true && exit 4 && echo late > {}", out.display()));
    assert_eq!(flow, Flow::Exit(4));
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

// ═════════════════════════════════════════════════════════════════════════
// Scripts and background jobs
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn script_runs_until_exit() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let script = format!(
        "echo one >> {0}\n\nexit 5\necho never >> {0}\n",
        out.display()
    );
    let mut diag = Vec::new();
    let code = shell().run_script(Cursor::new(script), &mut diag);
    assert_eq!(code, 5);
    assert_eq!(fs::read_to_string(&out).unwrap(), "one\n");
}

#[test]
fn background_job_is_announced_and_reaped() {
    let mut sh = shell();
    let (flow, diag) = run(&mut sh, "sleep 0.2 &");
    assert_eq!(flow, Flow::Continue);
    assert!(diag.starts_with("[1] "), "unexpected notice {diag:?}");
    assert_eq!(sh.jobs().len(), 1);

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut notice = Vec::new();
    while notice.is_empty() && Instant::now() < deadline {
        sh.reap_jobs(&mut notice);
        std::thread::sleep(Duration::from_millis(20));
    }
    let notice = String::from_utf8(notice).unwrap();
    assert!(notice.starts_with("[1]  Done"), "unexpected notice {notice:?}");
    assert!(notice.contains("sleep 0.2"));
    assert!(sh.jobs().is_empty());
}
