#![forbid(unsafe_code)]

//! Top-level run modes: interactive terminal session, `-c`, and script
//! input from a pipe or file.

use std::io::{self, BufRead};
use std::path::Path;

use dlsh_core::{History, Pattern};
use dlsh_exec::JobControl;
use dlsh_tty::{ReadOutcome, Tty};

use crate::cli::Opts;
use crate::shell::{Flow, Shell};

/// Consecutive failed reads tolerated before the session gives up.
const MAX_READ_FAILURES: u32 = 3;

/// Run a single line (`dlsh -c`).
pub fn run_command(line: &str) -> i32 {
    let mut shell = Shell::new(JobControl::disabled());
    match shell.run_line(line, &mut io::stderr()) {
        Flow::Exit(code) => code,
        Flow::Continue => shell.last_status(),
    }
}

/// Run lines read from a non-terminal stdin.
pub fn run_script(input: impl BufRead) -> i32 {
    Shell::new(JobControl::disabled()).run_script(input, &mut io::stderr())
}

/// The interactive loop. Returns the shell's exit status.
pub fn run_interactive(opts: &Opts) -> i32 {
    let mut history = History::new();
    let histfile = opts
        .histfile
        .as_deref()
        .and_then(|path| load_history(&mut history, path));

    let mut tty = match Tty::open(history) {
        Ok(tty) => tty,
        Err(err) => {
            tracing::error!(error = %err, "cannot read terminal attributes");
            eprintln!("dlsh: cannot read terminal attributes: {err}");
            return 1;
        }
    };
    if let Some(expr) = &opts.word_boundary {
        match Pattern::new(expr) {
            Ok(pattern) => tty.set_word_pattern(pattern),
            Err(err) => eprintln!("dlsh: DLSH_WORD_BOUNDARY ignored: {err}"),
        }
    }

    let mut shell = Shell::new(JobControl::detect());
    let mut stderr = io::stderr();
    let mut failures = 0;
    let code = loop {
        shell.reap_jobs(&mut stderr);
        match tty.read_line() {
            Ok(ReadOutcome::Line(line)) => {
                failures = 0;
                if let Flow::Exit(code) = shell.run_line(&line, &mut stderr) {
                    break code;
                }
            }
            Ok(ReadOutcome::Interrupted) => failures = 0,
            Ok(ReadOutcome::Eof) => break shell.last_status(),
            Err(err) => {
                failures += 1;
                tracing::error!(error = %err, failures, "line read failed");
                eprintln!("dlsh: {err}");
                if failures >= MAX_READ_FAILURES {
                    break 1;
                }
            }
        }
    };

    if let Some(path) = histfile {
        match tty.history().dump_file(path) {
            Ok(written) => tracing::debug!(path = %path.display(), written, "history saved"),
            Err(err) => {
                tracing::warn!(error = %err, "history not saved");
                eprintln!("dlsh: {err}");
            }
        }
    }
    code
}

/// Load the history file; on failure the session keeps history in memory.
fn load_history<'a>(history: &mut History, path: &'a Path) -> Option<&'a Path> {
    match history.load_file(path) {
        Ok(loaded) => {
            tracing::info!(path = %path.display(), loaded, "history loaded");
            Some(path)
        }
        Err(err) => {
            tracing::warn!(error = %err, "history file unavailable");
            eprintln!("dlsh: history will not be saved: {err}");
            None
        }
    }
}
