#![forbid(unsafe_code)]

//! The line runner: tokenize, parse, walk the instructions.
//!
//! Builtins (`cd`, `exit`) run here in the shell process; everything else
//! is handed to an [`ExecUnit`]. Diagnostics go to the writer passed in,
//! which is stderr outside of tests.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use dlsh_core::tokenize;
use dlsh_exec::{ExecUnit, JobControl, JobTable, Step, parse};

/// Status after a line that failed to parse.
const PARSE_FAILURE_CODE: i32 = 2;

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Shell state that outlives a single line.
#[derive(Debug)]
pub struct Shell {
    job_control: JobControl,
    jobs: JobTable,
    last_status: i32,
}

impl Shell {
    #[must_use]
    pub fn new(job_control: JobControl) -> Self {
        Self {
            job_control,
            jobs: JobTable::new(),
            last_status: 0,
        }
    }

    /// Status of the most recent foreground command, shell style.
    #[must_use]
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    #[must_use]
    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Run one command line.
    pub fn run_line(&mut self, line: &str, diag: &mut impl Write) -> Flow {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return Flow::Continue;
        }
        let instructions = match parse(&tokens) {
            Ok(instructions) => instructions,
            Err(err) => {
                tracing::debug!(error = %err, "line rejected");
                report(diag, &err);
                self.last_status = PARSE_FAILURE_CODE;
                return Flow::Continue;
            }
        };

        let mut unit = ExecUnit::new(instructions, self.job_control.clone());
        let mut from = 0;
        let flow = loop {
            match unit.step(from) {
                Step::Done | Step::Stopped => break Flow::Continue,
                Step::Error(err, next) => {
                    report(diag, &err);
                    from = next;
                }
                Step::Failed(err) => {
                    report(diag, &err);
                    break Flow::Continue;
                }
                Step::Builtin(index) => {
                    let ins = &unit.instructions()[index];
                    if ins.is_exit() {
                        match ins.exit_code() {
                            Ok(code) => {
                                unit.drain_pipeline();
                                let fallback = unit.last_status().map_or(self.last_status, status_code);
                                break Flow::Exit(code.unwrap_or(fallback));
                            }
                            Err(err) => {
                                report(diag, &err);
                                unit.record_status(1);
                                from = index + 1;
                                continue;
                            }
                        }
                    }
                    match ins.chdir() {
                        Ok(dir) => {
                            tracing::debug!(dir = %dir.display(), "changed directory");
                            unit.record_status(0);
                            from = index + 1;
                        }
                        Err(err) => {
                            report(diag, &err);
                            unit.record_status(1);
                            unit.drain_pipeline();
                            break Flow::Continue;
                        }
                    }
                }
            }
        };

        if let Some(status) = unit.last_status() {
            self.last_status = status_code(status);
        }
        for job in unit.take_background() {
            let pid = job.pid();
            let id = self.jobs.push(job);
            note(diag, format_args!("[{id}] {pid}"));
        }
        flow
    }

    /// Report background jobs that finished since the last call.
    pub fn reap_jobs(&mut self, out: &mut impl Write) {
        for done in self.jobs.reap_finished() {
            let state = match done.status.code() {
                Some(0) => "Done".to_string(),
                Some(code) => format!("Exit {code}"),
                None => format!("Killed {}", status_code(done.status)),
            };
            note(out, format_args!("[{}]  {state:<8}{}", done.id, done.command));
        }
    }

    /// Run lines from a non-terminal input until it ends or `exit` runs.
    pub fn run_script(&mut self, input: impl BufRead, diag: &mut impl Write) -> i32 {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    report(diag, &err);
                    return 1;
                }
            };
            self.reap_jobs(diag);
            if let Flow::Exit(code) = self.run_line(&line, diag) {
                return code;
            }
        }
        self.last_status
    }
}

/// Exit status as a shell reports it: the code, or 128 plus the signal.
#[must_use]
pub fn status_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

fn report(diag: &mut impl Write, err: &impl Display) {
    note(diag, format_args!("dlsh: {err}"));
}

fn note(out: &mut impl Write, msg: std::fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{msg}") {
        tracing::debug!(error = %err, "diagnostic write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(status_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(status_code(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(status_code(ExitStatus::from_raw(9)), 137);
    }

    #[test]
    fn blank_line_is_a_no_op() {
        let mut shell = Shell::new(JobControl::disabled());
        let mut diag = Vec::new();
        assert_eq!(shell.run_line("   ", &mut diag), Flow::Continue);
        assert!(diag.is_empty());
        assert_eq!(shell.last_status(), 0);
    }
}
