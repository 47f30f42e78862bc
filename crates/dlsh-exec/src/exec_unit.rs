#![forbid(unsafe_code)]

//! Execution state for one parsed line.
//!
//! An [`ExecUnit`] owns the line's instructions and walks them on request
//! from the shell loop:
//!
//! | Call                  | Used for                                    |
//! |-----------------------|---------------------------------------------|
//! | [`ExecUnit::exec_pipe`]     | a stage whose connector is `Pipe`     |
//! | [`ExecUnit::drain_exec`]    | the last stage of a pipeline          |
//! | [`ExecUnit::run`]           | a standalone command                  |
//! | [`ExecUnit::drain_pipeline`]| a `Wait` barrier, or the end of line  |
//!
//! The first process of a pipeline leads a new process group and every
//! later stage joins it. With job control enabled that group is given the
//! terminal while it runs; the shell takes it back once the last
//! foreground stage is reaped. A group started while some other group
//! holds the terminal is queued and gets the terminal at the next reap.
//!
//! A pipeline's status is the status of its final stage; earlier stages
//! are reaped only to release them.

use std::collections::VecDeque;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::unistd::Pid;

use crate::error::ExecError;
use crate::instruction::{Connector, Instruction};
use crate::job_control::{ForegroundGuard, JobControl};
use crate::jobs::BackgroundJob;

/// Status recorded when a command could not be started.
const SPAWN_FAILURE_CODE: i32 = 127;

/// Runs the instructions of one line.
#[derive(Debug)]
pub struct ExecUnit {
    instructions: Vec<Instruction>,
    job_control: JobControl,
    /// Read end of the last pipe, waiting for the next stage.
    held_read: Option<OwnedFd>,
    piped: bool,
    group: Option<Pid>,
    foreground: Option<ForegroundGuard>,
    queued: VecDeque<Pid>,
    /// Foreground stages started under job control, with their group.
    members: Vec<(usize, Pid)>,
    /// One past the furthest instruction reached so far.
    reached: usize,
    last_status: Option<ExitStatus>,
}

impl ExecUnit {
    #[must_use]
    pub fn new(instructions: Vec<Instruction>, job_control: JobControl) -> Self {
        Self {
            instructions,
            job_control,
            held_read: None,
            piped: false,
            group: None,
            foreground: None,
            queued: VecDeque::new(),
            members: Vec::new(),
            reached: 0,
            last_status: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Whether a pipeline is open and waiting for its next stage.
    #[must_use]
    pub fn is_piped(&self) -> bool {
        self.piped
    }

    #[must_use]
    pub fn last_status(&self) -> Option<ExitStatus> {
        self.last_status
    }

    /// Whether the most recent foreground command succeeded. True before
    /// anything ran.
    #[must_use]
    pub fn last_succeeded(&self) -> bool {
        self.last_status.is_none_or(|status| status.success())
    }

    /// Record the outcome of a builtin run by the shell.
    pub fn record_status(&mut self, code: i32) {
        self.last_status = Some(ExitStatus::from_raw(code << 8));
    }

    /// Start instruction `index` with its stdout feeding a new pipe.
    ///
    /// The read end is held for the next stage. `cd` in a pipeline only
    /// takes part in the plumbing; its ends close right away.
    pub fn exec_pipe(&mut self, index: usize) -> Result<(), ExecError> {
        self.reach(index);
        self.piped = true;
        let (reader, writer) = io::pipe().map_err(ExecError::Pipe)?;

        let held = self.held_read.take();
        let ins = &mut self.instructions[index];
        if let Some(read_end) = held {
            ins.connect_input(read_end);
        }
        ins.connect_output(writer.into());
        self.held_read = Some(reader.into());

        if ins.is_chdir() {
            ins.release_endpoints();
            return Ok(());
        }
        self.start(index)
    }

    /// Start the final stage of a pipeline, then wait for the whole
    /// pipeline.
    pub fn drain_exec(&mut self, index: usize) -> Result<(), ExecError> {
        self.reach(index);
        let held = self.held_read.take();
        let ins = &mut self.instructions[index];
        if let Some(read_end) = held {
            ins.connect_input(read_end);
        }

        let started = if ins.is_chdir() {
            ins.release_endpoints();
            self.record_status(0);
            Ok(())
        } else {
            self.start(index)
        };
        self.drain_pipeline();
        started
    }

    /// Start a standalone instruction and wait for it.
    pub fn run(&mut self, index: usize) -> Result<(), ExecError> {
        self.reach(index);
        let started = self.start(index);
        self.drain_pipeline();
        started
    }

    /// Wait for every foreground process started so far, close the
    /// descriptors the shell still holds for them, and take the terminal
    /// back.
    pub fn drain_pipeline(&mut self) {
        // Readers further down must see EOF even if the writer never ran.
        self.held_read = None;

        for index in 0..self.reached {
            let ins = &mut self.instructions[index];
            if ins.is_running() && !ins.is_background() {
                let last_stage = ins.connector != Connector::Pipe;
                match ins.wait() {
                    Ok(Some(status)) if last_stage => self.last_status = Some(status),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(index, error = %err, "wait failed"),
                }
                self.after_reap();
            }
            self.instructions[index].release_endpoints();
        }

        self.piped = false;
        self.group = None;
        self.queued.clear();
        self.members.clear();
        self.foreground = None;
    }

    /// Hand over background processes that are still running.
    ///
    /// Call after the line is done; the caller polls them from then on.
    pub fn take_background(&mut self) -> Vec<BackgroundJob> {
        self.instructions[..self.reached]
            .iter_mut()
            .filter(|ins| ins.is_background())
            .filter_map(|ins| {
                let command = ins.command_line();
                ins.take_child().map(|child| BackgroundJob::new(command, child))
            })
            .collect()
    }

    fn reach(&mut self, index: usize) {
        self.reached = self.reached.max(index + 1).min(self.instructions.len());
    }

    fn start(&mut self, index: usize) -> Result<(), ExecError> {
        let job_control = self.job_control.is_enabled();
        let ins = &mut self.instructions[index];
        let background = ins.is_background();

        let process_group = (job_control || background)
            .then(|| self.group.map_or(0, Pid::as_raw));
        let pid = match ins.spawn(process_group) {
            Ok(pid) => pid,
            Err(source) => {
                let command = ins.name().unwrap_or_default().to_string();
                tracing::info!(%command, error = %source, "spawn failed");
                if ins.connector != Connector::Pipe {
                    self.record_status(SPAWN_FAILURE_CODE);
                }
                return Err(ExecError::Spawn { command, source });
            }
        };
        let Ok(raw) = i32::try_from(pid) else {
            return Ok(());
        };
        let pid = Pid::from_raw(raw);
        if process_group.is_some() && self.group.is_none() {
            self.group = Some(pid);
        }

        if background || !job_control {
            return Ok(());
        }
        let group = self.group.unwrap_or(pid);
        self.members.push((index, group));
        if self.foreground.is_some() || self.queued.contains(&group) {
            return Ok(());
        }
        if !self.job_control.owns_foreground() {
            tracing::debug!(%group, "terminal busy, job queued");
            self.queued.push_back(group);
            return Ok(());
        }
        match self.job_control.hand_to(group) {
            Ok(guard) => self.foreground = Some(guard),
            Err(err) => tracing::warn!(%group, error = %err, "cannot give terminal to job"),
        }
        Ok(())
    }

    fn group_running(&self, group: Pid) -> bool {
        self.members
            .iter()
            .any(|&(index, member)| member == group && self.instructions[index].is_running())
    }

    /// After a reap: once the group holding the terminal has no running
    /// stage, pass the terminal to the next queued group that still has
    /// one, or give it back to the shell.
    fn after_reap(&mut self) {
        if let Some(owner) = self.foreground.as_ref().map(ForegroundGuard::owner)
            && self.group_running(owner)
        {
            return;
        }
        while let Some(&next) = self.queued.front()
            && !self.group_running(next)
        {
            self.queued.pop_front();
        }
        let Some(next) = self.queued.pop_front() else {
            self.foreground = None;
            return;
        };
        match self.foreground.as_mut() {
            Some(guard) => {
                if let Err(err) = guard.transfer(next) {
                    tracing::warn!(%next, error = %err, "cannot transfer terminal");
                }
            }
            None => match self.job_control.hand_to(next) {
                Ok(guard) => self.foreground = Some(guard),
                Err(err) => tracing::warn!(%next, error = %err, "cannot give terminal to queued job"),
            },
        }
    }

    /// Walk the instructions from `from`, dispatching each by connector.
    ///
    /// Stops at `cd` and `exit` outside a pipe so the caller can run them
    /// in the shell process and resume past them.
    pub fn step(&mut self, from: usize) -> Step {
        let mut index = from;
        while index < self.instructions.len() {
            let ins = &self.instructions[index];
            let connector = ins.connector;
            let prev_piped = self.piped;

            if connector == Connector::Wait {
                self.drain_pipeline();
                if !self.last_succeeded() {
                    return Step::Stopped;
                }
                index += 1;
                continue;
            }
            if connector != Connector::Pipe && (ins.is_chdir() || ins.is_exit()) {
                return Step::Builtin(index);
            }

            let result = match connector {
                Connector::Pipe => self.exec_pipe(index),
                _ if prev_piped => self.drain_exec(index),
                _ => self.run(index),
            };
            if let Err(err) = result {
                let abort = err.aborts_line();
                if abort {
                    self.drain_pipeline();
                    return Step::Failed(err);
                }
                return Step::Error(err, index + 1);
            }
            index += 1;
        }
        self.drain_pipeline();
        Step::Done
    }
}

/// Where [`ExecUnit::step`] stopped.
#[derive(Debug)]
pub enum Step {
    /// Every instruction ran.
    Done,
    /// An `&&` barrier saw a failure.
    Stopped,
    /// Instruction at this index is a builtin for the shell to run.
    Builtin(usize),
    /// A command failed to start; resume at the index given.
    Error(ExecError, usize),
    /// The line cannot continue.
    Failed(ExecError),
}

impl Drop for ExecUnit {
    fn drop(&mut self) {
        if self.reached > 0 {
            self.drain_pipeline();
        }
    }
}
