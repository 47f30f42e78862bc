#![forbid(unsafe_code)]

//! One command of a parsed line: its argv, where its streams go, and the
//! process it became.
//!
//! Every descriptor an [`Instruction`] holds is owned. Spawning hands the
//! owned ends to the child and leaves [`Endpoint::Handed`] behind, so the
//! shell's copies close whether or not the spawn succeeded.

use std::fs::File;
use std::io;
use std::mem;
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::BuiltinError;
use crate::path;

/// How an instruction relates to the one after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connector {
    /// Runs on its own; the next instruction starts after it finishes.
    #[default]
    Exec,
    /// Stdout feeds the next instruction's stdin.
    Pipe,
    /// Barrier from `&&`: everything before it must finish, and succeed.
    Wait,
}

/// One end of a standard stream.
#[derive(Debug, Default)]
pub enum Endpoint {
    /// Shares the shell's stream.
    #[default]
    Inherit,
    /// A `<`, `>` or `>>` target.
    File(File),
    /// One end of a pipe to a neighbouring instruction.
    Pipe(OwnedFd),
    /// Passed to the child (or dropped) at spawn time.
    Handed,
}

impl Endpoint {
    #[must_use]
    pub fn holds_descriptor(&self) -> bool {
        matches!(self, Self::File(_) | Self::Pipe(_))
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::File(_))
    }

    fn take_stdio(&mut self) -> Stdio {
        match mem::replace(self, Self::Handed) {
            Self::Inherit => {
                *self = Self::Inherit;
                Stdio::inherit()
            }
            Self::File(file) => Stdio::from(file),
            Self::Pipe(fd) => Stdio::from(fd),
            Self::Handed => Stdio::null(),
        }
    }

    fn release(&mut self) {
        if self.holds_descriptor() {
            *self = Self::Handed;
        }
    }
}

/// A single command with its connector, streams and process state.
#[derive(Debug, Default)]
pub struct Instruction {
    pub connector: Connector,
    args: Vec<String>,
    program: Option<PathBuf>,
    stdin: Endpoint,
    stdout: Endpoint,
    stderr: Endpoint,
    background: bool,
    child: Option<Child>,
    status: Option<ExitStatus>,
}

impl Instruction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument. The first one names the program and is
    /// resolved along `PATH`.
    pub fn push_arg(&mut self, arg: String) {
        if self.args.is_empty() {
            self.program = path::lookup(&arg);
        }
        self.args.push(arg);
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Resolved executable, when `PATH` lookup found one.
    #[must_use]
    pub fn program(&self) -> Option<&std::path::Path> {
        self.program.as_deref()
    }

    #[must_use]
    pub fn has_command(&self) -> bool {
        !self.args.is_empty()
    }

    /// The command as typed, for messages and job listings.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }

    #[must_use]
    pub fn is_chdir(&self) -> bool {
        self.name() == Some("cd")
    }

    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.name() == Some("exit")
    }

    #[must_use]
    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn set_background(&mut self, background: bool) {
        self.background = background;
    }

    #[must_use]
    pub fn stdin(&self) -> &Endpoint {
        &self.stdin
    }

    #[must_use]
    pub fn stdout(&self) -> &Endpoint {
        &self.stdout
    }

    #[must_use]
    pub fn stderr(&self) -> &Endpoint {
        &self.stderr
    }

    /// Whether any stream still holds a descriptor owned by the shell.
    #[must_use]
    pub fn holds_descriptor(&self) -> bool {
        self.stdin.holds_descriptor()
            || self.stdout.holds_descriptor()
            || self.stderr.holds_descriptor()
    }

    pub fn redirect_input(&mut self, file: File) {
        self.stdin = Endpoint::File(file);
    }

    pub fn redirect_output(&mut self, file: File) {
        self.stdout = Endpoint::File(file);
    }

    pub fn redirect_error(&mut self, file: File) {
        self.stderr = Endpoint::File(file);
    }

    /// Attach the read end of the previous stage's pipe. An explicit `<`
    /// wins; the pipe end is dropped and `false` returned.
    pub fn connect_input(&mut self, fd: OwnedFd) -> bool {
        if self.stdin.is_redirect() {
            return false;
        }
        self.stdin = Endpoint::Pipe(fd);
        true
    }

    /// Attach the write end of the pipe to the next stage. An explicit `>`
    /// wins; the pipe end is dropped and `false` returned.
    pub fn connect_output(&mut self, fd: OwnedFd) -> bool {
        if self.stdout.is_redirect() {
            return false;
        }
        self.stdout = Endpoint::Pipe(fd);
        true
    }

    pub fn close_input(&mut self) {
        self.stdin.release();
    }

    pub fn close_output(&mut self) {
        self.stdout.release();
    }

    /// Close every descriptor the shell still holds for this instruction.
    pub fn release_endpoints(&mut self) {
        self.close_input();
        self.close_output();
        self.stderr.release();
    }

    /// Change the shell's working directory (`cd [dir]`).
    ///
    /// Without an argument the home directory is used.
    pub fn chdir(&self) -> Result<PathBuf, BuiltinError> {
        let target = match self.args.len() {
            0 | 1 => dirs::home_dir().ok_or(BuiltinError::NoHome)?,
            2 => PathBuf::from(&self.args[1]),
            _ => return Err(BuiltinError::TooManyArgs { builtin: "cd" }),
        };
        std::env::set_current_dir(&target).map_err(|source| BuiltinError::Chdir {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    /// Status requested by `exit [code]`; `None` when no code was given.
    pub fn exit_code(&self) -> Result<Option<i32>, BuiltinError> {
        match self.args.as_slice() {
            [] | [_] => Ok(None),
            [_, code] => code
                .parse()
                .map(Some)
                .map_err(|_| BuiltinError::NotANumber {
                    builtin: "exit",
                    value: code.clone(),
                }),
            _ => Err(BuiltinError::TooManyArgs { builtin: "exit" }),
        }
    }

    /// Start the process.
    ///
    /// `process_group` follows [`CommandExt::process_group`]: `0` makes the
    /// child a new group leader, any other value joins that group.
    pub fn spawn(&mut self, process_group: Option<i32>) -> io::Result<u32> {
        let Some((name, rest)) = self.args.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        };
        let program = self.program.clone().unwrap_or_else(|| PathBuf::from(name));

        let mut command = Command::new(program);
        command
            .arg0(name)
            .args(rest)
            .stdin(self.stdin.take_stdio())
            .stdout(self.stdout.take_stdio())
            .stderr(self.stderr.take_stdio());
        if let Some(group) = process_group {
            command.process_group(group);
        }

        let child = command.spawn()?;
        let pid = child.id();
        tracing::debug!(pid, command = %self.command_line(), background = self.background, "spawned");
        self.child = Some(child);
        Ok(pid)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Block until the process exits. The status is kept for
    /// [`Instruction::status`].
    pub fn wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        // The child stays put when waiting fails so a later call can reap it.
        let status = child.wait()?;
        tracing::debug!(pid = child.id(), %status, "reaped");
        self.child = None;
        self.status = Some(status);
        Ok(Some(status))
    }

    /// Exit status of a reaped process.
    #[must_use]
    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    pub(crate) fn take_child(&mut self) -> Option<Child> {
        self.child.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_fds() -> (OwnedFd, OwnedFd) {
        let (reader, writer) = io::pipe().unwrap();
        (reader.into(), writer.into())
    }

    #[test]
    fn first_argument_names_program() {
        let mut ins = Instruction::new();
        assert!(!ins.has_command());
        ins.push_arg("./local-script".into());
        ins.push_arg("--flag".into());
        assert_eq!(ins.name(), Some("./local-script"));
        assert_eq!(ins.program(), Some(std::path::Path::new("./local-script")));
        assert_eq!(ins.command_line(), "./local-script --flag");
        assert!(!ins.is_chdir());
    }

    #[test]
    fn redirect_beats_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("out")).unwrap();

        let mut ins = Instruction::new();
        ins.redirect_output(file);
        let (_reader, writer) = pipe_fds();
        assert!(!ins.connect_output(writer));
        assert!(ins.stdout().is_redirect());

        let (reader, _writer) = pipe_fds();
        assert!(ins.connect_input(reader));
        assert!(matches!(ins.stdin(), Endpoint::Pipe(_)));
    }

    #[test]
    fn release_closes_held_ends() {
        let mut ins = Instruction::new();
        let (reader, writer) = pipe_fds();
        ins.connect_input(reader);
        ins.connect_output(writer);
        assert!(ins.holds_descriptor());
        ins.release_endpoints();
        assert!(!ins.holds_descriptor());
    }

    #[test]
    fn failed_spawn_still_hands_descriptors() {
        let mut ins = Instruction::new();
        ins.push_arg("/nonexistent/dlsh-test-binary".into());
        let (_reader, writer) = pipe_fds();
        ins.connect_output(writer);
        let err = ins.spawn(None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!ins.holds_descriptor());
        assert!(!ins.is_running());
    }

    #[test]
    fn cd_rejects_extra_arguments() {
        let mut ins = Instruction::new();
        for arg in ["cd", "a", "b"] {
            ins.push_arg(arg.into());
        }
        assert!(ins.is_chdir());
        assert!(matches!(
            ins.chdir(),
            Err(BuiltinError::TooManyArgs { builtin: "cd" })
        ));
    }

    #[test]
    fn exit_code_argument() {
        let mut ins = Instruction::new();
        ins.push_arg("exit".into());
        assert!(ins.is_exit());
        assert_eq!(ins.exit_code().unwrap(), None);
        ins.push_arg("3".into());
        assert_eq!(ins.exit_code().unwrap(), Some(3));
        ins.push_arg("4".into());
        assert!(ins.exit_code().is_err());

        let mut bad = Instruction::new();
        bad.push_arg("exit".into());
        bad.push_arg("soon".into());
        assert!(matches!(
            bad.exit_code(),
            Err(BuiltinError::NotANumber { builtin: "exit", .. })
        ));
    }

    #[test]
    fn error_stream_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("err");
        let mut ins = Instruction::new();
        for arg in ["sh", "-c", "echo oops >&2"] {
            ins.push_arg(arg.into());
        }
        ins.redirect_error(File::create(&path).unwrap());
        ins.spawn(None).unwrap();
        assert!(!ins.holds_descriptor());
        ins.wait().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "oops\n");
    }

    #[test]
    fn spawn_and_wait() {
        let mut ins = Instruction::new();
        ins.push_arg("true".into());
        ins.spawn(None).unwrap();
        assert!(ins.is_running());
        let status = ins.wait().unwrap().unwrap();
        assert!(status.success());
        assert_eq!(ins.status(), Some(status));
        assert!(ins.wait().unwrap().is_none());
    }

    #[test]
    fn failed_wait_keeps_the_child() {
        use nix::sys::wait::waitpid;
        use nix::unistd::Pid;

        let mut ins = Instruction::new();
        ins.push_arg("true".into());
        let pid = ins.spawn(None).unwrap();
        // Reaped behind the instruction's back: waiting on it now fails.
        waitpid(Pid::from_raw(i32::try_from(pid).unwrap()), None).unwrap();

        assert!(ins.wait().is_err());
        assert!(ins.is_running());
        assert_eq!(ins.status(), None);
    }
}
