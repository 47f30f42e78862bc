#![forbid(unsafe_code)]

//! Terminal foreground ownership.
//!
//! When the shell runs on a terminal, each foreground pipeline gets its own
//! process group and the terminal is handed to it for as long as it runs.
//! While the shell is not the foreground group it blocks `SIGTTOU`,
//! `SIGTTIN` and `SIGTSTP` on its own thread, so taking the terminal back
//! with `tcsetpgrp` cannot stop it. Children start with an empty signal
//! mask and keep default dispositions.
//!
//! # Lifecycle
//!
//! ```text
//! JobControl::detect() ──► hand_to(pgid) ──► ForegroundGuard
//!                                               │ transfer(next)
//!                                               ▼
//!                                             drop: tcsetpgrp(shell), unmask
//! ```

use std::fmt;
use std::io::{self, IsTerminal};
use std::os::fd::{AsFd, OwnedFd};
use std::rc::Rc;

use nix::sys::signal::{SigSet, SigmaskHow, Signal};
use nix::unistd::{Pid, getpgrp, tcgetpgrp, tcsetpgrp};

struct Terminal {
    fd: OwnedFd,
    shell_group: Pid,
}

/// Handle on the controlling terminal, or a disabled stand-in when the
/// shell is not attached to one.
#[derive(Clone, Default)]
pub struct JobControl {
    terminal: Option<Rc<Terminal>>,
}

impl fmt::Debug for JobControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobControl")
            .field("enabled", &self.is_enabled())
            .field("shell_group", &self.terminal.as_ref().map(|t| t.shell_group))
            .finish()
    }
}

impl JobControl {
    /// Job control that never touches the terminal.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enable job control when stdin is a terminal whose foreground group
    /// is the shell's own.
    #[must_use]
    pub fn detect() -> Self {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Self::disabled();
        }
        match stdin.as_fd().try_clone_to_owned() {
            Ok(fd) => Self::from_terminal(fd),
            Err(err) => {
                tracing::warn!(error = %err, "job control disabled: cannot dup stdin");
                Self::disabled()
            }
        }
    }

    /// Enable job control on `fd`, which must be the controlling terminal
    /// with the shell's group in the foreground.
    #[must_use]
    pub fn from_terminal(fd: OwnedFd) -> Self {
        let shell_group = getpgrp();
        match tcgetpgrp(&fd) {
            Ok(foreground) if foreground == shell_group => {}
            Ok(foreground) => {
                tracing::info!(%foreground, %shell_group, "job control disabled: shell is not in the foreground");
                return Self::disabled();
            }
            Err(err) => {
                tracing::warn!(error = %err, "job control disabled: tcgetpgrp failed");
                return Self::disabled();
            }
        }
        tracing::debug!(%shell_group, "job control enabled");
        Self {
            terminal: Some(Rc::new(Terminal { fd, shell_group })),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.terminal.is_some()
    }

    /// Whether the shell's own group currently owns the terminal.
    #[must_use]
    pub fn owns_foreground(&self) -> bool {
        self.terminal
            .as_ref()
            .is_some_and(|t| tcgetpgrp(&t.fd).is_ok_and(|fg| fg == t.shell_group))
    }

    /// Give the terminal to `group`. Dropping the guard takes it back.
    pub fn hand_to(&self, group: Pid) -> nix::Result<ForegroundGuard> {
        let Some(terminal) = self.terminal.clone() else {
            return Err(nix::Error::ENOTTY);
        };

        let mut stops = SigSet::empty();
        stops.add(Signal::SIGTTOU);
        stops.add(Signal::SIGTTIN);
        stops.add(Signal::SIGTSTP);
        let saved_mask = stops.thread_swap_mask(SigmaskHow::SIG_BLOCK)?;

        if let Err(err) = tcsetpgrp(&terminal.fd, group) {
            if let Err(restore) = saved_mask.thread_set_mask() {
                tracing::error!(error = %restore, "failed to restore signal mask");
            }
            return Err(err);
        }
        tracing::debug!(%group, "terminal handed to job");
        Ok(ForegroundGuard {
            terminal,
            saved_mask,
            owner: group,
        })
    }
}

/// The terminal belongs to a job while this lives.
pub struct ForegroundGuard {
    terminal: Rc<Terminal>,
    saved_mask: SigSet,
    owner: Pid,
}

impl fmt::Debug for ForegroundGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForegroundGuard")
            .field("owner", &self.owner)
            .field("shell_group", &self.terminal.shell_group)
            .finish()
    }
}

impl ForegroundGuard {
    #[must_use]
    pub fn owner(&self) -> Pid {
        self.owner
    }

    /// Move the terminal to another group without passing through the
    /// shell.
    pub fn transfer(&mut self, group: Pid) -> nix::Result<()> {
        tcsetpgrp(&self.terminal.fd, group)?;
        tracing::debug!(from = %self.owner, to = %group, "terminal transferred");
        self.owner = group;
        Ok(())
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        if let Err(err) = tcsetpgrp(&self.terminal.fd, self.terminal.shell_group) {
            tracing::error!(error = %err, "failed to reclaim the terminal");
        }
        if let Err(err) = self.saved_mask.thread_set_mask() {
            tracing::error!(error = %err, "failed to restore signal mask");
        }
    }
}
