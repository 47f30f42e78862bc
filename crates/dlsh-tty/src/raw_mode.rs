#![forbid(unsafe_code)]

//! Terminal mode switching.
//!
//! The cooked-mode attributes are captured once when the session opens.
//! Failing to read them means stdin is not a usable terminal, which the shell
//! treats as fatal. Each line read then enters raw mode through a
//! [`RawModeGuard`] that puts the captured attributes back when dropped, so
//! commands always run with the terminal as the user had it.

use std::fs::File;
use std::io;

use nix::sys::termios::{self, SetArg, Termios};

/// Terminal attributes as they were before the shell touched them.
#[derive(Clone)]
pub struct CookedMode {
    termios: Termios,
}

impl std::fmt::Debug for CookedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookedMode").finish_non_exhaustive()
    }
}

impl CookedMode {
    /// Read the current attributes of `tty`.
    pub fn capture(tty: &File) -> io::Result<Self> {
        let termios = termios::tcgetattr(tty).map_err(io::Error::other)?;
        Ok(Self { termios })
    }
}

/// Raw mode for the duration of one line read.
pub struct RawModeGuard {
    cooked: Termios,
    tty: File,
}

impl RawModeGuard {
    /// Switch `tty` to raw mode; dropping the guard restores `cooked`.
    pub fn enter(tty: &File, cooked: &CookedMode) -> io::Result<Self> {
        let tty = tty.try_clone()?;
        let mut raw = cooked.termios.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&tty, SetArg::TCSADRAIN, &raw).map_err(io::Error::other)?;
        tracing::trace!("raw mode entered");
        Ok(Self {
            cooked: cooked.termios.clone(),
            tty,
        })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = termios::tcsetattr(&self.tty, SetArg::TCSADRAIN, &self.cooked) {
            tracing::warn!(error = %err, "failed to restore terminal mode");
        }
    }
}
