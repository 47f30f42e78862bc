#![forbid(unsafe_code)]

//! Window-size change notification.
//!
//! A signal-hook iterator thread listens for `SIGWINCH` and only raises a
//! flag. The line reader checks the flag between input polls and does all
//! redrawing itself, on its own thread.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use signal_hook::consts::signal::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};

/// Running `SIGWINCH` listener. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct ResizeWatcher {
    pending: Arc<AtomicBool>,
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ResizeWatcher {
    pub fn start() -> io::Result<Self> {
        let mut signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();
        let pending = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&pending);
        let thread = std::thread::Builder::new()
            .name("dlsh-winch".into())
            .spawn(move || {
                for _ in signals.forever() {
                    flag.store(true, Ordering::Release);
                }
            })?;

        Ok(Self {
            pending,
            handle,
            thread: Some(thread),
        })
    }

    /// Consume a pending resize notification, if any.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
