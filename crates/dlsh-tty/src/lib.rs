#![forbid(unsafe_code)]
//! Raw-mode line editing for the dlsh shell.
//!
//! ## Escape Sequence Reference
//!
//! | Purpose              | Sequence               |
//! |----------------------|------------------------|
//! | Cursor position      | `CSI 6n` -> `CSI r;c R` |
//! | Move cursor          | `CSI r;c H`            |
//! | Clear to end of line | `CSI K`                |
//! | Clear below          | `CSI J`                |
//! | Cursor show/hide     | `CSI ? 25 h` / `l`     |
//! | Dim / inverse / reset| `CSI 2m` / `7m` / `0m` |
//!
//! ## Modules
//!
//! - [`tty`]: the session that reads one line at a time
//! - [`editor`]: keystroke semantics, independent of the terminal
//! - [`render`] and [`layout`]: drawing and row wrapping
//! - [`input`], [`cursor`], [`raw_mode`], [`resize`]: terminal plumbing
//! - [`prompt`]: the prompt badge

pub mod cursor;
pub mod editor;
pub mod input;
pub mod layout;
pub mod prompt;
pub mod raw_mode;
pub mod render;
pub mod resize;
pub mod tty;

pub use editor::{EditOutcome, LineEditor};
pub use tty::{ReadOutcome, Tty};
