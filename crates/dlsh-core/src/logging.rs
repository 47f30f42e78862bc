#![forbid(unsafe_code)]

//! Diagnostic logging hooks.
//!
//! With the `tracing` feature the usual `tracing` event macros are re-exported
//! here and at the crate root. Without it, same-named macros swallow their
//! arguments so call sites such as `crate::warn!(path = %p, "load failed")`
//! compile either way.
//!
//! The shell binary turns the feature on and routes events to a log file;
//! nothing here ever writes to the terminal, which is in raw mode while a line
//! is being edited.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// Discards a debug event.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Discards an error event.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    /// Discards an info event.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// Discards a trace event.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Discards a warn event.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}
