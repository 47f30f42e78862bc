#![forbid(unsafe_code)]
//! The dlsh shell: argument handling, logging setup, and the loop that
//! ties the line editor to the execution engine.

pub mod cli;
pub mod logging;
pub mod session;
pub mod shell;

pub use shell::{Flow, Shell};
