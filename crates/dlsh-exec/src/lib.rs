#![forbid(unsafe_code)]
//! Command-line parsing and execution for the dlsh shell.
//!
//! A line goes from tokens to [`Instruction`]s with [`parse`], and the
//! instructions run inside an [`ExecUnit`]. Pipelines share a process
//! group that owns the terminal while it runs, `&&` waits and checks
//! status, and `&` leaves a pipeline to the [`JobTable`].
//!
//! # Modules
//!
//! - [`parser`]: tokens to instructions, redirect targets opened
//! - [`instruction`]: argv, stream endpoints, process handle
//! - [`exec_unit`]: pipes, waiting, foreground handoff
//! - [`job_control`]: terminal ownership and signal masking
//! - [`jobs`]: background job table
//! - [`path`]: `PATH` lookup

pub mod error;
pub mod exec_unit;
pub mod instruction;
pub mod job_control;
pub mod jobs;
pub mod parser;
pub mod path;

pub use error::{BuiltinError, ExecError, ParseError};
pub use exec_unit::{ExecUnit, Step};
pub use instruction::{Connector, Endpoint, Instruction};
pub use job_control::{ForegroundGuard, JobControl};
pub use jobs::{BackgroundJob, Finished, JobTable};
pub use parser::parse;
