#![forbid(unsafe_code)]

//! Error types for parsing and running command lines.

use std::fmt;
use std::io;
use std::path::PathBuf;

use dlsh_core::Token;

/// A command line that cannot be turned into instructions. The line is
/// dropped; nothing from it runs.
#[derive(Debug)]
pub enum ParseError {
    /// An operator in a position where it has nothing to connect.
    Syntax(Token),
    /// A redirection operator without a file name after it.
    MissingTarget(Token),
    /// A redirection target could not be opened.
    Redirect { path: PathBuf, source: io::Error },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(token) => write!(f, "syntax error near `{token}`"),
            Self::MissingTarget(token) => write!(f, "missing file name after `{token}`"),
            Self::Redirect { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Redirect { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure while executing an instruction.
#[derive(Debug)]
pub enum ExecError {
    /// The process could not be started. The rest of the line still runs.
    Spawn { command: String, source: io::Error },
    /// A pipe could not be created. The rest of the line is abandoned.
    Pipe(io::Error),
}

impl ExecError {
    /// Whether the remaining instructions of the line should be skipped.
    #[must_use]
    pub fn aborts_line(&self) -> bool {
        matches!(self, Self::Pipe(_))
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { command, source } if source.kind() == io::ErrorKind::NotFound => {
                write!(f, "{command}: command not found")
            }
            Self::Spawn { command, source } => write!(f, "{command}: {source}"),
            Self::Pipe(source) => write!(f, "cannot create pipe: {source}"),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } | Self::Pipe(source) => Some(source),
        }
    }
}

/// Failure of a shell builtin.
#[derive(Debug)]
pub enum BuiltinError {
    TooManyArgs { builtin: &'static str },
    NotANumber { builtin: &'static str, value: String },
    NoHome,
    Chdir { path: PathBuf, source: io::Error },
}

impl fmt::Display for BuiltinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyArgs { builtin } => write!(f, "{builtin}: too many arguments"),
            Self::NotANumber { builtin, value } => {
                write!(f, "{builtin}: {value}: numeric argument required")
            }
            Self::NoHome => write!(f, "cd: home directory unknown"),
            Self::Chdir { path, source } => write!(f, "cd: {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for BuiltinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Chdir { source, .. } => Some(source),
            _ => None,
        }
    }
}
