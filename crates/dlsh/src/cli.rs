#![forbid(unsafe_code)]

//! Command-line arguments for the `dlsh` binary.
//!
//! Parsed by hand. `DLSH_*` environment variables supply defaults that
//! explicit flags override.

use std::env;
use std::path::PathBuf;

use dlsh_core::history::default_history_path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
dlsh - interactive shell with history suggestions

USAGE:
    dlsh [OPTIONS]
    dlsh -c COMMAND

OPTIONS:
    -c COMMAND           Run one command line and exit
    --histfile=PATH      History file (default: ~/.dlshrc)
    --no-history         Keep history for this session only
    --help, -h           Show this help message
    --version, -V        Show version

KEYBINDINGS:
    Up / Down            Older / newer entry matching the typed prefix
    Right (at end)       Accept the dimmed suggestion
    Ctrl+Left/Right      Move by word
    Ctrl/Alt+Backspace   Delete the word before the cursor
    Ctrl+C               Discard the line
    Ctrl+D               Exit

ENVIRONMENT VARIABLES:
    DLSH_HISTFILE        Override the default history file
    DLSH_WORD_BOUNDARY   Regex of characters that separate words
    DLSH_LOG             Log filter, e.g. debug or dlsh_exec=trace (default: warn)
    DLSH_LOG_FILE        Write logs to this file (default: no logging)
    DLSH_LOG_FORMAT      'text' (default) or 'json'";

/// What the process should do after parsing arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(Opts),
    Help,
    Version,
}

/// Parsed options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// History file; `None` keeps history in memory only.
    pub histfile: Option<PathBuf>,
    /// Line to run non-interactively.
    pub command: Option<String>,
    /// Word-boundary regex for word motion.
    pub word_boundary: Option<String>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            histfile: default_history_path(),
            command: None,
            word_boundary: None,
        }
    }
}

impl Opts {
    /// Parse the process's arguments and environment.
    pub fn from_env() -> Result<Action, String> {
        Self::parse(env::args().skip(1), |name| env::var(name).ok())
    }

    /// Parse explicit arguments with a caller-supplied environment.
    pub fn parse<I, E>(args: I, var: E) -> Result<Action, String>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = var("DLSH_HISTFILE")
            && !val.is_empty()
        {
            opts.histfile = Some(PathBuf::from(val));
        }
        if let Some(val) = var("DLSH_WORD_BOUNDARY")
            && !val.is_empty()
        {
            opts.word_boundary = Some(val);
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Action::Help),
                "--version" | "-V" => return Ok(Action::Version),
                "--no-history" => opts.histfile = None,
                "-c" => match args.next() {
                    Some(line) => opts.command = Some(line),
                    None => return Err("-c requires a command".into()),
                },
                other => {
                    if let Some(val) = other.strip_prefix("--histfile=") {
                        if val.is_empty() {
                            return Err("--histfile needs a path".into());
                        }
                        opts.histfile = Some(PathBuf::from(val));
                    } else {
                        return Err(format!(
                            "Unknown argument: {other}\nRun with --help for usage information."
                        ));
                    }
                }
            }
        }

        Ok(Action::Run(opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Action, String> {
        Opts::parse(args.iter().map(|a| (*a).to_string()), |_| None)
    }

    fn opts(action: Result<Action, String>) -> Opts {
        match action {
            Ok(Action::Run(opts)) => opts,
            other => panic!("expected options, got {other:?}"),
        }
    }

    #[test]
    fn defaults() {
        let parsed = opts(parse(&[]));
        assert_eq!(parsed.histfile, default_history_path());
        assert_eq!(parsed.command, None);
        assert_eq!(parsed.word_boundary, None);
    }

    #[test]
    fn flags() {
        let parsed = opts(parse(&["--histfile=/tmp/h", "-c", "echo hi"]));
        assert_eq!(parsed.histfile, Some(PathBuf::from("/tmp/h")));
        assert_eq!(parsed.command.as_deref(), Some("echo hi"));

        assert_eq!(opts(parse(&["--no-history"])).histfile, None);
        assert_eq!(parse(&["-h"]), Ok(Action::Help));
        assert_eq!(parse(&["--version"]), Ok(Action::Version));
    }

    #[test]
    fn flags_override_environment() {
        let env = |name: &str| match name {
            "DLSH_HISTFILE" => Some("/env/hist".to_string()),
            "DLSH_WORD_BOUNDARY" => Some("[ /]".to_string()),
            _ => None,
        };
        let from_env = opts(Opts::parse(Vec::new(), env));
        assert_eq!(from_env.histfile, Some(PathBuf::from("/env/hist")));
        assert_eq!(from_env.word_boundary.as_deref(), Some("[ /]"));

        let flagged = opts(Opts::parse(vec!["--histfile=/flag".to_string()], env));
        assert_eq!(flagged.histfile, Some(PathBuf::from("/flag")));
    }

    #[test]
    fn bad_arguments() {
        assert!(parse(&["--bogus"]).unwrap_err().contains("--bogus"));
        assert!(parse(&["-c"]).is_err());
        assert!(parse(&["--histfile="]).is_err());
    }

    #[test]
    fn help_mentions_every_variable() {
        for var in ["DLSH_HISTFILE", "DLSH_WORD_BOUNDARY", "DLSH_LOG", "DLSH_LOG_FILE", "DLSH_LOG_FORMAT"] {
            assert!(HELP_TEXT.contains(var), "{var} missing from help");
        }
        assert!(!VERSION.is_empty());
    }
}
