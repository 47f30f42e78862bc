#![forbid(unsafe_code)]

//! Diagnostic log setup.
//!
//! The terminal belongs to the line editor, so logs only ever go to a file.
//! Without `DLSH_LOG_FILE` no subscriber is installed at all.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Filter used when `DLSH_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings read from `DLSH_LOG*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
    pub filter: String,
    pub format: LogFormat,
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    #[must_use]
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let format = match var("DLSH_LOG_FORMAT") {
            Some(val) if val.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            file: var("DLSH_LOG_FILE")
                .filter(|val| !val.is_empty())
                .map(PathBuf::from),
            filter: var("DLSH_LOG")
                .filter(|val| !val.is_empty())
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            format,
        }
    }
}

/// Install the global subscriber. Returns `false` when logging is off.
pub fn init(config: &LogConfig) -> io::Result<bool> {
    let Some(path) = &config.file else {
        return Ok(false);
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let writer = Mutex::new(file);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(writer)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(filter)
            .with_writer(writer)
            .try_init(),
    };
    installed.map_err(io::Error::other)?;
    tracing::info!(version = crate::cli::VERSION, "dlsh starting");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_logging() {
        let config = LogConfig::from_vars(|_| None);
        assert_eq!(config.file, None);
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.format, LogFormat::Text);
        assert!(!init(&config).unwrap());
    }

    #[test]
    fn reads_variables() {
        let config = LogConfig::from_vars(|name| match name {
            "DLSH_LOG_FILE" => Some("/tmp/dlsh.log".into()),
            "DLSH_LOG" => Some("dlsh_exec=trace".into()),
            "DLSH_LOG_FORMAT" => Some("JSON".into()),
            _ => None,
        });
        assert_eq!(config.file, Some(PathBuf::from("/tmp/dlsh.log")));
        assert_eq!(config.filter, "dlsh_exec=trace");
        assert_eq!(config.format, LogFormat::Json);
    }
}
