#![forbid(unsafe_code)]

//! Executable lookup along `PATH`.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Resolve a command name against the process's `PATH`.
#[must_use]
pub fn lookup(name: &str) -> Option<PathBuf> {
    lookup_in(name, env::var_os("PATH").as_deref())
}

/// Resolve a command name against an explicit search path.
///
/// Names containing a `/` are taken literally. Otherwise the first
/// directory holding an executable regular file of that name wins.
#[must_use]
pub fn lookup_in(name: &str, search: Option<&OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        return Some(PathBuf::from(name));
    }
    env::split_paths(search?)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}
