#![forbid(unsafe_code)]

//! Command history with recall cursor and file persistence.
//!
//! # Recall model
//!
//! The cursor ranges over `0..=len`. `len` is the composing slot: the line
//! the user is typing, which is stashed in a scratch buffer when recall starts
//! and handed back when recall walks forward past the newest entry.
//! Consecutive repeats of the same line (same trie node) are stepped over as
//! one entry.
//!
//! # Persistence
//!
//! Lines loaded from disk occupy `0..base`. [`History::dump`] writes only the
//! lines appended after loading, so the file grows by this session's entries.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::priority_heap::PriorityHeap;
use crate::trie::{NodeId, Trie, TrieError};

/// Default history file name inside the home directory.
pub const HISTORY_FILE_NAME: &str = ".dlshrc";

/// `~/.dlshrc`, when a home directory is known.
#[must_use]
pub fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME))
}

#[derive(Debug)]
pub enum HistoryError {
    /// There is nothing to recall.
    Empty,
    /// Already at the oldest distinct entry.
    AtOldest,
    /// Already at the composing slot.
    AtNewest,
    Index(TrieError),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "history is empty"),
            Self::AtOldest => write!(f, "no older history entry"),
            Self::AtNewest => write!(f, "no newer history entry"),
            Self::Index(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Index(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TrieError> for HistoryError {
    fn from(err: TrieError) -> Self {
        Self::Index(err)
    }
}

/// Recallable, persistable command history.
#[derive(Debug, Clone, Default)]
pub struct History {
    trie: Trie,
    scratch: String,
    index: usize,
    base: usize,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Recall cursor.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of entries that came from the history file.
    #[must_use]
    pub fn base(&self) -> usize {
        self.base
    }

    /// True while the cursor is on the line being composed.
    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.index == self.trie.len()
    }

    /// Point the cursor at an entry chosen elsewhere (suggestion cycling).
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.trie.len());
    }

    /// Return the cursor to the composing slot.
    pub fn reset_cursor(&mut self) {
        self.index = self.trie.len();
    }

    #[must_use]
    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// Record an accepted line and return to the composing slot.
    pub fn append(&mut self, line: &str) {
        self.trie.insert(line);
        self.reset_cursor();
    }

    /// Save the in-progress line before recall replaces it.
    pub fn stash(&mut self, line: &str) {
        self.scratch.clear();
        self.scratch.push_str(line);
    }

    #[must_use]
    pub fn scratch(&self) -> &str {
        &self.scratch
    }

    /// Step to the previous distinct entry.
    pub fn prev_line(&mut self) -> Result<String, HistoryError> {
        if self.trie.is_empty() {
            return Err(HistoryError::Empty);
        }
        let from = self.trie.node_at(self.index)?;
        let mut i = self.index;
        while i > 0 {
            i -= 1;
            if self.trie.node_at(i)? != from {
                self.index = i;
                return Ok(self.trie.line_at(i)?);
            }
        }
        Err(HistoryError::AtOldest)
    }

    /// Step to the next distinct entry, or back to the stashed line.
    pub fn next_line(&mut self) -> Result<String, HistoryError> {
        if self.trie.is_empty() {
            return Err(HistoryError::Empty);
        }
        let len = self.trie.len();
        if self.index >= len {
            return Err(HistoryError::AtNewest);
        }
        let from = self.trie.node_at(self.index)?;
        let mut i = self.index;
        while i < len {
            i += 1;
            if self.trie.node_at(i)? != from {
                break;
            }
        }
        self.index = i;
        if i == len {
            Ok(self.scratch.clone())
        } else {
            Ok(self.trie.line_at(i)?)
        }
    }

    /// Stored lines extending `prefix`, most recent first.
    #[must_use]
    pub fn search(&self, prefix: &str) -> Option<PriorityHeap<NodeId>> {
        self.trie.search(prefix)
    }

    #[must_use]
    pub fn line_of(&self, id: NodeId) -> String {
        self.trie.line_of(id)
    }

    /// Append every non-blank line from `reader` and mark them as persisted.
    pub fn load(&mut self, reader: impl BufRead) -> io::Result<usize> {
        let mut loaded = 0;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.trie.insert(&line);
            loaded += 1;
        }
        self.base = self.trie.len();
        self.reset_cursor();
        Ok(loaded)
    }

    /// Load from `path`, creating an empty file when it does not exist.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(io_err)?;
        let loaded = self.load(BufReader::new(file)).map_err(io_err)?;
        crate::debug!(path = %path.display(), loaded, "history loaded");
        Ok(loaded)
    }

    /// Write the lines added since loading, one per line.
    pub fn dump(&self, writer: impl Write) -> io::Result<usize> {
        let mut writer = BufWriter::new(writer);
        let mut written = 0;
        for line in self.trie.lines().skip(self.base) {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Append this session's lines to `path`.
    pub fn dump_file(&self, path: &Path) -> Result<usize, HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(io_err)?;
        let written = self.dump(file).map_err(io_err)?;
        crate::debug!(path = %path.display(), written, "history flushed");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(lines: &[&str]) -> History {
        let mut hist = History::new();
        for line in lines {
            hist.append(line);
        }
        hist
    }

    #[test]
    fn recall_walks_back_and_forth() {
        let mut hist = history_of(&["foo", "bar"]);
        assert_eq!(hist.prev_line().unwrap(), "bar");
        assert_eq!(hist.prev_line().unwrap(), "foo");
        assert_eq!(hist.next_line().unwrap(), "bar");
        assert_eq!(hist.next_line().unwrap(), "");
        assert!(hist.is_composing());
    }

    #[test]
    fn consecutive_repeats_collapse() {
        let mut hist = history_of(&["a", "b", "b", "b", "c"]);
        assert_eq!(hist.prev_line().unwrap(), "c");
        assert_eq!(hist.prev_line().unwrap(), "b");
        assert_eq!(hist.prev_line().unwrap(), "a");
        assert_eq!(hist.next_line().unwrap(), "b");
        assert_eq!(hist.next_line().unwrap(), "c");
    }

    #[test]
    fn boundaries_are_errors() {
        let mut empty = History::new();
        assert!(matches!(empty.prev_line(), Err(HistoryError::Empty)));
        assert!(matches!(empty.next_line(), Err(HistoryError::Empty)));

        let mut hist = history_of(&["only"]);
        assert!(matches!(hist.next_line(), Err(HistoryError::AtNewest)));
        assert_eq!(hist.prev_line().unwrap(), "only");
        assert!(matches!(hist.prev_line(), Err(HistoryError::AtOldest)));
        assert_eq!(hist.index(), 0);
    }

    #[test]
    fn repeated_oldest_is_a_boundary() {
        let mut hist = history_of(&["ls", "ls"]);
        assert_eq!(hist.prev_line().unwrap(), "ls");
        assert!(matches!(hist.prev_line(), Err(HistoryError::AtOldest)));
    }

    #[test]
    fn scratch_returns_on_forward_walk() {
        let mut hist = history_of(&["one"]);
        hist.stash("draft");
        assert_eq!(hist.prev_line().unwrap(), "one");
        assert_eq!(hist.next_line().unwrap(), "draft");
    }

    #[test]
    fn load_sets_base_and_dump_writes_new_lines() {
        let mut hist = History::new();
        let loaded = hist.load("old one\n\nold two\n".as_bytes()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(hist.base(), 2);
        hist.append("new");

        let mut out = Vec::new();
        assert_eq!(hist.dump(&mut out).unwrap(), 1);
        assert_eq!(out, b"new\n");
    }

    #[test]
    fn file_round_trip_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE_NAME);

        let mut first = History::new();
        assert_eq!(first.load_file(&path).unwrap(), 0);
        assert!(path.exists());
        first.append("echo 1");
        first.dump_file(&path).unwrap();

        let mut second = History::new();
        assert_eq!(second.load_file(&path).unwrap(), 1);
        second.append("echo 2");
        second.dump_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "echo 1\necho 2\n");
    }

    #[test]
    fn unreadable_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut hist = History::new();
        let err = hist.load_file(dir.path()).unwrap_err();
        assert!(matches!(err, HistoryError::Io { .. }));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }
}
