#![forbid(unsafe_code)]

//! Keystroke handling for the line being composed.
//!
//! [`LineEditor`] holds no terminal state: it applies one [`KeyEvent`] at a
//! time to the edit buffer, history recall, and suggestion candidates, and
//! reports whether the line is finished. The session in [`crate::tty`] feeds
//! it keys and draws whatever it holds.
//!
//! # Suggestions
//!
//! After each editing key the buffer is looked up as a prefix in the history
//! trie; the most recently used match is shown as a dimmed continuation.
//! Navigation keys leave the candidates alone for that cycle, so Up and Down
//! can cycle through them: Up steps to the next older candidate, Down back
//! towards the newest and finally to what was typed.

use dlsh_core::{History, KeyCode, KeyEvent, LineBuffer, NodeId, Pattern, PriorityHeap};

/// Result of applying one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Keep reading keys.
    Continue,
    /// Enter was pressed; the finished line.
    Accept(String),
    /// Ctrl-C: abandon this line.
    Interrupt,
    /// Ctrl-D: no more input.
    Eof,
}

/// Line editing state for one shell session.
#[derive(Debug)]
pub struct LineEditor {
    buffer: LineBuffer,
    history: History,
    pattern: Pattern,
    suggestions: Option<PriorityHeap<NodeId>>,
}

impl LineEditor {
    #[must_use]
    pub fn new(history: History) -> Self {
        Self {
            buffer: LineBuffer::new(),
            history,
            pattern: Pattern::default(),
            suggestions: None,
        }
    }

    /// Use a different word-boundary matcher.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    #[must_use]
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Start a new line.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.suggestions = None;
        self.history.reset_cursor();
    }

    /// Record a finished line in history unless it is blank.
    pub fn commit(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.history.append(line);
        }
        self.history.reset_cursor();
    }

    /// Best candidate for the current buffer, when one is active.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        let heap = self.suggestions.as_ref()?;
        heap.top().map(|&id| self.history.line_of(id))
    }

    /// The part of the best candidate that extends what is typed.
    #[must_use]
    pub fn suggestion_suffix(&self) -> Option<String> {
        let line = self.suggestion()?;
        line.strip_prefix(self.buffer.as_str())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditOutcome {
        let mut hush = key.is_navigation();

        match key.code {
            KeyCode::Enter => {
                self.suggestions = None;
                return EditOutcome::Accept(self.buffer.as_str().to_string());
            }
            KeyCode::Char(_) if key.is_ctrl_char('c') => {
                self.suggestions = None;
                return EditOutcome::Interrupt;
            }
            KeyCode::Char(_) if key.is_ctrl_char('d') => return EditOutcome::Eof,
            KeyCode::Backspace if key.alt() || key.ctrl() => self.delete_word(),
            KeyCode::Backspace => {
                self.buffer.backspace();
            }
            KeyCode::Delete => {
                self.buffer.delete();
            }
            KeyCode::Home => self.buffer.move_home(),
            KeyCode::End => self.buffer.move_end(),
            KeyCode::Left if key.ctrl() => {
                let off = self.pattern.first_left_of(self.buffer.index(), self.buffer.as_bytes());
                self.buffer.move_by(off);
            }
            KeyCode::Left => {
                self.buffer.move_left();
            }
            KeyCode::Right if key.ctrl() => {
                let off = self.pattern.first_right_of(self.buffer.index(), self.buffer.as_bytes());
                self.buffer.move_by(off);
            }
            KeyCode::Right => {
                if self.buffer.at_end() {
                    if let Some(line) = self.suggestion() {
                        self.buffer.replace(line);
                    }
                } else {
                    self.buffer.move_right();
                }
            }
            KeyCode::Up => self.recall_older(),
            KeyCode::Down => self.recall_newer(),
            KeyCode::Char(c) if !key.ctrl() && !key.alt() => self.buffer.insert(c),
            _ => hush = true,
        }

        if !hush {
            self.suggestions = self.history.search(self.buffer.as_str());
        }
        EditOutcome::Continue
    }

    fn delete_word(&mut self) {
        let idx = self.buffer.index();
        let off = self.pattern.first_left_of(idx, self.buffer.as_bytes());
        self.buffer.delete_back_to(idx.saturating_add_signed(off));
    }

    fn recall_older(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if self.history.is_composing() {
            self.history.stash(self.buffer.as_str());
        }

        let line = if let Some(heap) = self.suggestions.as_mut().filter(|heap| !heap.is_empty()) {
            if !heap.has_next() {
                return;
            }
            heap.next();
            let (Some(&id), Some(index)) = (heap.top(), heap.top_priority()) else {
                return;
            };
            self.history.set_index(index);
            self.history.line_of(id)
        } else {
            // Typed text with nothing matching: Up would only throw it away.
            if self.history.is_composing() && !self.buffer.is_empty() {
                return;
            }
            match self.history.prev_line() {
                Ok(line) => line,
                Err(err) => {
                    tracing::trace!(error = %err, "no older entry");
                    return;
                }
            }
        };
        self.buffer.replace(line);
    }

    fn recall_newer(&mut self) {
        if self.history.is_empty() || self.history.is_composing() {
            return;
        }

        let line = if let Some(heap) = self.suggestions.as_mut().filter(|heap| !heap.is_empty()) {
            if heap.has_prev() {
                heap.prev();
                let (Some(&id), Some(index)) = (heap.top(), heap.top_priority()) else {
                    return;
                };
                self.history.set_index(index);
                self.history.line_of(id)
            } else {
                self.history.reset_cursor();
                self.history.scratch().to_string()
            }
        } else {
            match self.history.next_line() {
                Ok(line) => line,
                Err(err) => {
                    tracing::trace!(error = %err, "no newer entry");
                    return;
                }
            }
        };
        self.buffer.replace(line);
    }
}
