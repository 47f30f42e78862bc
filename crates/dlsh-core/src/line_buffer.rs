#![forbid(unsafe_code)]

//! Edit buffer for the line being composed.
//!
//! The cursor is a byte index that always sits on a `char` boundary, between
//! `0` and `len` inclusive.

use unicode_width::UnicodeWidthChar;

/// Text being edited plus a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    index: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cursor byte index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.index == self.text.len()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.index = 0;
    }

    /// Replace the contents and put the cursor at the end.
    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.index = self.text.len();
    }

    pub fn insert(&mut self, ch: char) {
        self.text.insert(self.index, ch);
        self.index += ch.len_utf8();
    }

    /// Move the cursor to `index`, clamped and snapped back to a boundary.
    pub fn set_index(&mut self, index: usize) {
        let mut index = index.min(self.text.len());
        while !self.text.is_char_boundary(index) {
            index -= 1;
        }
        self.index = index;
    }

    /// Move by a signed byte offset as produced by [`crate::pattern::Pattern`].
    pub fn move_by(&mut self, offset: isize) {
        self.set_index(self.index.saturating_add_signed(offset));
    }

    pub fn move_left(&mut self) -> bool {
        match self.text[..self.index].chars().next_back() {
            Some(ch) => {
                self.index -= ch.len_utf8();
                true
            }
            None => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        match self.text[self.index..].chars().next() {
            Some(ch) => {
                self.index += ch.len_utf8();
                true
            }
            None => false,
        }
    }

    pub fn move_home(&mut self) {
        self.index = 0;
    }

    pub fn move_end(&mut self) {
        self.index = self.text.len();
    }

    /// Delete the codepoint before the cursor.
    pub fn backspace(&mut self) -> bool {
        if self.move_left() {
            self.text.remove(self.index);
            true
        } else {
            false
        }
    }

    /// Delete the codepoint under the cursor.
    pub fn delete(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.text.remove(self.index);
        true
    }

    /// Delete from `start` up to the cursor and leave the cursor at `start`.
    pub fn delete_back_to(&mut self, start: usize) {
        let mut start = start.min(self.index);
        while !self.text.is_char_boundary(start) {
            start -= 1;
        }
        self.text.replace_range(start..self.index, "");
        self.index = start;
    }

    /// Terminal columns occupied by the text before byte `index`.
    #[must_use]
    pub fn columns_to(&self, index: usize) -> usize {
        self.text[..index.min(self.text.len())]
            .chars()
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }
}
