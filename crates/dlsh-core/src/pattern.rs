#![forbid(unsafe_code)]

//! Word-boundary search for cursor movement and word deletion.
//!
//! Both searches return an offset relative to the cursor rather than an
//! absolute index, so a caller moves with `index + offset` whichever way it
//! is going.

use regex::bytes::Regex;

/// Characters that separate words by default: space, double quote,
/// apostrophe and hyphen.
pub const DEFAULT_WORD_BOUNDARY: &str = r#"[ "'\-]"#;

/// The default boundary class as a byte set.
const DEFAULT_BOUNDARY_BYTES: &[u8] = b" \"'-";

#[derive(Debug, Clone)]
enum Matcher {
    /// Single-byte boundaries; each match is one byte long.
    Bytes(&'static [u8]),
    Regex(Regex),
}

/// Compiled word-boundary matcher.
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: Matcher,
}

impl Default for Pattern {
    /// Equivalent to `Pattern::new(DEFAULT_WORD_BOUNDARY)`.
    fn default() -> Self {
        Self {
            matcher: Matcher::Bytes(DEFAULT_BOUNDARY_BYTES),
        }
    }
}

impl Pattern {
    /// Compile a custom boundary expression.
    pub fn new(expr: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: Matcher::Regex(Regex::new(expr)?),
        })
    }

    /// Offset (`<= 0`) from `idx` to the start of the nearest boundary match
    /// that begins left of `idx`, or to the buffer start when there is none.
    #[must_use]
    pub fn first_left_of(&self, idx: usize, buf: &[u8]) -> isize {
        let idx = idx.min(buf.len());
        let head = &buf[..idx];
        let target = match &self.matcher {
            Matcher::Bytes(set) => head.iter().rposition(|b| set.contains(b)),
            Matcher::Regex(regex) => regex.find_iter(head).last().map(|m| m.start()),
        };
        -offset(idx - target.unwrap_or(0))
    }

    /// Offset (`>= 0`) from `idx` to just past the next boundary match at or
    /// right of `idx`, or to the buffer end when there is none.
    #[must_use]
    pub fn first_right_of(&self, idx: usize, buf: &[u8]) -> isize {
        let idx = idx.min(buf.len());
        let tail = &buf[idx..];
        let target = match &self.matcher {
            Matcher::Bytes(set) => tail.iter().position(|b| set.contains(b)).map(|at| at + 1),
            Matcher::Regex(regex) => regex.find(tail).map(|m| m.end()),
        };
        offset(target.unwrap_or(tail.len()))
    }
}

fn offset(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}
