#![forbid(unsafe_code)]

//! Drawing the input area.
//!
//! Every draw is assembled into one byte buffer and written at once:
//!
//! 1. hide the cursor and clear the rows the previous draw used
//! 2. scroll the screen if the new content would run past the bottom row
//! 3. print the buffer row by row from the anchor, then the dimmed
//!    suggestion continuation
//! 4. show the cursor at the edit position and paint it as an inverted cell

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{Clear, ClearType};

use crate::cursor::Cursor;
use crate::layout::{Layout, Offset};

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// What one draw shows.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub text: &'a str,
    /// Cursor byte index into `text`.
    pub index: usize,
    /// Continuation shown after `text`, if any.
    pub suggestion: Option<&'a str>,
}

/// Remembers how much screen the last draw used.
#[derive(Debug, Default)]
pub struct Renderer {
    rows_drawn: usize,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous draw (a fresh prompt was just printed).
    pub fn reset(&mut self) {
        self.rows_drawn = 0;
    }

    #[must_use]
    pub fn rows_drawn(&self) -> usize {
        self.rows_drawn
    }

    /// Render `frame` into `out`, updating `cursor` to the edit position.
    pub fn draw(
        &mut self,
        out: &mut impl Write,
        frame: Frame<'_>,
        cursor: &mut Cursor,
        size: TermSize,
    ) -> io::Result<()> {
        queue!(out, Hide)?;
        self.clear_previous(out, cursor)?;

        let layout = Layout::new(size.cols, cursor.anchor_col);
        let text_end = layout.position_of(frame.text);
        let content_end = match frame.suggestion {
            Some(suggestion) => layout.advance(text_end, suggestion),
            None => text_end,
        };
        let rows = content_end.0 + 1;
        scroll_into_view(out, cursor, rows, size)?;

        for seg in layout.segments((0, 0), frame.text) {
            move_to(out, cursor, (seg.row, seg.col))?;
            queue!(out, Print(seg.text))?;
        }
        if let Some(suggestion) = frame.suggestion {
            queue!(out, SetAttribute(Attribute::Dim))?;
            for seg in layout.segments(text_end, suggestion) {
                move_to(out, cursor, (seg.row, seg.col))?;
                queue!(out, Print(seg.text))?;
            }
            queue!(out, SetAttribute(Attribute::Reset))?;
        }

        let index = frame.index.min(frame.text.len());
        let at = layout.position_of(&frame.text[..index]);
        cursor.row = offset_coord(cursor.anchor_row, at.0);
        cursor.col = offset_coord(cursor.anchor_col, at.1);

        let under = frame.text[index..]
            .chars()
            .next()
            .or_else(|| frame.suggestion.and_then(|s| s.chars().next()))
            .unwrap_or(' ');
        queue!(out, Show)?;
        move_to(out, cursor, at)?;
        queue!(
            out,
            SetAttribute(Attribute::Reverse),
            Print(under),
            SetAttribute(Attribute::Reset),
        )?;
        move_to(out, cursor, at)?;

        self.rows_drawn = rows;
        Ok(())
    }

    fn clear_previous(&self, out: &mut impl Write, cursor: &Cursor) -> io::Result<()> {
        for row in 0..self.rows_drawn {
            move_to(out, cursor, (row, 0))?;
            queue!(out, Clear(ClearType::UntilNewLine))?;
        }
        Ok(())
    }
}

/// Scroll so `rows` rows fit below the anchor, moving the anchor up with the
/// screen content.
fn scroll_into_view(
    out: &mut impl Write,
    cursor: &mut Cursor,
    rows: usize,
    size: TermSize,
) -> io::Result<()> {
    let bottom = usize::from(cursor.anchor_row) + rows - 1;
    let screen = usize::from(size.rows.max(1));
    if bottom <= screen {
        return Ok(());
    }
    let overflow = (bottom - screen).min(usize::from(cursor.anchor_row) - 1);
    if overflow == 0 {
        return Ok(());
    }
    queue!(out, MoveTo(0, size.rows.saturating_sub(1)))?;
    for _ in 0..overflow {
        queue!(out, Print('\n'))?;
    }
    cursor.anchor_row = cursor
        .anchor_row
        .saturating_sub(u16::try_from(overflow).unwrap_or(u16::MAX))
        .max(1);
    Ok(())
}

fn offset_coord(anchor: u16, offset: usize) -> u16 {
    anchor.saturating_add(u16::try_from(offset).unwrap_or(u16::MAX))
}

fn move_to(out: &mut impl Write, cursor: &Cursor, (row, col): Offset) -> io::Result<()> {
    let row = offset_coord(cursor.anchor_row, row);
    let col = offset_coord(cursor.anchor_col, col);
    queue!(out, MoveTo(col.saturating_sub(1), row.saturating_sub(1)))
}
