#![forbid(unsafe_code)]

//! Cursor bookkeeping relative to the input anchor.
//!
//! Coordinates are 1-based, as the terminal reports them.

use std::io::{self, Write};
use std::time::Duration;

use crate::input::InputReader;

/// Device status report request for the cursor position.
const CURSOR_POSITION_QUERY: &[u8] = b"\x1b[6n";

/// How long to wait for the terminal to answer a position query.
pub const REPORT_TIMEOUT: Duration = Duration::from_millis(500);

/// Where the input area starts and where the cursor was last put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    pub anchor_row: u16,
    pub anchor_col: u16,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            row: 1,
            col: 1,
            anchor_row: 1,
            anchor_col: 1,
        }
    }
}

impl Cursor {
    /// Anchor the input area at `(row, col)` with the cursor on it.
    pub fn anchor_at(&mut self, row: u16, col: u16) {
        let (row, col) = (row.max(1), col.max(1));
        *self = Self {
            row,
            col,
            anchor_row: row,
            anchor_col: col,
        };
    }

    /// Shift the anchor by the difference between where the cursor was left
    /// and where the terminal now reports it.
    pub fn follow_drift(&mut self, actual_row: u16, actual_col: u16) {
        let drift_row = i32::from(self.row) - i32::from(actual_row);
        let drift_col = i32::from(self.col) - i32::from(actual_col);
        self.anchor_row = shift(self.anchor_row, drift_row);
        self.anchor_col = shift(self.anchor_col, drift_col);
        self.row = actual_row.max(1);
        self.col = actual_col.max(1);
    }
}

fn shift(value: u16, by: i32) -> u16 {
    let shifted = (i32::from(value) - by).clamp(1, i32::from(u16::MAX));
    u16::try_from(shifted).unwrap_or(1)
}

/// Ask the terminal where the cursor is.
///
/// `Ok(None)` means the terminal did not answer in time.
pub fn query_position(
    input: &mut InputReader,
    out: &mut impl Write,
) -> io::Result<Option<(u16, u16)>> {
    out.write_all(CURSOR_POSITION_QUERY)?;
    out.flush()?;
    input.read_cursor_report(REPORT_TIMEOUT)
}
