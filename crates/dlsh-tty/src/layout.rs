#![forbid(unsafe_code)]

//! Row wrapping for the input area.
//!
//! Text is laid out in rows of a fixed number of columns that all begin at
//! the anchor column. A character that does not fit in what is left of a row
//! starts the next one, and a row that fills exactly moves the position to
//! the start of the next row. For single-width text this makes the position of
//! byte `i` equal to `(i / width, i % width)`.

use unicode_width::UnicodeWidthChar;

/// Row/column offset from the anchor, both zero-based.
pub type Offset = (usize, usize);

/// A run of text drawn on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub row: usize,
    pub col: usize,
    pub text: &'a str,
}

/// Wrapping geometry for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    width: usize,
}

impl Layout {
    /// Rows span from the 1-based `anchor_col` to one short of the last
    /// terminal column; at least one column is always available.
    #[must_use]
    pub fn new(term_cols: u16, anchor_col: u16) -> Self {
        let width = usize::from(term_cols.saturating_sub(anchor_col)).max(1);
        Self { width }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Position reached after laying out `text` from `start`.
    #[must_use]
    pub fn advance(&self, start: Offset, text: &str) -> Offset {
        let (mut row, mut col) = start;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if col > 0 && col + w > self.width {
                row += 1;
                col = 0;
            }
            col += w;
            if col >= self.width {
                row += 1;
                col = 0;
            }
        }
        (row, col)
    }

    /// Position of the end of `text` laid out from the anchor.
    #[must_use]
    pub fn position_of(&self, text: &str) -> Offset {
        self.advance((0, 0), text)
    }

    /// Rows touched when `text` is laid out from the anchor, counting the row
    /// the cursor lands on after it.
    #[must_use]
    pub fn rows(&self, text: &str) -> usize {
        self.position_of(text).0 + 1
    }

    /// Split `text`, laid out from `start`, into per-row segments.
    #[must_use]
    pub fn segments<'a>(&self, start: Offset, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let (mut row, mut col) = start;
        let mut seg_start = 0;
        let mut seg_origin = start;

        for (i, ch) in text.char_indices() {
            let w = ch.width().unwrap_or(0);
            if col > 0 && col + w > self.width {
                push_segment(&mut segments, seg_origin, &text[seg_start..i]);
                row += 1;
                col = 0;
                seg_start = i;
                seg_origin = (row, col);
            }
            col += w;
            if col >= self.width {
                let end = i + ch.len_utf8();
                push_segment(&mut segments, seg_origin, &text[seg_start..end]);
                row += 1;
                col = 0;
                seg_start = end;
                seg_origin = (row, col);
            }
        }
        push_segment(&mut segments, seg_origin, &text[seg_start..]);
        segments
    }
}

fn push_segment<'a>(segments: &mut Vec<Segment<'a>>, (row, col): Offset, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment { row, col, text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_from_anchor() {
        assert_eq!(Layout::new(80, 10).width(), 70);
        assert_eq!(Layout::new(10, 10).width(), 1);
        assert_eq!(Layout::new(5, 10).width(), 1);
    }

    #[test]
    fn ascii_positions_match_division() {
        let layout = Layout::new(14, 4);
        let text = "abcdefghijklmnopqrstuvwxy";
        for i in 0..=text.len() {
            assert_eq!(layout.position_of(&text[..i]), (i / 10, i % 10), "at {i}");
        }
        assert_eq!(layout.rows(""), 1);
        assert_eq!(layout.rows("abcdefghij"), 2);
    }

    #[test]
    fn segments_cover_text_in_order() {
        let layout = Layout::new(5, 1);
        let segs = layout.segments((0, 0), "abcdefghij");
        assert_eq!(
            segs,
            vec![
                Segment { row: 0, col: 0, text: "abcd" },
                Segment { row: 1, col: 0, text: "efgh" },
                Segment { row: 2, col: 0, text: "ij" },
            ]
        );
    }

    #[test]
    fn continuation_starts_mid_row() {
        let layout = Layout::new(5, 1);
        let end = layout.position_of("ab");
        let segs = layout.segments(end, "cdef");
        assert_eq!(
            segs,
            vec![
                Segment { row: 0, col: 2, text: "cd" },
                Segment { row: 1, col: 0, text: "ef" },
            ]
        );
    }

    #[test]
    fn wide_char_moves_to_next_row() {
        let layout = Layout::new(4, 1);
        let segs = layout.segments((0, 0), "ab日");
        assert_eq!(
            segs,
            vec![
                Segment { row: 0, col: 0, text: "ab" },
                Segment { row: 1, col: 0, text: "日" },
            ]
        );
        assert_eq!(layout.position_of("ab日"), (1, 2));
    }
}
