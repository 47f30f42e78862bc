#![forbid(unsafe_code)]

//! Interactive line reading.
//!
//! [`Tty`] is the one place that owns the terminal while a line is being
//! composed. A read goes:
//!
//! 1. enter raw mode and start the resize watcher
//! 2. print the prompt and ask the terminal where the input area begins
//! 3. poll for keys, apply them to the [`LineEditor`], redraw
//! 4. on Enter, Ctrl-C or Ctrl-D: final draw, newline, restore the terminal
//!
//! Terminal faults during a read (size or position queries failing) are
//! logged and the previous geometry is kept.

use std::fs::File;
use std::io::{self, Stdout, Write};
use std::os::fd::AsFd;
use std::time::Duration;

use dlsh_core::{History, Pattern};

use crate::cursor::{Cursor, query_position};
use crate::editor::{EditOutcome, LineEditor};
use crate::input::{InputReader, Readiness};
use crate::prompt::Prompt;
use crate::raw_mode::{CookedMode, RawModeGuard};
use crate::render::{Frame, Renderer, TermSize};
use crate::resize::ResizeWatcher;

/// Input poll interval; bounds how long a resize waits to be redrawn.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a line read ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// An accepted line (possibly blank).
    Line(String),
    /// Ctrl-C; nothing to run.
    Interrupted,
    /// Ctrl-D or the terminal went away.
    Eof,
}

/// Terminal session for the interactive shell.
pub struct Tty {
    input: InputReader,
    output: Stdout,
    cooked: CookedMode,
    editor: LineEditor,
    renderer: Renderer,
    cursor: Cursor,
    size: TermSize,
}

impl Tty {
    /// Open a session on the process's stdin/stdout.
    ///
    /// Fails when stdin is not a terminal whose attributes can be read.
    pub fn open(history: History) -> io::Result<Self> {
        let tty = File::from(io::stdin().as_fd().try_clone_to_owned()?);
        let cooked = CookedMode::capture(&tty)?;
        let mut session = Self {
            input: InputReader::new(tty),
            output: io::stdout(),
            cooked,
            editor: LineEditor::new(history),
            renderer: Renderer::new(),
            cursor: Cursor::default(),
            size: TermSize::default(),
        };
        session.refresh_size();
        Ok(session)
    }

    /// Replace the word-boundary matcher used for word motion.
    pub fn set_word_pattern(&mut self, pattern: Pattern) {
        self.editor.set_pattern(pattern);
    }

    #[must_use]
    pub fn history(&self) -> &History {
        self.editor.history()
    }

    /// Read one line from the user.
    pub fn read_line(&mut self) -> io::Result<ReadOutcome> {
        let guard = RawModeGuard::enter(self.input.file(), &self.cooked)?;
        let watcher = match ResizeWatcher::start() {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                tracing::warn!(error = %err, "resize notifications unavailable");
                None
            }
        };

        let result = self.edit_loop(watcher.as_ref());

        drop(watcher);
        drop(guard);

        let outcome = result?;
        if let EditOutcome::Accept(line) = &outcome {
            self.editor.commit(line);
        }
        Ok(match outcome {
            EditOutcome::Accept(line) => ReadOutcome::Line(line),
            EditOutcome::Interrupt => ReadOutcome::Interrupted,
            EditOutcome::Eof | EditOutcome::Continue => ReadOutcome::Eof,
        })
    }

    fn edit_loop(&mut self, watcher: Option<&ResizeWatcher>) -> io::Result<EditOutcome> {
        self.editor.reset();
        self.renderer.reset();

        let prompt = Prompt::current();
        let mut frame = Vec::new();
        prompt.write_to(&mut frame)?;
        self.flush_frame(&frame)?;
        self.refresh_size();
        self.anchor_after_prompt(&prompt);
        self.draw()?;

        let outcome = loop {
            if watcher.is_some_and(ResizeWatcher::take_pending) {
                self.redraw_after_resize(&prompt)?;
            }

            match self.input.poll(POLL_INTERVAL)? {
                Readiness::Idle => continue,
                Readiness::Closed => break EditOutcome::Eof,
                Readiness::Keys => {}
            }

            let mut finished = None;
            while let Some(key) = self.input.next_key() {
                match self.editor.handle_key(key) {
                    EditOutcome::Continue => {}
                    done => {
                        finished = Some(done);
                        break;
                    }
                }
            }
            self.draw()?;
            if let Some(done) = finished {
                break done;
            }
        };

        let tail: &[u8] = match outcome {
            EditOutcome::Interrupt => b"^C\r\n",
            _ => b"\r\n",
        };
        self.flush_frame(tail)?;
        Ok(outcome)
    }

    fn draw(&mut self) -> io::Result<()> {
        let suffix = self.editor.suggestion_suffix();
        let buffer = self.editor.buffer();
        let frame = Frame {
            text: buffer.as_str(),
            index: buffer.index(),
            suggestion: suffix.as_deref(),
        };
        let mut out = Vec::with_capacity(256);
        self.renderer
            .draw(&mut out, frame, &mut self.cursor, self.size)?;
        self.flush_frame(&out)
    }

    /// Re-anchor after the terminal was resized and repaint everything.
    fn redraw_after_resize(&mut self, prompt: &Prompt) -> io::Result<()> {
        self.refresh_size();
        match query_position(&mut self.input, &mut self.output) {
            Ok(Some((row, col))) => self.cursor.follow_drift(row, col),
            Ok(None) => tracing::debug!("no cursor report after resize"),
            Err(err) => tracing::warn!(error = %err, "cursor query failed after resize"),
        }
        tracing::debug!(
            cols = self.size.cols,
            rows = self.size.rows,
            anchor_row = self.cursor.anchor_row,
            "terminal resized"
        );

        let mut out = Vec::new();
        crossterm::queue!(
            out,
            crossterm::cursor::MoveTo(0, self.cursor.anchor_row.saturating_sub(1)),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::FromCursorDown),
        )?;
        prompt.write_to(&mut out)?;
        self.flush_frame(&out)?;

        self.renderer.reset();
        self.anchor_after_prompt(prompt);
        self.draw()
    }

    /// Record where input starts, right after the prompt just printed.
    fn anchor_after_prompt(&mut self, prompt: &Prompt) {
        match query_position(&mut self.input, &mut self.output) {
            Ok(Some((row, col))) => self.cursor.anchor_at(row, col),
            other => {
                if let Err(err) = other {
                    tracing::warn!(error = %err, "cursor position query failed");
                }
                let col = u16::try_from(prompt.width() + 1).unwrap_or(1);
                self.cursor.anchor_at(self.size.rows, col);
            }
        }
    }

    fn refresh_size(&mut self) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => self.size = TermSize { cols, rows },
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "terminal size unavailable"),
        }
    }

    fn flush_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.output.lock();
        out.write_all(bytes)?;
        out.flush()
    }
}
