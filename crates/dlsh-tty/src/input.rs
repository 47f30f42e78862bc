#![forbid(unsafe_code)]

//! Terminal input: polling, decoding, and cursor position reports.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};

use dlsh_core::{InputParser, KeyEvent};

/// What a poll observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Decoded keys are queued.
    Keys,
    /// Nothing arrived before the timeout.
    Idle,
    /// The input side was closed.
    Closed,
}

/// Decoded key stream over a terminal (or any pollable) file.
pub struct InputReader {
    tty: File,
    parser: InputParser,
    queue: VecDeque<KeyEvent>,
}

impl InputReader {
    #[must_use]
    pub fn new(tty: File) -> Self {
        Self {
            tty,
            parser: InputParser::new(),
            queue: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn file(&self) -> &File {
        &self.tty
    }

    pub fn next_key(&mut self) -> Option<KeyEvent> {
        self.queue.pop_front()
    }

    /// Wait up to `timeout` for input and decode whatever is available.
    pub fn poll(&mut self, timeout: Duration) -> io::Result<Readiness> {
        if !self.queue.is_empty() {
            return Ok(Readiness::Keys);
        }
        if !self.wait_readable(timeout)? {
            if let Some(key) = self.parser.flush_escape() {
                self.queue.push_back(key);
                return Ok(Readiness::Keys);
            }
            return Ok(Readiness::Idle);
        }

        let mut buf = [0u8; 1024];
        let n = match self.tty.read(&mut buf) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                return Ok(Readiness::Idle);
            }
            Err(e) => return Err(e),
        };
        if n == 0 {
            return Ok(Readiness::Closed);
        }
        self.queue.extend(self.parser.parse(&buf[..n]));
        Ok(if self.queue.is_empty() {
            Readiness::Idle
        } else {
            Readiness::Keys
        })
    }

    /// Read until a `CSI row ; col R` report arrives or `timeout` passes.
    ///
    /// Keystrokes that arrive around the report are decoded and queued.
    pub fn read_cursor_report(&mut self, timeout: Duration) -> io::Result<Option<(u16, u16)>> {
        let deadline = Instant::now() + timeout;
        let mut pending: Vec<u8> = Vec::new();
        let mut buf = [0u8; 64];

        loop {
            if let Some(report) = find_cursor_report(&pending) {
                let before = self.parser.parse(&pending[..report.start]);
                let after = self.parser.parse(&pending[report.end..]);
                self.queue.extend(before);
                self.queue.extend(after);
                return Ok(Some((report.row, report.col)));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_readable(remaining)? {
                tracing::debug!(bytes = pending.len(), "cursor report timed out");
                let keys = self.parser.parse(&pending);
                self.queue.extend(keys);
                return Ok(None);
            }
            match self.tty.read(&mut buf) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut poll_fds = [nix::poll::PollFd::new(
            self.tty.as_fd(),
            nix::poll::PollFlags::POLLIN,
        )];
        let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
        match nix::poll::poll(&mut poll_fds, nix::poll::PollTimeout::from(timeout_ms)) {
            Ok(n) => Ok(n > 0),
            Err(nix::errno::Errno::EINTR) => Ok(false),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// A cursor position report located in a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorReport {
    /// Offset of the introducing `ESC`.
    pub start: usize,
    /// Offset just past the final `R`.
    pub end: usize,
    pub row: u16,
    pub col: u16,
}

/// Find the first well-formed `ESC [ row ; col R` in `bytes`.
#[must_use]
pub fn find_cursor_report(bytes: &[u8]) -> Option<CursorReport> {
    let mut from = 0;
    while let Some(pos) = bytes[from..].windows(2).position(|w| w == b"\x1b[") {
        let start = from + pos;
        if let Some((row, col, len)) = parse_report_body(&bytes[start + 2..]) {
            return Some(CursorReport {
                start,
                end: start + 2 + len,
                row,
                col,
            });
        }
        from = start + 1;
    }
    None
}

fn parse_report_body(body: &[u8]) -> Option<(u16, u16, usize)> {
    let semi = body.iter().position(|&b| b == b';')?;
    let end = semi + 1 + body[semi + 1..].iter().position(|&b| b == b'R')?;
    let row = std::str::from_utf8(&body[..semi]).ok()?.parse().ok()?;
    let col = std::str::from_utf8(&body[semi + 1..end]).ok()?.parse().ok()?;
    Some((row, col, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    use dlsh_core::KeyCode;

    /// Create a (reader_file, writer_stream) pair using Unix sockets.
    fn pipe_pair() -> (File, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        let reader: File = std::os::fd::OwnedFd::from(a).into();
        (reader, b)
    }

    #[test]
    fn report_parsing() {
        assert_eq!(
            find_cursor_report(b"\x1b[12;40R"),
            Some(CursorReport {
                start: 0,
                end: 8,
                row: 12,
                col: 40
            })
        );
        assert_eq!(find_cursor_report(b"\x1b[A\x1b[3;1R").map(|r| r.start), Some(3));
        assert_eq!(find_cursor_report(b"\x1b[12;"), None);
        assert_eq!(find_cursor_report(b"\x1b[x;4R"), None);
    }

    #[test]
    fn poll_decodes_keys() {
        let (reader, mut writer) = pipe_pair();
        let mut input = InputReader::new(reader);
        writer.write_all(b"ab\x1b[D").unwrap();
        assert_eq!(input.poll(Duration::from_millis(500)).unwrap(), Readiness::Keys);
        let codes: Vec<KeyCode> = std::iter::from_fn(|| input.next_key()).map(|k| k.code).collect();
        assert_eq!(codes, vec![KeyCode::Char('a'), KeyCode::Char('b'), KeyCode::Left]);
    }

    #[test]
    fn poll_times_out_idle() {
        let (reader, _writer) = pipe_pair();
        let mut input = InputReader::new(reader);
        assert_eq!(input.poll(Duration::from_millis(10)).unwrap(), Readiness::Idle);
    }

    #[test]
    fn poll_reports_closed() {
        let (reader, writer) = pipe_pair();
        drop(writer);
        let mut input = InputReader::new(reader);
        assert_eq!(input.poll(Duration::from_millis(100)).unwrap(), Readiness::Closed);
    }

    #[test]
    fn cursor_report_keeps_surrounding_keys() {
        let (reader, mut writer) = pipe_pair();
        let mut input = InputReader::new(reader);
        writer.write_all(b"x\x1b[7;15Ry").unwrap();
        let pos = input.read_cursor_report(Duration::from_millis(500)).unwrap();
        assert_eq!(pos, Some((7, 15)));
        assert_eq!(input.next_key().map(|k| k.code), Some(KeyCode::Char('x')));
        assert_eq!(input.next_key().map(|k| k.code), Some(KeyCode::Char('y')));
    }

    #[test]
    fn cursor_report_times_out() {
        let (reader, mut writer) = pipe_pair();
        let mut input = InputReader::new(reader);
        writer.write_all(b"z").unwrap();
        let pos = input.read_cursor_report(Duration::from_millis(30)).unwrap();
        assert_eq!(pos, None);
        assert_eq!(input.next_key().map(|k| k.code), Some(KeyCode::Char('z')));
    }
}
