#![forbid(unsafe_code)]

//! Keystroke decoder.
//!
//! Turns raw terminal bytes into [`KeyEvent`]s with an explicit state machine.
//! State survives between calls to [`InputParser::parse`], so an escape
//! sequence split across two reads decodes the same as one delivered whole.
//!
//! # Recognized input
//!
//! - printable ASCII and UTF-8 characters
//! - control bytes: Enter (`CR`/`LF`), Tab, Backspace (`DEL`), Ctrl+Backspace
//!   (`BS`), Ctrl+letter
//! - `ESC [ A..D`, `ESC [ H`, `ESC [ F` with an optional `1;<mod>` parameter
//! - `ESC [ <n> ~` where 1/7 is Home, 3 is Delete and 4/8 is End
//! - `ESC O A..D/H/F` (application cursor mode)
//! - `ESC DEL` as Alt+Backspace and `ESC <char>` as Alt+char
//!
//! Anything else is dropped without disturbing the bytes that follow it.

use crate::key::{KeyCode, KeyEvent, Modifiers};

/// Parameter bytes after which a CSI sequence is abandoned.
const MAX_CSI_LEN: usize = 32;

/// Decoder states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecoderState {
    /// Between keystrokes.
    #[default]
    Idle,
    /// After `ESC`.
    SawEscape,
    /// After `ESC [`, accumulating the keycode.
    InCsi,
    /// After the `;` of a CSI sequence, accumulating the modifier code.
    AwaitingModifier,
    /// After `ESC O`.
    Ss3,
    /// Inside a multi-byte UTF-8 character.
    Utf8 { collected: u8, expected: u8 },
}

/// Incremental keystroke decoder.
#[derive(Debug, Default)]
pub struct InputParser {
    state: DecoderState,
    keycode: u32,
    modifier: u32,
    csi_len: usize,
    utf8: [u8; 4],
}

impl InputParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no sequence is partially decoded.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == DecoderState::Idle
    }

    /// Decode a chunk of input.
    pub fn parse(&mut self, input: &[u8]) -> Vec<KeyEvent> {
        let mut keys = Vec::new();
        for &byte in input {
            if let Some(key) = self.process_byte(byte) {
                keys.push(key);
            }
        }
        keys
    }

    /// Emit whatever a lone `ESC` stands for once no more input arrived.
    ///
    /// Called by the reader when a poll interval passes with the decoder
    /// still waiting after a bare escape byte.
    pub fn flush_escape(&mut self) -> Option<KeyEvent> {
        if self.state == DecoderState::SawEscape {
            self.state = DecoderState::Idle;
            return Some(KeyEvent::new(KeyCode::Escape));
        }
        None
    }

    fn process_byte(&mut self, byte: u8) -> Option<KeyEvent> {
        match self.state {
            DecoderState::Idle => self.process_idle(byte),
            DecoderState::SawEscape => self.process_escape(byte),
            DecoderState::InCsi => self.process_csi(byte, false),
            DecoderState::AwaitingModifier => self.process_csi(byte, true),
            DecoderState::Ss3 => self.process_ss3(byte),
            DecoderState::Utf8 {
                collected,
                expected,
            } => self.process_utf8(byte, collected, expected),
        }
    }

    fn process_idle(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            0x1B => {
                self.state = DecoderState::SawEscape;
                None
            }
            0x0D | 0x0A => Some(KeyEvent::new(KeyCode::Enter)),
            0x09 => Some(KeyEvent::new(KeyCode::Tab)),
            0x7F => Some(KeyEvent::new(KeyCode::Backspace)),
            // Most terminals send BS for Ctrl+Backspace.
            0x08 => Some(KeyEvent::new(KeyCode::Backspace).with_modifiers(Modifiers::CTRL)),
            0x01..=0x1A => {
                let c = char::from(byte + b'a' - 1);
                Some(KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL))
            }
            0x20..=0x7E => Some(KeyEvent::new(KeyCode::Char(char::from(byte)))),
            0xC0..=0xDF => self.begin_utf8(byte, 2),
            0xE0..=0xEF => self.begin_utf8(byte, 3),
            0xF0..=0xF7 => self.begin_utf8(byte, 4),
            _ => None,
        }
    }

    fn begin_utf8(&mut self, byte: u8, expected: u8) -> Option<KeyEvent> {
        self.utf8[0] = byte;
        self.state = DecoderState::Utf8 {
            collected: 1,
            expected,
        };
        None
    }

    fn process_escape(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            b'[' => {
                self.state = DecoderState::InCsi;
                self.keycode = 0;
                self.modifier = 0;
                self.csi_len = 0;
                None
            }
            b'O' => {
                self.state = DecoderState::Ss3;
                None
            }
            // A second ESC: the first one was a bare Escape press.
            0x1B => Some(KeyEvent::new(KeyCode::Escape)),
            0x7F | 0x08 => {
                self.state = DecoderState::Idle;
                Some(KeyEvent::new(KeyCode::Backspace).with_modifiers(Modifiers::ALT))
            }
            0x20..=0x7E => {
                self.state = DecoderState::Idle;
                Some(KeyEvent::new(KeyCode::Char(char::from(byte))).with_modifiers(Modifiers::ALT))
            }
            _ => {
                self.state = DecoderState::Idle;
                None
            }
        }
    }

    fn process_csi(&mut self, byte: u8, in_modifier: bool) -> Option<KeyEvent> {
        self.csi_len += 1;
        if self.csi_len > MAX_CSI_LEN {
            self.state = DecoderState::Idle;
            return None;
        }

        match byte {
            b'0'..=b'9' => {
                let digit = u32::from(byte - b'0');
                let slot = if in_modifier {
                    &mut self.modifier
                } else {
                    &mut self.keycode
                };
                *slot = slot.saturating_mul(10).saturating_add(digit);
                None
            }
            b';' => {
                if !in_modifier {
                    self.state = DecoderState::AwaitingModifier;
                }
                None
            }
            b'A' | b'B' | b'C' | b'D' | b'H' | b'F' => {
                self.state = DecoderState::Idle;
                let code = final_byte_key(byte)?;
                Some(KeyEvent::new(code).with_modifiers(Modifiers::from_xterm(self.modifier)))
            }
            b'~' => {
                self.state = DecoderState::Idle;
                let code = match self.keycode {
                    1 | 7 => KeyCode::Home,
                    3 => KeyCode::Delete,
                    4 | 8 => KeyCode::End,
                    _ => return None,
                };
                Some(KeyEvent::new(code).with_modifiers(Modifiers::from_xterm(self.modifier)))
            }
            // Remaining final bytes end sequences this decoder ignores.
            0x40..=0x7E => {
                self.state = DecoderState::Idle;
                None
            }
            // Private/intermediate parameter bytes.
            0x20..=0x3F => None,
            _ => {
                self.state = DecoderState::Idle;
                None
            }
        }
    }

    fn process_ss3(&mut self, byte: u8) -> Option<KeyEvent> {
        self.state = DecoderState::Idle;
        final_byte_key(byte).map(KeyEvent::new)
    }

    fn process_utf8(&mut self, byte: u8, collected: u8, expected: u8) -> Option<KeyEvent> {
        if byte & 0xC0 != 0x80 {
            // Truncated character; decode the interrupting byte on its own.
            self.state = DecoderState::Idle;
            return self.process_idle(byte);
        }

        self.utf8[usize::from(collected)] = byte;
        let collected = collected + 1;
        if collected < expected {
            self.state = DecoderState::Utf8 {
                collected,
                expected,
            };
            return None;
        }

        self.state = DecoderState::Idle;
        std::str::from_utf8(&self.utf8[..usize::from(expected)])
            .ok()
            .and_then(|s| s.chars().next())
            .map(|c| KeyEvent::new(KeyCode::Char(c)))
    }
}

fn final_byte_key(byte: u8) -> Option<KeyCode> {
    match byte {
        b'A' => Some(KeyCode::Up),
        b'B' => Some(KeyCode::Down),
        b'C' => Some(KeyCode::Right),
        b'D' => Some(KeyCode::Left),
        b'H' => Some(KeyCode::Home),
        b'F' => Some(KeyCode::End),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(keys: &[KeyEvent]) -> Vec<KeyCode> {
        keys.iter().map(|k| k.code).collect()
    }

    #[test]
    fn printable_ascii() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"ls -l");
        assert_eq!(
            codes(&keys),
            vec![
                KeyCode::Char('l'),
                KeyCode::Char('s'),
                KeyCode::Char(' '),
                KeyCode::Char('-'),
                KeyCode::Char('l'),
            ]
        );
        assert!(keys.iter().all(|k| k.modifiers == Modifiers::NONE));
    }

    #[test]
    fn control_bytes() {
        let mut parser = InputParser::new();
        let keys = parser.parse(&[0x0D, 0x7F, 0x03, 0x04, 0x08]);
        assert_eq!(keys[0].code, KeyCode::Enter);
        assert_eq!(keys[1], KeyEvent::new(KeyCode::Backspace));
        assert!(keys[2].is_ctrl_char('c'));
        assert!(keys[3].is_ctrl_char('d'));
        assert_eq!(keys[4].code, KeyCode::Backspace);
        assert!(keys[4].ctrl());
    }

    #[test]
    fn arrows_and_word_arrows() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"\x1b[A\x1b[B\x1b[1;5C\x1b[1;5D");
        assert_eq!(
            codes(&keys),
            vec![KeyCode::Up, KeyCode::Down, KeyCode::Right, KeyCode::Left]
        );
        assert!(!keys[0].ctrl());
        assert!(keys[2].ctrl());
        assert!(keys[3].ctrl());
    }

    #[test]
    fn tilde_keycodes() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"\x1b[1~\x1b[7~\x1b[3~\x1b[4~\x1b[8~\x1b[H\x1b[F");
        assert_eq!(
            codes(&keys),
            vec![
                KeyCode::Home,
                KeyCode::Home,
                KeyCode::Delete,
                KeyCode::End,
                KeyCode::End,
                KeyCode::Home,
                KeyCode::End,
            ]
        );
    }

    #[test]
    fn unknown_tilde_keycode_is_dropped() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"\x1b[15~x");
        assert_eq!(codes(&keys), vec![KeyCode::Char('x')]);
    }

    #[test]
    fn ss3_arrows() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"\x1bOA\x1bOH");
        assert_eq!(codes(&keys), vec![KeyCode::Up, KeyCode::Home]);
    }

    #[test]
    fn alt_backspace() {
        let mut parser = InputParser::new();
        let keys = parser.parse(b"\x1b\x7f");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, KeyCode::Backspace);
        assert!(keys[0].alt());
    }

    #[test]
    fn sequence_split_across_reads() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b").is_empty());
        assert!(!parser.is_idle());
        assert!(parser.parse(b"[1;").is_empty());
        let keys = parser.parse(b"5D");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].code, KeyCode::Left);
        assert!(keys[0].ctrl());
        assert!(parser.is_idle());
    }

    #[test]
    fn utf8_characters() {
        let mut parser = InputParser::new();
        let keys = parser.parse("héllo→".as_bytes());
        assert_eq!(keys.len(), 6);
        assert_eq!(keys[1].code, KeyCode::Char('é'));
        assert_eq!(keys[5].code, KeyCode::Char('→'));
    }

    #[test]
    fn truncated_utf8_recovers() {
        let mut parser = InputParser::new();
        let keys = parser.parse(&[0xE2, 0x86, b'a']);
        assert_eq!(codes(&keys), vec![KeyCode::Char('a')]);
    }

    #[test]
    fn bare_escape_flushes() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b").is_empty());
        assert_eq!(parser.flush_escape(), Some(KeyEvent::new(KeyCode::Escape)));
        assert!(parser.is_idle());
        assert_eq!(parser.flush_escape(), None);
    }

    #[test]
    fn overlong_csi_abandoned() {
        let mut parser = InputParser::new();
        let mut input = b"\x1b[".to_vec();
        input.extend(std::iter::repeat_n(b'1', MAX_CSI_LEN + 4));
        input.push(b'z');
        let keys = parser.parse(&input);
        // Bytes after the abandoned prefix decode as plain characters.
        assert!(keys.iter().all(|k| matches!(k.code, KeyCode::Char(_))));
        assert!(parser.is_idle());
    }
}
