#![forbid(unsafe_code)]

//! Terminal-independent building blocks of the dlsh shell.
//!
//! - [`trie`] and [`priority_heap`]: the history index and the ranked
//!   suggestion candidates it produces
//! - [`history`]: recall cursor plus history file persistence
//! - [`input_parser`] and [`key`]: raw bytes to keystrokes
//! - [`line_buffer`] and [`pattern`]: the edit buffer and word boundaries
//! - [`lexer`]: command-line tokenizing and word unquoting

pub mod history;
pub mod input_parser;
pub mod key;
pub mod lexer;
pub mod line_buffer;
pub mod logging;
pub mod pattern;
pub mod priority_heap;
pub mod trie;

#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};

pub use history::{History, HistoryError};
pub use input_parser::InputParser;
pub use key::{KeyCode, KeyEvent, Modifiers};
pub use lexer::{Token, tokenize, unquote};
pub use line_buffer::LineBuffer;
pub use pattern::Pattern;
pub use priority_heap::{HeapKind, PriorityHeap};
pub use trie::{NodeId, Trie};
