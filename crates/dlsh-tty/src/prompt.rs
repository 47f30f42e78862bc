#![forbid(unsafe_code)]

//! The prompt: current directory name on a colored badge, then ` ~ `.

use std::io::{self, Write};
use std::path::Path;

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor};

const BADGE_BG: Color = Color::Rgb { r: 40, g: 44, b: 52 };
const BADGE_FG: Color = Color::Rgb { r: 186, g: 187, b: 241 };
const SEPARATOR: &str = " ~ ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    label: String,
}

impl Prompt {
    /// Prompt for the process's current directory.
    #[must_use]
    pub fn current() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::for_dir(&dir),
            Err(err) => {
                tracing::debug!(error = %err, "current directory unavailable");
                Self { label: "?".into() }
            }
        }
    }

    #[must_use]
    pub fn for_dir(dir: &Path) -> Self {
        let label = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.to_string_lossy().into_owned());
        Self { label }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Columns the prompt occupies.
    #[must_use]
    pub fn width(&self) -> usize {
        unicode_width::UnicodeWidthStr::width(self.label.as_str()) + SEPARATOR.len()
    }

    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(
            out,
            SetBackgroundColor(BADGE_BG),
            SetForegroundColor(BADGE_FG),
            SetAttribute(Attribute::Bold),
            Print(&self.label),
            SetAttribute(Attribute::Reset),
            Print(SEPARATOR),
        )
    }
}
