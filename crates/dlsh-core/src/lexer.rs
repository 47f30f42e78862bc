#![forbid(unsafe_code)]

//! Command-line tokenizer.
//!
//! [`tokenize`] splits a line into words and operators. Quotes and
//! backslashes are kept in the word text so that [`unquote`], run later by
//! the parser, can tell quoted characters from bare ones.
//!
//! # Rules
//!
//! - Outside quotes, spaces and tabs separate words.
//! - `|`, `<`, `>`, `>>`, `&`, `&&` are operators and also separate words.
//! - Between a pair of `"` or `'` every character is literal.
//! - A backslash outside single quotes protects the next character.
//! - `$NAME` and `${NAME}` expand when a word is closed, except inside single
//!   quotes or after a backslash. Unset variables expand to nothing.
//! - An unterminated quote turns the rest of the line into one word.

use std::fmt;
use std::path::Path;

/// One lexical unit of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word, still carrying its quotes and escapes.
    Word(String),
    /// `|`
    Pipe,
    /// `&&`
    And,
    /// `&`
    Background,
    /// `>`
    RedirectOut,
    /// `>>`
    RedirectAppend,
    /// `<`
    RedirectIn,
}

impl Token {
    #[must_use]
    pub fn word(text: &str) -> Self {
        Self::Word(text.to_string())
    }

    #[must_use]
    pub fn is_operator(&self) -> bool {
        !matches!(self, Self::Word(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(text) => f.write_str(text),
            Self::Pipe => f.write_str("|"),
            Self::And => f.write_str("&&"),
            Self::Background => f.write_str("&"),
            Self::RedirectOut => f.write_str(">"),
            Self::RedirectAppend => f.write_str(">>"),
            Self::RedirectIn => f.write_str("<"),
        }
    }
}

/// Tokenize with variables looked up in the process environment.
#[must_use]
pub fn tokenize(line: &str) -> Vec<Token> {
    tokenize_with(line, |name| std::env::var(name).ok())
}

/// Tokenize with a caller-supplied variable lookup.
pub fn tokenize_with<F>(line: &str, lookup: F) -> Vec<Token>
where
    F: Fn(&str) -> Option<String>,
{
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut open: Option<char> = None;
    let mut chars = line.chars().peekable();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(expand_vars(word, &lookup)));
            word.clear();
        }
    };

    while let Some(c) = chars.next() {
        if let Some(quote) = open {
            word.push(c);
            if c == '\\' && quote == '"' {
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            } else if c == quote {
                open = None;
            }
            continue;
        }

        match c {
            '\\' => {
                word.push(c);
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            '"' | '\'' => {
                open = Some(c);
                word.push(c);
            }
            ' ' | '\t' => flush(&mut word, &mut tokens),
            '|' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Pipe);
            }
            '&' => {
                flush(&mut word, &mut tokens);
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::And);
                } else {
                    tokens.push(Token::Background);
                }
            }
            '>' => {
                flush(&mut word, &mut tokens);
                if chars.next_if_eq(&'>').is_some() {
                    tokens.push(Token::RedirectAppend);
                } else {
                    tokens.push(Token::RedirectOut);
                }
            }
            '<' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::RedirectIn);
            }
            _ => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitute `$NAME` / `${NAME}` outside single quotes.
///
/// Substituted text is escaped so [`unquote`] reproduces it verbatim.
fn expand_vars<F>(word: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !word.contains('$') {
        return word.to_string();
    }

    let mut out = String::with_capacity(word.len());
    let mut open: Option<char> = None;
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if open != Some('\'') => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' | '\'' if open.is_none() => {
                open = Some(c);
                out.push(c);
            }
            _ if open == Some(c) => {
                open = None;
                out.push(c);
            }
            '$' if open != Some('\'') => {
                let name = if chars.next_if_eq(&'{').is_some() {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        out.push_str("${");
                        out.push_str(&name);
                        continue;
                    }
                    name
                } else if chars.peek().copied().is_some_and(is_name_start) {
                    let mut name = String::new();
                    while let Some(n) = chars.next_if(|&n| is_name_char(n)) {
                        name.push(n);
                    }
                    name
                } else {
                    out.push('$');
                    continue;
                };
                if let Some(value) = lookup(&name) {
                    for v in value.chars() {
                        if matches!(v, '\\' | '"' | '\'' | '~') {
                            out.push('\\');
                        }
                        out.push(v);
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Resolve a word to its literal text, using the current home directory.
#[must_use]
pub fn unquote(word: &str) -> String {
    unquote_with_home(word, dirs::home_dir().as_deref())
}

/// Resolve a word to its literal text.
///
/// A leading unquoted `~` (alone or before `/`) becomes `home`; `\x` becomes
/// `x` outside single quotes; matching quote pairs are removed.
#[must_use]
pub fn unquote_with_home(word: &str, home: Option<&Path>) -> String {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;

    if let Some(home) = home
        && (word == "~" || word.starts_with("~/"))
    {
        out.push_str(&home.to_string_lossy());
        rest = &word[1..];
    }

    let mut open: Option<char> = None;
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if open != Some('\'') => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' | '\'' if open.is_none() => open = Some(c),
            _ if open == Some(c) => open = None,
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn words(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn pipeline_with_quotes() {
        let tokens = tokenize_with(r#"echo "a b" | wc -w"#, no_env);
        assert_eq!(
            tokens,
            vec![
                Token::word("echo"),
                Token::word(r#""a b""#),
                Token::Pipe,
                Token::word("wc"),
                Token::word("-w"),
            ]
        );
    }

    #[test]
    fn operators_split_without_spaces() {
        let tokens = tokenize_with("a|b&&c>f>>g<h&", no_env);
        assert_eq!(
            words(&tokens),
            vec!["a", "|", "b", "&&", "c", ">", "f", ">>", "g", "<", "h", "&"]
        );
        assert!(tokens[1].is_operator());
        assert!(!tokens[0].is_operator());
    }

    #[test]
    fn operators_inside_quotes_are_literal() {
        let tokens = tokenize_with(r#"echo "a|b" 'x && y'"#, no_env);
        assert_eq!(words(&tokens), vec!["echo", r#""a|b""#, "'x && y'"]);
    }

    #[test]
    fn backslash_protects_separator() {
        let tokens = tokenize_with(r"touch my\ file a\|b", no_env);
        assert_eq!(words(&tokens), vec!["touch", r"my\ file", r"a\|b"]);
        assert_eq!(unquote_with_home(r"my\ file", None), "my file");
        assert_eq!(unquote_with_home(r"a\|b", None), "a|b");
    }

    #[test]
    fn unterminated_quote_takes_rest() {
        let tokens = tokenize_with(r#"echo "one two | three"#, no_env);
        assert_eq!(words(&tokens), vec!["echo", r#""one two | three"#]);
    }

    #[test]
    fn variable_expansion() {
        let env = |name: &str| match name {
            "HOME" => Some("/home/u".to_string()),
            "X" => Some("1".to_string()),
            _ => None,
        };
        let tokens = tokenize_with(r#"echo $HOME ${X}y "$X" '$X' \$X $ $MISSING."#, env);
        assert_eq!(
            words(&tokens),
            vec!["echo", "/home/u", "1y", r#""1""#, "'$X'", r"\$X", "$", "."]
        );
    }

    #[test]
    fn expanded_quotes_stay_literal() {
        let env = |_: &str| Some(r#"say "hi""#.to_string());
        let tokens = tokenize_with("echo $V", env);
        assert_eq!(unquote_with_home(&tokens[1].to_string(), None), r#"say "hi""#);
    }

    #[test]
    fn unclosed_brace_is_literal() {
        let tokens = tokenize_with("echo ${X", |_| Some("v".to_string()));
        assert_eq!(words(&tokens), vec!["echo", "${X"]);
    }

    #[test]
    fn unquote_strips_pairs() {
        assert_eq!(unquote_with_home(r#""a b""#, None), "a b");
        assert_eq!(unquote_with_home(r#"'say "hi"'"#, None), r#"say "hi""#);
        assert_eq!(unquote_with_home(r#""it's""#, None), "it's");
        assert_eq!(unquote_with_home(r"'a\b'", None), r"a\b");
        assert_eq!(unquote_with_home(r#""a\"b""#, None), r#"a"b"#);
    }

    #[test]
    fn tilde_expands_only_when_leading() {
        let home = PathBuf::from("/home/u");
        assert_eq!(unquote_with_home("~", Some(&home)), "/home/u");
        assert_eq!(unquote_with_home("~/src", Some(&home)), "/home/u/src");
        assert_eq!(unquote_with_home("a~b", Some(&home)), "a~b");
        assert_eq!(unquote_with_home("'~'", Some(&home)), "~");
        assert_eq!(unquote_with_home(r"\~", Some(&home)), "~");
        assert_eq!(unquote_with_home("~user", Some(&home)), "~user");
    }

    #[test]
    fn blank_line_has_no_tokens() {
        assert!(tokenize_with("   \t ", no_env).is_empty());
    }
}
