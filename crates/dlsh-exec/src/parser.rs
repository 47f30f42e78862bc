#![forbid(unsafe_code)]

//! Token stream to instruction list.
//!
//! | Token        | Effect                                              |
//! |--------------|-----------------------------------------------------|
//! | word         | next argument (unquoted here)                       |
//! | `\|`         | ends the instruction, connector [`Connector::Pipe`] |
//! | `&&`         | ends the instruction, then a [`Connector::Wait`]    |
//! | `&`          | ends the instruction, whole pipeline in background  |
//! | `<` `>` `>>` | opens the following word as stdin or stdout         |
//!
//! Redirection targets are opened during parsing, so a missing input file
//! rejects the line before anything runs.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use dlsh_core::{Token, unquote};

use crate::error::ParseError;
use crate::instruction::{Connector, Instruction};

/// Parse a tokenized line.
pub fn parse(tokens: &[Token]) -> Result<Vec<Instruction>, ParseError> {
    let mut instructions: Vec<Instruction> = Vec::new();
    let mut begin = 0;

    while begin < tokens.len() {
        let mut ins = Instruction::new();
        begin += parse_instruction(&mut ins, &tokens[begin..])?;

        if ins.is_background() {
            for prev in instructions.iter_mut().rev() {
                if prev.connector != Connector::Pipe {
                    break;
                }
                prev.set_background(true);
            }
        }
        // Redirections alone (`> file`) have already done their work.
        if ins.connector == Connector::Exec && !ins.has_command() {
            continue;
        }
        instructions.push(ins);
    }

    validate(&instructions)?;
    tracing::trace!(count = instructions.len(), "parsed line");
    Ok(instructions)
}

/// Fill `ins` from the front of `tokens`; returns how many were consumed.
fn parse_instruction(ins: &mut Instruction, tokens: &[Token]) -> Result<usize, ParseError> {
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Word(word) => ins.push_arg(unquote(word)),
            Token::Pipe => {
                if !ins.has_command() {
                    return Err(ParseError::Syntax(Token::Pipe));
                }
                ins.connector = Connector::Pipe;
                return Ok(i + 1);
            }
            Token::And if i == 0 => {
                ins.connector = Connector::Wait;
                return Ok(1);
            }
            Token::And => {
                if !ins.has_command() {
                    return Err(ParseError::Syntax(Token::And));
                }
                return Ok(i);
            }
            Token::Background => {
                if !ins.has_command() {
                    return Err(ParseError::Syntax(Token::Background));
                }
                ins.set_background(true);
                return Ok(i + 1);
            }
            op @ (Token::RedirectOut | Token::RedirectAppend | Token::RedirectIn) => {
                let Some(Token::Word(target)) = tokens.get(i + 1) else {
                    return Err(ParseError::MissingTarget(op.clone()));
                };
                let file = open_target(op, PathBuf::from(unquote(target)))?;
                if matches!(op, Token::RedirectIn) {
                    ins.redirect_input(file);
                } else {
                    ins.redirect_output(file);
                }
                i += 2;
                continue;
            }
        }
        i += 1;
    }
    Ok(tokens.len())
}

fn open_target(op: &Token, path: PathBuf) -> Result<File, ParseError> {
    let opened = match op {
        Token::RedirectIn => File::open(&path),
        Token::RedirectAppend => OpenOptions::new().append(true).create(true).open(&path),
        _ => File::create(&path),
    };
    opened.map_err(|source| ParseError::Redirect { path, source })
}

/// A barrier needs a finished command on its left and something on its
/// right; a pipe needs a stage after it.
fn validate(instructions: &[Instruction]) -> Result<(), ParseError> {
    for (idx, ins) in instructions.iter().enumerate() {
        if ins.connector != Connector::Wait {
            continue;
        }
        let prev = idx.checked_sub(1).map(|p| &instructions[p]);
        if prev.is_none_or(|p| p.connector != Connector::Exec) {
            return Err(ParseError::Syntax(Token::And));
        }
    }
    match instructions.last().map(|ins| ins.connector) {
        Some(Connector::Wait) => Err(ParseError::Syntax(Token::And)),
        Some(Connector::Pipe) => Err(ParseError::Syntax(Token::Pipe)),
        _ => Ok(()),
    }
}
