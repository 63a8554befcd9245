//! # Lexer
//!
//! Turns source text into a flat token sequence.
//!
//! - `#` starts a comment that runs to the end of the line.
//! - Identifiers start with a letter and continue with letters, digits or `_`.
//!   `actor`, `show` and `spawn` are keywords.
//! - Literals are runs of decimal digits.
//! - `= { } , ; @` are single-character symbols.
//! - Operators start with one of `+ - * % <` and continue over `+ - * % < > =`,
//!   which yields `+=`, `<-`, `->` and friends.

use act_runtime::{Token, TokenKind};
use logos::Logos;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character `{ch}` at line {line}, column {column}")]
    UnexpectedChar { ch: char, line: usize, column: usize },
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"([ \t\r\n\f]+|#[^\n]*)")]
enum Lexeme {
    #[token("actor")]
    Actor,
    #[token("show")]
    Show,
    #[token("spawn")]
    Spawn,
    #[regex(r"[A-Za-z][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Lit,
    #[regex(r"[={},;@]")]
    Symbol,
    #[regex(r"[+\-*%<][+\-*%<>=]*")]
    Op,
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Actor => TokenKind::Actor,
            Lexeme::Show => TokenKind::Show,
            Lexeme::Spawn => TokenKind::Spawn,
            Lexeme::Ident => TokenKind::Ident,
            Lexeme::Lit => TokenKind::Lit,
            Lexeme::Symbol => TokenKind::Symbol,
            Lexeme::Op => TokenKind::Op,
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lex = Lexeme::lexer(source);
    let mut tokens = Vec::new();

    while let Some(lexeme) = lex.next() {
        match lexeme {
            Ok(lexeme) => tokens.push(Token::new(lexeme.into(), lex.slice())),
            Err(()) => return Err(unexpected(source, lex.span().start)),
        }
    }
    Ok(tokens)
}

fn unexpected(source: &str, offset: usize) -> LexError {
    let before = &source[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    LexError::UnexpectedChar {
        ch: source[offset..].chars().next().unwrap_or_default(),
        line: before.matches('\n').count() + 1,
        column: before[line_start..].chars().count() + 1,
    }
}
