//! Lexical units shared by the front end and the evaluator.

use std::fmt;

/// The reserved token naming the root process.
pub const ROOT_NAME: &str = "@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `actor`
    Actor,
    /// `show`
    Show,
    /// `spawn`
    Spawn,
    Ident,
    Lit,
    Op,
    Symbol,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(self, TokenKind::Actor | TokenKind::Show | TokenKind::Spawn)
    }
}

/// A token and its literal text. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn ident(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Ident, text)
    }

    pub fn lit(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Lit, text)
    }

    pub fn op(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Op, text)
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Symbol, text)
    }

    /// Whether this token is the `@` self-reference to the root process.
    pub fn is_root_ref(&self) -> bool {
        self.kind == TokenKind::Symbol && self.text == ROOT_NAME
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(`{}`)", self.kind, self.text)
    }
}
