//! # Module
//!
//! The parsed program handed to the [`Environment`](crate::Environment). Pure data: the
//! parser produces it once and the environment walks it once, top to bottom.

use crate::token::Token;

/// A parsed program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub items: Vec<Item>,
}

impl Module {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

/// One top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    ActorDef(ActorDef),
    Send(SendStmt),
    Spawn(SpawnStmt),
    Show(ShowStmt),
}

/// `actor counter 0 = inc n { n += };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorDef {
    pub name: String,
    /// Left unparsed so the environment can report `InvalidInitialState` with the raw text.
    pub initial_state: Token,
    pub actions: Vec<ActionDef>,
}

/// A handler bound to one message name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub message: String,
    pub params: Vec<String>,
    pub body: Vec<Token>,
    /// Parameter whose bound value is the pid to reply to, or `@` for root.
    pub reply_param: Option<String>,
}

/// `c1 <- inc 5;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendStmt {
    /// A process name, a numeric pid, or `@`.
    pub target: Token,
    pub message: String,
    pub args: Vec<Token>,
}

/// `c1 = spawn { counter 10 };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnStmt {
    pub name: String,
    /// `[template]` or `[template, override_state]`.
    pub scope: Vec<Token>,
}

/// `show c1;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowStmt {
    pub target: Token,
}
