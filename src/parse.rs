//! # Parser
//!
//! Single pass, no backtracking. Grammar:
//!
//! ```text
//! module := item*
//! item   := "actor" NAME STATE "=" action ("," action)* ";"
//!         | TARGET "<-" MSG ARG* ";"            (commas between args are ignored)
//!         | NAME "=" "spawn" "{" TOKEN* "}" ";"
//!         | "show" TARGET ";"
//! action := MSG PARAM* "{" TOKEN* "}" ("->" REPLY)?
//! ```

use act_runtime::module::{ActionDef, ActorDef, Item, SendStmt, ShowStmt, SpawnStmt};
use act_runtime::{Module, Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} but found `{found}` (token {index})")]
    UnexpectedToken {
        expected: String,
        found: String,
        index: usize,
    },
    #[error("expected {expected} but reached end of input")]
    UnexpectedEof { expected: String },
}

pub fn parse(tokens: Vec<Token>) -> Result<Module, ParseError> {
    Parser { tokens, pos: 0 }.module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_is(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    /// Checks the token after the current one.
    fn lookahead_is(&self, text: &str) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.is(text))
    }

    fn next(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof {
                expected: expected.to_string(),
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(&self, expected: &str, token: &Token, index: usize) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.text.clone(),
            index,
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token, ParseError> {
        let index = self.pos;
        let expected = format!("`{text}`");
        let token = self.next(&expected)?;
        if !token.is(text) {
            return Err(self.unexpected(&expected, &token, index));
        }
        Ok(token)
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let index = self.pos;
        let token = self.next(what)?;
        if token.kind != TokenKind::Ident {
            return Err(self.unexpected(what, &token, index));
        }
        Ok(token.text)
    }

    /// Collects tokens up to the closing `}` and consumes it.
    fn block(&mut self) -> Result<Vec<Token>, ParseError> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.peek_is("}") {
            body.push(self.next("`}`")?);
        }
        self.expect("}")?;
        Ok(body)
    }

    fn module(mut self) -> Result<Module, ParseError> {
        let mut items = Vec::new();
        while let Some(kind) = self.peek().map(|t| t.kind) {
            let item = match kind {
                TokenKind::Actor => Item::ActorDef(self.actor()?),
                TokenKind::Show => Item::Show(self.show()?),
                TokenKind::Ident | TokenKind::Lit | TokenKind::Symbol if self.lookahead_is("<-") => {
                    Item::Send(self.send()?)
                }
                TokenKind::Ident if self.lookahead_is("=") => Item::Spawn(self.spawn()?),
                _ => {
                    let index = self.pos;
                    let token = self.next("a statement")?;
                    return Err(self.unexpected("a statement", &token, index));
                }
            };
            items.push(item);
        }
        Ok(Module::new(items))
    }

    fn actor(&mut self) -> Result<ActorDef, ParseError> {
        self.expect("actor")?;
        let name = self.expect_ident("an actor name")?;
        let initial_state = self.next("an initial state")?;
        self.expect("=")?;
        let mut actions = vec![self.action()?];
        while self.peek_is(",") {
            self.expect(",")?;
            actions.push(self.action()?);
        }
        self.expect(";")?;
        Ok(ActorDef {
            name,
            initial_state,
            actions,
        })
    }

    fn action(&mut self) -> Result<ActionDef, ParseError> {
        let message = self.expect_ident("a message name")?;
        let mut params = Vec::new();
        while !self.peek_is("{") {
            if self.peek_is(",") {
                self.pos += 1;
                continue;
            }
            params.push(self.expect_ident("a parameter or `{`")?);
        }
        let body = self.block()?;
        let reply_param = if self.peek_is("->") {
            self.expect("->")?;
            Some(self.next("a reply parameter")?.text)
        } else {
            None
        };
        Ok(ActionDef {
            message,
            params,
            body,
            reply_param,
        })
    }

    fn send(&mut self) -> Result<SendStmt, ParseError> {
        let target = self.next("a send target")?;
        self.expect("<-")?;
        let message = self.expect_ident("a message name")?;
        let mut args = Vec::new();
        while !self.peek_is(";") {
            let arg = self.next("`;`")?;
            if !arg.is(",") {
                args.push(arg);
            }
        }
        self.expect(";")?;
        Ok(SendStmt {
            target,
            message,
            args,
        })
    }

    fn spawn(&mut self) -> Result<SpawnStmt, ParseError> {
        let name = self.expect_ident("a process name")?;
        self.expect("=")?;
        self.expect("spawn")?;
        let scope = self.block()?;
        self.expect(";")?;
        Ok(SpawnStmt { name, scope })
    }

    fn show(&mut self) -> Result<ShowStmt, ParseError> {
        self.expect("show")?;
        let target = self.next("a process to show")?;
        self.expect(";")?;
        Ok(ShowStmt { target })
    }
}
