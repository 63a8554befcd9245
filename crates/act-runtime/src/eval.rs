//! # Expression Evaluator
//!
//! A straight-line stack machine that runs a handler body against a running state value.
//!
//! Identifiers push bound locals, literals push themselves, operators pop their fixed
//! number of operands:
//!
//! | op | arity | effect |
//! |----|-------|--------|
//! | `=` `+=` `-=` `*=` `%=` | 1 | combine the popped value into the state |
//! | `+` `*` `%` | 2 | push `left OP right`, state untouched |
//!
//! For the binary operators the top of the stack is the right-hand operand, so
//! `a b + =` reads as "state = a + b" and `7 3 %` is `7 % 3`.
//!
//! Arithmetic wraps like the host's native integers. There is no control flow.

use crate::error::EvalError;
use crate::token::{Token, TokenKind, ROOT_NAME};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    ModAssign,
    Add,
    Mul,
    Mod,
}

impl Op {
    /// Operands consumed from the stack.
    pub fn arity(self) -> usize {
        match self {
            Op::Assign | Op::AddAssign | Op::SubAssign | Op::MulAssign | Op::ModAssign => 1,
            Op::Add | Op::Mul | Op::Mod => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Op::Assign => "=",
            Op::AddAssign => "+=",
            Op::SubAssign => "-=",
            Op::MulAssign => "*=",
            Op::ModAssign => "%=",
            Op::Add => "+",
            Op::Mul => "*",
            Op::Mod => "%",
        }
    }
}

impl FromStr for Op {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Op::Assign),
            "+=" => Ok(Op::AddAssign),
            "-=" => Ok(Op::SubAssign),
            "*=" => Ok(Op::MulAssign),
            "%=" => Ok(Op::ModAssign),
            "+" => Ok(Op::Add),
            "*" => Ok(Op::Mul),
            "%" => Ok(Op::Mod),
            other => Err(EvalError::UnknownOperator(other.to_string())),
        }
    }
}

/// Runs `tokens` starting from `state` and returns the final state.
pub fn eval(tokens: &[Token], state: i64, locals: &HashMap<String, i64>) -> Result<i64, EvalError> {
    Evaluator::new(tokens, state, locals).run()
}

pub struct Evaluator<'a> {
    tokens: &'a [Token],
    locals: &'a HashMap<String, i64>,
    stack: Vec<i64>,
    state: i64,
}

impl<'a> Evaluator<'a> {
    pub fn new(tokens: &'a [Token], state: i64, locals: &'a HashMap<String, i64>) -> Self {
        Self {
            tokens,
            locals,
            stack: Vec::new(),
            state,
        }
    }

    pub fn run(mut self) -> Result<i64, EvalError> {
        for token in self.tokens {
            self.step(token)?;
        }
        if !self.stack.is_empty() {
            debug!(leftover = ?self.stack, "Discarding leftover operands");
        }
        Ok(self.state)
    }

    fn step(&mut self, token: &Token) -> Result<(), EvalError> {
        match token.kind {
            TokenKind::Ident => {
                let value = self.local(&token.text)?;
                self.stack.push(value);
            }
            TokenKind::Lit => {
                let value = token
                    .text
                    .parse::<i64>()
                    .map_err(|_| EvalError::MalformedLiteral(token.text.clone()))?;
                self.stack.push(value);
            }
            TokenKind::Symbol if token.is_root_ref() => {
                let value = self.local(ROOT_NAME)?;
                self.stack.push(value);
            }
            TokenKind::Op | TokenKind::Symbol => {
                let op: Op = token.text.parse()?;
                self.apply(op)?;
            }
            TokenKind::Actor | TokenKind::Show | TokenKind::Spawn => {
                return Err(EvalError::UnexpectedToken(token.text.clone()));
            }
        }
        Ok(())
    }

    fn local(&self, name: &str) -> Result<i64, EvalError> {
        self.locals
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedLocal(name.to_string()))
    }

    fn pop(&mut self, op: Op) -> Result<i64, EvalError> {
        let available = self.stack.len();
        self.stack.pop().ok_or(EvalError::StackUnderflow {
            op: op.as_str().to_string(),
            needed: op.arity(),
            available,
        })
    }

    fn apply(&mut self, op: Op) -> Result<(), EvalError> {
        if self.stack.len() < op.arity() {
            return Err(EvalError::StackUnderflow {
                op: op.as_str().to_string(),
                needed: op.arity(),
                available: self.stack.len(),
            });
        }
        match op {
            Op::Assign => self.state = self.pop(op)?,
            Op::AddAssign => self.state = self.state.wrapping_add(self.pop(op)?),
            Op::SubAssign => self.state = self.state.wrapping_sub(self.pop(op)?),
            Op::MulAssign => self.state = self.state.wrapping_mul(self.pop(op)?),
            Op::ModAssign => {
                let rhs = self.pop(op)?;
                self.state = rem(self.state, rhs, op)?;
            }
            Op::Add | Op::Mul | Op::Mod => {
                let rhs = self.pop(op)?;
                let lhs = self.pop(op)?;
                let value = match op {
                    Op::Add => lhs.wrapping_add(rhs),
                    Op::Mul => lhs.wrapping_mul(rhs),
                    _ => rem(lhs, rhs, op)?,
                };
                self.stack.push(value);
            }
        }
        Ok(())
    }
}

fn rem(lhs: i64, rhs: i64, op: Op) -> Result<i64, EvalError> {
    if rhs == 0 {
        return Err(EvalError::DivisionByZero(op.as_str().to_string()));
    }
    Ok(lhs.wrapping_rem(rhs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str) -> Vec<Token> {
        src.split_whitespace()
            .map(|t| {
                if t.chars().all(|c| c.is_ascii_digit()) {
                    Token::lit(t)
                } else if t.chars().all(|c| c.is_alphanumeric()) {
                    Token::ident(t)
                } else if t == "=" || t == "@" {
                    Token::symbol(t)
                } else {
                    Token::op(t)
                }
            })
            .collect()
    }

    fn locals(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_assign_is_absolute() {
        for prior in [-7, 0, 42] {
            assert_eq!(eval(&body("9 ="), prior, &HashMap::new()), Ok(9));
        }
    }

    #[test]
    fn test_compound_assignment() {
        let l = locals(&[("n", 5)]);
        assert_eq!(eval(&body("n +="), 10, &l), Ok(15));
        assert_eq!(eval(&body("n -="), 10, &l), Ok(5));
        assert_eq!(eval(&body("n *="), 10, &l), Ok(50));
        assert_eq!(eval(&body("n %="), 12, &l), Ok(2));
    }

    #[test]
    fn test_binary_ops_push_result() {
        assert_eq!(eval(&body("3 4 * ="), 0, &HashMap::new()), Ok(12));
        assert_eq!(eval(&body("3 4 +"), 99, &HashMap::new()), Ok(99));
        assert_eq!(eval(&body("7 3 % ="), 0, &HashMap::new()), Ok(1));
        assert_eq!(eval(&body("2 3 4 * + ="), 0, &HashMap::new()), Ok(14));
    }

    #[test]
    fn test_remainder_sign_follows_left_operand() {
        let l = locals(&[("n", 3)]);
        assert_eq!(eval(&body("n %="), -7, &l), Ok(-1));
    }

    #[test]
    fn test_root_reference_in_body() {
        let l = locals(&[("@", 1)]);
        assert_eq!(eval(&body("@ ="), 0, &l), Ok(1));
    }

    #[test]
    fn test_errors() {
        let none = HashMap::new();
        assert_eq!(
            eval(&body("x ="), 0, &none),
            Err(EvalError::UndefinedLocal("x".into()))
        );
        assert_eq!(
            eval(&[Token::lit("99999999999999999999"), Token::symbol("=")], 0, &none),
            Err(EvalError::MalformedLiteral("99999999999999999999".into()))
        );
        assert_eq!(
            eval(&body("1 +"), 0, &none),
            Err(EvalError::StackUnderflow {
                op: "+".into(),
                needed: 2,
                available: 1
            })
        );
        assert!(matches!(
            eval(&body("+="), 0, &none),
            Err(EvalError::StackUnderflow { needed: 1, .. })
        ));
        assert_eq!(
            eval(&body("1 <-"), 0, &none),
            Err(EvalError::UnknownOperator("<-".into()))
        );
        assert_eq!(
            eval(&body("0 %="), 5, &none),
            Err(EvalError::DivisionByZero("%=".into()))
        );
        assert_eq!(
            eval(&[Token::new(TokenKind::Spawn, "spawn")], 0, &none),
            Err(EvalError::UnexpectedToken("spawn".into()))
        );
    }

    #[test]
    fn test_wrapping_overflow() {
        let l = locals(&[("n", 1)]);
        assert_eq!(eval(&body("n +="), i64::MAX, &l), Ok(i64::MIN));
    }
}
