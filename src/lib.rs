//! # act
//!
//! > **A tiny actor language: one message per process, one integer of state.**
//!
//! ```text
//! actor counter 0 = inc n { n += }, dec n { n -= };
//! c1 = spawn { counter 3 };
//! c1 <- inc 4;
//! show c1;          # prints c1(7)
//! ```
//!
//! This crate is the front end. [`lex`] turns source text into tokens, [`parse`] turns
//! tokens into a [`Module`], and [`run_source`] hands the module to the
//! [`act_runtime`] scheduler and waits for every process to finish.
//!
//! ## Example
//!
//! ```rust
//! use act::{run_source, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), act::Error> {
//!     let report = run_source(
//!         "actor counter 0 = inc n { n += }; c1 = spawn { counter }; c1 <- inc 5;",
//!         RuntimeConfig::default(),
//!     )
//!     .await?;
//!     assert_eq!(report.process("c1").unwrap().state, 5);
//!     Ok(())
//! }
//! ```

pub mod lex;
pub mod parse;

pub use act_runtime;
pub use act_runtime::{Environment, Module, RunReport, RuntimeConfig, RuntimeError, Snapshot};
pub use lex::{tokenize, LexError};
pub use parse::{parse, ParseError};

/// Anything that can go wrong between source text and a finished run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub fn parse_source(source: &str) -> Result<Module, Error> {
    let tokens = tokenize(source)?;
    Ok(parse(tokens)?)
}

/// Parses `source` and runs it to completion.
pub async fn run_source(source: &str, config: RuntimeConfig) -> Result<RunReport, Error> {
    let module = parse_source(source)?;
    tracing::debug!(items = module.items.len(), "Parsed module");
    Ok(Environment::new(module, config).exec().await?)
}
