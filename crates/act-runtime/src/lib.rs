//! # act runtime
//!
//! The process scheduler and expression evaluator behind the `act` language.
//!
//! A program defines actor templates, spawns processes from them and sends messages
//! between them. Every process holds a private integer state, handles **at most one**
//! message in its lifetime, may mutate its state through a tiny stack machine, and may
//! reply to another process.
//!
//! ## Architecture Overview
//!
//! 1. **Data** ([`Module`], [`Token`]) - the parsed program, produced by a front end.
//! 2. **Evaluator** ([`eval`]) - runs a handler body against the process state.
//! 3. **Templates** ([`ActorTemplate`]) - named prototypes with compiled handlers.
//! 4. **Processes** - one Tokio task per process, one-shot lifecycle.
//! 5. **Scheduler** ([`Scheduler`]) - pids, registry, routing, join.
//! 6. **Environment** ([`Environment`]) - walks the module once and drives the rest.
//!
//! ## Example
//!
//! ```rust
//! use act_runtime::module::{ActionDef, ActorDef, Item, Module, SendStmt, SpawnStmt};
//! use act_runtime::{Environment, RuntimeConfig, Token};
//!
//! #[tokio::main]
//! async fn main() {
//!     // actor counter 0 = inc n { n += };
//!     // c1 = spawn { counter };
//!     // c1 <- inc 5;
//!     let module = Module::new(vec![
//!         Item::ActorDef(ActorDef {
//!             name: "counter".into(),
//!             initial_state: Token::lit("0"),
//!             actions: vec![ActionDef {
//!                 message: "inc".into(),
//!                 params: vec!["n".into()],
//!                 body: vec![Token::ident("n"), Token::op("+=")],
//!                 reply_param: None,
//!             }],
//!         }),
//!         Item::Spawn(SpawnStmt {
//!             name: "c1".into(),
//!             scope: vec![Token::ident("counter")],
//!         }),
//!         Item::Send(SendStmt {
//!             target: Token::ident("c1"),
//!             message: "inc".into(),
//!             args: vec![Token::lit("5")],
//!         }),
//!     ]);
//!
//!     let report = Environment::new(module, RuntimeConfig::default())
//!         .exec()
//!         .await
//!         .unwrap();
//!     assert_eq!(report.process("c1").unwrap().state, 5);
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Each process runs in its own Tokio task and owns its state; nothing else touches it.
//! - The scheduler registry is the only shared mutable structure, behind one mutex.
//! - Mail to one process is observed in delivery order. Nothing orders mail across
//!   processes.
//! - Idle processes block on their mailbox; the scheduler's shutdown token ends them.

pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod message;
pub mod module;
mod process;
pub mod scheduler;
pub mod template;
pub mod token;
pub mod tracing;

pub use config::RuntimeConfig;
pub use env::Environment;
pub use error::{EvalError, HandlerError, RuntimeError};
pub use message::{Message, Pid, Snapshot};
pub use module::Module;
pub use scheduler::{ExitReason, ProcessExit, ProcessHandle, RunReport, Scheduler};
pub use template::ActorTemplate;
pub use token::{Token, TokenKind};
