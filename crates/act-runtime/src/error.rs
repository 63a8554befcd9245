//! # Runtime Errors
//!
//! Errors are split by blast radius. [`EvalError`] and [`HandlerError`] are local to a
//! single process handling a single message: the process logs them and exits without
//! committing state. [`RuntimeError`] is structural and aborts the whole run.

use crate::message::Pid;

/// Failures of the stack machine while running a handler body.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("undefined local `{0}`")]
    UndefinedLocal(String),
    #[error("malformed integer literal `{0}`")]
    MalformedLiteral(String),
    #[error("operator `{op}` needs {needed} operand(s) but the stack holds {available}")]
    StackUnderflow {
        op: String,
        needed: usize,
        available: usize,
    },
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("division by zero in `{0}`")]
    DivisionByZero(String),
    #[error("token `{0}` is not allowed in a handler body")]
    UnexpectedToken(String),
}

/// Failures of one handling attempt, before or during evaluation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("message `{message}` requires {expected} argument(s), got {got}")]
    ArityMismatch {
        message: String,
        expected: usize,
        got: usize,
    },
    #[error("reply parameter `{param}` of `{message}` is not a declared parameter")]
    MissingReplyArgument { message: String, param: String },
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Structural errors that abort an environment pass.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("process not found: {0}")]
    ProcessNotFound(String),
    #[error("actor `{0}` is already defined")]
    DuplicateActorName(String),
    #[error("actor `{0}` is not defined")]
    UndefinedActor(String),
    #[error("spawn of `{0}` names no actor")]
    EmptySpawnScope(String),
    #[error("invalid initial state `{value}` for actor `{actor}`")]
    InvalidInitialState { actor: String, value: String },
    #[error("invalid message argument `{0}`")]
    InvalidArgument(String),
    #[error("mailbox of process {0} is full")]
    MailboxFull(Pid),
    #[error("process task failed: {0}")]
    TaskFailed(String),
}

impl RuntimeError {
    pub(crate) fn no_pid(pid: Pid) -> Self {
        RuntimeError::ProcessNotFound(format!("pid {pid}"))
    }
}
