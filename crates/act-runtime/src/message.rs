//! # Messages
//!
//! Identities and the request type that travels through a process mailbox.
//!
//! Mirrors a resource request enum: most variants carry a `respond_to` oneshot so the
//! caller can await an answer, while [`ProcessRequest::Deliver`] is fire-and-forget.

use serde::Serialize;
use std::fmt;
use tokio::sync::oneshot;

/// Process identity. Allocated monotonically, never reused.
///
/// Every pid fits in an `i64`: the scheduler counts up from 1, and pids written in a
/// program go through [`Pid::from_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(u64);

impl Pid {
    /// Reserved for the root process `@`.
    pub const ROOT: Pid = Pid(1);

    pub fn new(raw: u64) -> Self {
        debug_assert!(i64::try_from(raw).is_ok(), "pid {raw} exceeds i64::MAX");
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    /// Interprets an evaluator value as a pid. Negative values name no process.
    pub fn from_value(value: i64) -> Option<Self> {
        u64::try_from(value).ok().map(Self)
    }

    /// Parses a pid literal as written in a program.
    pub fn parse(text: &str) -> Option<Self> {
        text.parse::<i64>().ok().and_then(Self::from_value)
    }

    /// The pid as an evaluator value. Exact, since pids never exceed `i64::MAX`.
    pub fn as_value(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named message with integer arguments. Consumed exactly once by its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub args: Vec<i64>,
}

impl Message {
    pub fn new(id: impl Into<String>, args: Vec<i64>) -> Self {
        Self {
            id: id.into(),
            args,
        }
    }
}

/// Type alias for the one-shot response channel used by processes.
pub type Response<T> = oneshot::Sender<T>;

/// What a mailbox carries.
#[derive(Debug)]
pub enum ProcessRequest {
    /// The one message a process will ever handle.
    Deliver(Message),
    /// Ask the process for its current state. Does not count as a delivery.
    Show { respond_to: Response<Snapshot> },
    /// Only the root process honors this; it has no other way to exit.
    Stop,
}

/// A process state as reported by the process itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub pid: Pid,
    pub state: i64,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.state)
    }
}
