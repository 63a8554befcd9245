//! Runtime knobs injected into the [`Scheduler`](crate::Scheduler).

use std::time::Duration;

/// Default bound on pending messages per mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Default bounded wait for a sender facing a full mailbox.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of every process mailbox.
    pub mailbox_capacity: usize,
    /// How long `deliver` waits on a full mailbox before failing with `MailboxFull`.
    pub send_timeout: Duration,
    /// Exit a process that has received nothing this long after starting. `None` waits
    /// for the scheduler's shutdown signal.
    pub idle_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            idle_timeout: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
