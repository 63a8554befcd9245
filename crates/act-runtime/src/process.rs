//! # Process Lifecycle
//!
//! `Created → Running → (Handled | Unhandled | Failed | Idle) → Destroyed`
//!
//! Each process runs in its own Tokio task and owns its state exclusively. The task
//! blocks on its mailbox until one of three things happens:
//!
//! 1. A message is delivered. It is handled exactly once, then the process exits.
//! 2. The scheduler cancels its shutdown token (or the idle timeout fires) with the
//!    mailbox still empty. The process exits with its state untouched.
//! 3. A `Show` request arrives. It is answered and the process keeps waiting.
//!
//! Leaving idle goes through [`Scheduler::retire`], which refuses once a delivery has
//! claimed the process. The process then stops watching shutdown and the idle timer and
//! waits for the claimed message, so a successful `deliver` is always handled.

use crate::message::{Message, Pid, ProcessRequest, Snapshot};
use crate::scheduler::{ExitReason, ProcessExit, Scheduler};
use crate::template::ActorTemplate;
use crate::token::ROOT_NAME;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

pub(crate) struct Process {
    name: String,
    pid: Pid,
    template: Arc<ActorTemplate>,
    state: i64,
    mailbox: mpsc::Receiver<ProcessRequest>,
    scheduler: Scheduler,
}

impl Process {
    pub(crate) fn new(
        name: String,
        pid: Pid,
        template: Arc<ActorTemplate>,
        state: i64,
        mailbox: mpsc::Receiver<ProcessRequest>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            name,
            pid,
            template,
            state,
            mailbox,
            scheduler,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            pid: self.pid,
            state: self.state,
        }
    }

    pub(crate) async fn run(mut self, ready: oneshot::Sender<()>) {
        info!(
            pid = %self.pid,
            name = %self.name,
            template = self.template.name(),
            state = self.state,
            "Process started"
        );
        let _ = ready.send(());

        let shutdown = self.scheduler.shutdown_token();
        let idle = idle_timer(self.scheduler.config().idle_timeout);
        tokio::pin!(idle);
        // Set when retiring was refused: a claimed message is on its way.
        let mut claimed = false;

        let exit = loop {
            tokio::select! {
                biased;
                request = self.mailbox.recv() => match request {
                    Some(ProcessRequest::Deliver(message)) => {
                        let reason = self.handle(message).await;
                        break self.deregister(reason);
                    }
                    Some(ProcessRequest::Show { respond_to }) => {
                        let _ = respond_to.send(self.snapshot());
                        // A claim given back after `MailboxFull` leaves queued shows; check again.
                        claimed = false;
                    }
                    Some(ProcessRequest::Stop) | None => break self.deregister(ExitReason::Stopped),
                },
                _ = shutdown.cancelled(), if !claimed => match self.retire() {
                    Some(exit) => break exit,
                    None => claimed = true,
                },
                _ = &mut idle, if !claimed => {
                    debug!(pid = %self.pid, "Idle timeout");
                    match self.retire() {
                        Some(exit) => break exit,
                        None => claimed = true,
                    }
                }
            }
        };

        self.destroy(exit);
    }

    async fn handle(&mut self, message: Message) -> ExitReason {
        debug!(pid = %self.pid, ?message, "Received");

        match self.template.handle(&message, self.state) {
            None => {
                debug!(pid = %self.pid, message = %message.id, "No action for message, ignoring");
                ExitReason::Unhandled
            }
            Some(Err(e)) => {
                warn!(pid = %self.pid, name = %self.name, message = %message.id, error = %e, "Handler failed");
                ExitReason::Failed(e.to_string())
            }
            Some(Ok(outcome)) => {
                self.state = outcome.state;
                info!(pid = %self.pid, name = %self.name, state = self.state, "Handled");
                if let Some(reply_to) = outcome.reply_to {
                    self.scheduler
                        .reply(self.pid, reply_to, &message.id, self.state)
                        .await;
                }
                ExitReason::Handled
            }
        }
    }

    fn exit(&self, reason: ExitReason) -> ProcessExit {
        ProcessExit {
            pid: self.pid,
            name: self.name.clone(),
            template: self.template.name().to_string(),
            state: self.state,
            reason,
        }
    }

    fn deregister(&self, reason: ExitReason) -> ProcessExit {
        let exit = self.exit(reason);
        self.scheduler.deregister(exit.clone());
        exit
    }

    fn retire(&self) -> Option<ProcessExit> {
        let exit = self.exit(ExitReason::Idle);
        self.scheduler.retire(exit.clone()).then_some(exit)
    }

    /// Runs after the process has left the registry.
    fn destroy(mut self, exit: ProcessExit) {
        info!(pid = %self.pid, reason = ?exit.reason, "Process destroyed");

        self.mailbox.close();
        while let Ok(request) = self.mailbox.try_recv() {
            match request {
                ProcessRequest::Show { respond_to } => {
                    let _ = respond_to.send(self.snapshot());
                }
                ProcessRequest::Deliver(message) => {
                    // Deliveries claim their slot first, so this means a second claim slipped by.
                    error!(pid = %self.pid, ?message, "Unclaimed delivery after exit");
                }
                ProcessRequest::Stop => {}
            }
        }
    }
}

/// The `@` process. Records every message delivered to it and never runs a handler.
pub(crate) struct RootProcess {
    mailbox: mpsc::Receiver<ProcessRequest>,
    replies: Vec<Message>,
    scheduler: Scheduler,
}

impl RootProcess {
    pub(crate) fn new(mailbox: mpsc::Receiver<ProcessRequest>, scheduler: Scheduler) -> Self {
        Self {
            mailbox,
            replies: Vec::new(),
            scheduler,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: ROOT_NAME.to_string(),
            pid: Pid::ROOT,
            state: self.replies.len() as i64,
        }
    }

    fn record(&mut self, message: Message) {
        info!(pid = %Pid::ROOT, ?message, "Root received");
        self.replies.push(message);
    }

    /// Runs until an explicit `Stop`; the shutdown token does not apply to root.
    pub(crate) async fn run(mut self, ready: oneshot::Sender<()>) -> Vec<Message> {
        info!(pid = %Pid::ROOT, "Root process started");
        let _ = ready.send(());

        while let Some(request) = self.mailbox.recv().await {
            match request {
                ProcessRequest::Deliver(message) => self.record(message),
                ProcessRequest::Show { respond_to } => {
                    let _ = respond_to.send(self.snapshot());
                }
                ProcessRequest::Stop => break,
            }
        }

        self.scheduler.deregister(ProcessExit {
            pid: Pid::ROOT,
            name: ROOT_NAME.to_string(),
            template: ROOT_NAME.to_string(),
            state: self.replies.len() as i64,
            reason: ExitReason::Stopped,
        });
        self.mailbox.close();
        while let Ok(request) = self.mailbox.try_recv() {
            match request {
                ProcessRequest::Deliver(message) => self.record(message),
                ProcessRequest::Show { respond_to } => {
                    let _ = respond_to.send(self.snapshot());
                }
                ProcessRequest::Stop => {}
            }
        }

        info!(pid = %Pid::ROOT, replies = self.replies.len(), "Root process destroyed");
        self.replies
    }
}

async fn idle_timer(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
