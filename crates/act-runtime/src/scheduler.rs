//! # Scheduler
//!
//! Owns process identity, the registry, message routing and the global join.
//!
//! The scheduler is a cheap, cloneable handle over shared state. Every process task
//! holds a clone so it can route replies and deregister itself; nothing here is a
//! process-wide singleton.
//!
//! ## Registry
//!
//! A single mutex guards the name and pid indices together with the exit records of
//! finished processes. The lock is never held across an `.await`: callers clone the
//! mailbox sender out of the registry and then send.
//!
//! ## One-shot delivery
//!
//! Every registry entry carries a `claimed` flag. `deliver` sets it under the lock
//! before sending, so at most one `Deliver` ever reaches a process and a second send
//! fails with `ProcessNotFound` instead of being dropped. A claimed process is no
//! longer *live*: name and pid lookups skip it, though `show` still reaches it.
//!
//! A process leaving idle (shutdown or idle timeout) retires through the same lock, so
//! it either retires before a claim or stays to receive the claimed message.
//!
//! ## Shutdown
//!
//! `join_all` runs the program to completion:
//!
//! 1. Wait until no claimed process remains. Replies claim their target in turn, so
//!    once this holds no further message can be produced.
//! 2. Cancel the shutdown token. Processes still waiting exit as `Idle`.
//! 3. Await every non-root task.
//! 4. Send `Stop` to root, which drains everything queued before it, and await root.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::message::{Message, Pid, ProcessRequest, Snapshot};
use crate::process::{Process, RootProcess};
use crate::template::ActorTemplate;
use crate::token::ROOT_NAME;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const SETTLE_POLL: Duration = Duration::from_millis(50);

/// Why a process left the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExitReason {
    /// Handled its one message and committed the new state.
    Handled,
    /// Received a message its template has no action for.
    Unhandled,
    /// The handler failed; state was left untouched.
    Failed(String),
    /// Never received a message before shutdown or the idle timeout.
    Idle,
    /// Stopped explicitly (root) or its mailbox closed underneath it.
    Stopped,
}

/// Final record a process leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessExit {
    pub pid: Pid,
    pub name: String,
    pub template: String,
    pub state: i64,
    pub reason: ExitReason,
}

impl ProcessExit {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            pid: self.pid,
            state: self.state,
        }
    }
}

/// Everything observable about a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Every non-root process, ordered by pid.
    pub processes: Vec<ProcessExit>,
    /// Messages the root process received, in arrival order.
    pub replies: Vec<Message>,
    /// Results of `show` statements, in program order.
    pub shows: Vec<Snapshot>,
}

impl RunReport {
    /// The most recently spawned process with this name.
    pub fn process(&self, name: &str) -> Option<&ProcessExit> {
        self.processes.iter().rev().find(|exit| exit.name == name)
    }

    pub fn process_by_pid(&self, pid: Pid) -> Option<&ProcessExit> {
        self.processes.iter().find(|exit| exit.pid == pid)
    }
}

/// A live process as seen through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
}

/// Returned by [`Scheduler::start_process`].
///
/// The mailbox exists before the task starts, so sending without waiting is safe;
/// `ready` lets the caller wait for the task itself.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    name: String,
    ready: oneshot::Receiver<()>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the readiness handshake.
    pub async fn ready(self) -> Result<Pid, RuntimeError> {
        self.ready.await.map_err(|_| {
            RuntimeError::TaskFailed(format!("process {} died before becoming ready", self.pid))
        })?;
        Ok(self.pid)
    }
}

struct Entry {
    name: String,
    sender: mpsc::Sender<ProcessRequest>,
    /// The one delivery slot is taken. Never set for root.
    claimed: bool,
}

impl Entry {
    fn is_live(&self) -> bool {
        !self.claimed
    }
}

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, Pid>,
    by_pid: HashMap<Pid, Entry>,
    exits: HashMap<Pid, ProcessExit>,
}

struct Shared {
    config: RuntimeConfig,
    pidsource: AtomicU64,
    registry: Mutex<Registry>,
    shutdown: CancellationToken,
    /// Signalled whenever a claim ends, by deregistration or release.
    settled: Notify,
    handles: Mutex<Vec<JoinHandle<()>>>,
    root: Mutex<Option<JoinHandle<Vec<Message>>>>,
}

#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Scheduler {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                pidsource: AtomicU64::new(Pid::ROOT.get()),
                registry: Mutex::new(Registry::default()),
                shutdown: CancellationToken::new(),
                settled: Notify::new(),
                handles: Mutex::new(Vec::new()),
                root: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    /// Allocates the next pid. Strictly increasing, never [`Pid::ROOT`].
    pub fn next_pid(&self) -> Pid {
        Pid::new(self.shared.pidsource.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn mailbox(&self) -> (mpsc::Sender<ProcessRequest>, mpsc::Receiver<ProcessRequest>) {
        mpsc::channel(self.shared.config.mailbox_capacity.max(1))
    }

    fn register(&self, name: &str, pid: Pid, sender: mpsc::Sender<ProcessRequest>) {
        let mut registry = lock(&self.shared.registry);
        if let Some(previous) = registry.by_name.insert(name.to_string(), pid) {
            warn!(name, %previous, %pid, "Name rebound; the older process stays reachable by pid");
        }
        registry.by_pid.insert(
            pid,
            Entry {
                name: name.to_string(),
                sender,
                claimed: false,
            },
        );
        debug!(name, %pid, live = registry.by_pid.len(), "Registered");
    }

    /// Removes a finished process from both indices and keeps its exit record.
    pub(crate) fn deregister(&self, exit: ProcessExit) {
        let mut registry = lock(&self.shared.registry);
        registry.by_pid.remove(&exit.pid);
        if registry.by_name.get(&exit.name) == Some(&exit.pid) {
            registry.by_name.remove(&exit.name);
        }
        debug!(pid = %exit.pid, live = registry.by_pid.len(), "Deregistered");
        registry.exits.insert(exit.pid, exit);
        drop(registry);
        self.shared.settled.notify_waiters();
    }

    /// Deregisters an idle process unless a delivery has already claimed it.
    ///
    /// Returns `false` when the process must stay to receive the claimed message.
    pub(crate) fn retire(&self, exit: ProcessExit) -> bool {
        let mut registry = lock(&self.shared.registry);
        if registry.by_pid.get(&exit.pid).is_some_and(|entry| entry.claimed) {
            return false;
        }
        registry.by_pid.remove(&exit.pid);
        if registry.by_name.get(&exit.name) == Some(&exit.pid) {
            registry.by_name.remove(&exit.name);
        }
        debug!(pid = %exit.pid, live = registry.by_pid.len(), "Retired");
        registry.exits.insert(exit.pid, exit);
        true
    }

    /// Takes the one delivery slot of `pid` and returns its mailbox.
    ///
    /// Root has no slot and accepts any number of messages.
    fn claim(&self, pid: Pid) -> Result<mpsc::Sender<ProcessRequest>, RuntimeError> {
        let mut registry = lock(&self.shared.registry);
        let entry = registry
            .by_pid
            .get_mut(&pid)
            .filter(|entry| entry.is_live())
            .ok_or_else(|| RuntimeError::no_pid(pid))?;
        if !pid.is_root() {
            entry.claimed = true;
        }
        Ok(entry.sender.clone())
    }

    /// Gives back a slot whose delivery never reached the mailbox.
    fn release(&self, pid: Pid) {
        if let Some(entry) = lock(&self.shared.registry).by_pid.get_mut(&pid) {
            entry.claimed = false;
        }
        self.shared.settled.notify_waiters();
    }

    fn has_claims(&self) -> bool {
        lock(&self.shared.registry)
            .by_pid
            .values()
            .any(|entry| entry.claimed)
    }

    /// Starts the `@` process and waits until it is ready. Idempotent.
    pub async fn start_root_process(&self) -> Result<(), RuntimeError> {
        let ready = {
            let mut root = lock(&self.shared.root);
            if root.is_some() {
                return Ok(());
            }
            let (sender, mailbox) = self.mailbox();
            self.register(ROOT_NAME, Pid::ROOT, sender);
            let (ready_tx, ready_rx) = oneshot::channel();
            let process = RootProcess::new(mailbox, self.clone());
            *root = Some(tokio::spawn(process.run(ready_tx)));
            ready_rx
        };
        ready
            .await
            .map_err(|_| RuntimeError::TaskFailed("root process died before becoming ready".into()))
    }

    /// Allocates a pid, registers the process and launches its lifecycle task.
    pub fn start_process(
        &self,
        name: impl Into<String>,
        template: Arc<ActorTemplate>,
        state: i64,
    ) -> ProcessHandle {
        let name = name.into();
        let pid = self.next_pid();
        let (sender, mailbox) = self.mailbox();
        self.register(&name, pid, sender);

        let (ready_tx, ready_rx) = oneshot::channel();
        let process = Process::new(name.clone(), pid, template, state, mailbox, self.clone());
        let handle = tokio::spawn(process.run(ready_tx));
        lock(&self.shared.handles).push(handle);

        ProcessHandle {
            pid,
            name,
            ready: ready_rx,
        }
    }

    /// Resolves a live process by name. A process whose delivery slot is taken no
    /// longer resolves.
    pub fn lookup_by_name(&self, name: &str) -> Result<ProcessInfo, RuntimeError> {
        let registry = lock(&self.shared.registry);
        registry
            .by_name
            .get(name)
            .filter(|pid| registry.by_pid.get(*pid).is_some_and(Entry::is_live))
            .map(|pid| ProcessInfo {
                pid: *pid,
                name: name.to_string(),
            })
            .ok_or_else(|| RuntimeError::ProcessNotFound(name.to_string()))
    }

    pub fn lookup_by_pid(&self, pid: Pid) -> Result<ProcessInfo, RuntimeError> {
        let registry = lock(&self.shared.registry);
        registry
            .by_pid
            .get(&pid)
            .filter(|entry| entry.is_live())
            .map(|entry| ProcessInfo {
                pid,
                name: entry.name.clone(),
            })
            .ok_or_else(|| RuntimeError::no_pid(pid))
    }

    /// Registered and still able to take its one message.
    pub fn is_live(&self, pid: Pid) -> bool {
        lock(&self.shared.registry)
            .by_pid
            .get(&pid)
            .is_some_and(Entry::is_live)
    }

    /// Exit record of a process that has already been destroyed.
    pub fn exit_record(&self, pid: Pid) -> Option<ProcessExit> {
        lock(&self.shared.registry).exits.get(&pid).cloned()
    }

    fn sender(&self, pid: Pid) -> Result<mpsc::Sender<ProcessRequest>, RuntimeError> {
        lock(&self.shared.registry)
            .by_pid
            .get(&pid)
            .map(|entry| entry.sender.clone())
            .ok_or_else(|| RuntimeError::no_pid(pid))
    }

    async fn send(
        &self,
        pid: Pid,
        sender: mpsc::Sender<ProcessRequest>,
        request: ProcessRequest,
    ) -> Result<(), RuntimeError> {
        match sender
            .send_timeout(request, self.shared.config.send_timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(RuntimeError::MailboxFull(pid)),
            Err(SendTimeoutError::Closed(_)) => Err(RuntimeError::no_pid(pid)),
        }
    }

    /// Enqueues `message` on the mailbox of `pid`.
    ///
    /// Claims the process's one delivery slot first, so a process that already took
    /// (or is about to take) a message yields `ProcessNotFound`, as does one that is
    /// gone. Waits up to `send_timeout` on a full mailbox, then fails with
    /// `MailboxFull` and gives the slot back.
    pub async fn deliver(&self, pid: Pid, message: Message) -> Result<(), RuntimeError> {
        let sender = self.claim(pid)?;
        debug!(%pid, ?message, "Deliver");
        let sent = self.send(pid, sender, ProcessRequest::Deliver(message)).await;
        if sent.is_err() && !pid.is_root() {
            self.release(pid);
        }
        sent
    }

    /// Asks a process for its state.
    ///
    /// A process that already finished answers through its exit record.
    pub async fn show(&self, pid: Pid) -> Result<Snapshot, RuntimeError> {
        if let Ok(sender) = self.sender(pid) {
            let (respond_to, response) = oneshot::channel();
            match self
                .send(pid, sender, ProcessRequest::Show { respond_to })
                .await
            {
                Ok(()) => {
                    if let Ok(snapshot) = response.await {
                        return Ok(snapshot);
                    }
                }
                Err(e @ RuntimeError::MailboxFull(_)) => return Err(e),
                Err(_) => {}
            }
        }
        self.exit_record(pid)
            .map(|exit| exit.snapshot())
            .ok_or_else(|| RuntimeError::no_pid(pid))
    }

    /// Sends the post-handler reply of `from`.
    ///
    /// `reply_to` is read as a pid. A live process other than the sender and root gets
    /// the reply directly, claiming its slot like any delivery. Anything else falls
    /// back to root: an unknown pid, a process already claimed or gone, or a failed
    /// send. The payload is `[from, delivered_to, state]`.
    pub(crate) async fn reply(&self, from: Pid, reply_to: i64, message: &str, state: i64) {
        let target = Pid::from_value(reply_to).filter(|pid| *pid != from && !pid.is_root());

        if let Some(target) = target {
            let reply = Message::new(message, vec![from.as_value(), target.as_value(), state]);
            match self.deliver(target, reply).await {
                Ok(()) => {
                    debug!(%from, to = %target, "Reply delivered");
                    return;
                }
                Err(RuntimeError::ProcessNotFound(_)) => {
                    debug!(%from, to = %target, "Reply target not live, routing to root");
                }
                Err(e) => warn!(%from, to = %target, error = %e, "Reply undeliverable, routing to root"),
            }
        }

        let reply = Message::new(
            message,
            vec![from.as_value(), Pid::ROOT.as_value(), state],
        );
        if let Err(e) = self.deliver(Pid::ROOT, reply).await {
            error!(%from, error = %e, "Reply lost: root process unavailable");
        }
    }

    /// Waits until every claimed delivery has been handled and its process is gone.
    async fn settle(&self) {
        loop {
            let settled = self.shared.settled.notified();
            if !self.has_claims() {
                return;
            }
            // A task that died while holding a claim never deregisters.
            if lock(&self.shared.handles).iter().all(JoinHandle::is_finished) {
                warn!("Claimed process ended without deregistering");
                return;
            }
            let _ = tokio::time::timeout(SETTLE_POLL, settled).await;
        }
    }

    /// Shuts every process down and waits for all of them, root last.
    pub async fn join_all(&self) -> Result<RunReport, RuntimeError> {
        info!("Joining all processes");
        self.settle().await;
        self.shared.shutdown.cancel();

        let mut failure = None;
        let handles = std::mem::take(&mut *lock(&self.shared.handles));
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Process task failed");
                failure.get_or_insert(RuntimeError::TaskFailed(e.to_string()));
            }
        }

        let root = lock(&self.shared.root).take();
        let replies = match root {
            Some(handle) => {
                if let Ok(sender) = self.sender(Pid::ROOT) {
                    let _ = sender.send(ProcessRequest::Stop).await;
                }
                match handle.await {
                    Ok(replies) => replies,
                    Err(e) => {
                        error!(error = %e, "Root task failed");
                        failure.get_or_insert(RuntimeError::TaskFailed(e.to_string()));
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        if let Some(e) = failure {
            return Err(e);
        }

        let mut processes: Vec<ProcessExit> = lock(&self.shared.registry)
            .exits
            .values()
            .filter(|exit| !exit.pid.is_root())
            .cloned()
            .collect();
        processes.sort_by_key(|exit| exit.pid);
        info!(processes = processes.len(), replies = replies.len(), "All processes joined");

        Ok(RunReport {
            processes,
            replies,
            shows: Vec::new(),
        })
    }
}
