//! # Environment
//!
//! The driver: walks a [`Module`] once, top to bottom, and turns each item into
//! scheduler calls.
//!
//! - `ActorDef` compiles and caches a template under its name.
//! - `Spawn` starts a process from a cached template, optionally overriding its state.
//! - `Send` resolves the target and arguments, then delivers one message.
//! - `Show` asks a process for its state.
//!
//! Any structural error stops the walk. Processes already started are still shut down
//! and joined before the error is returned.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::message::{Message, Pid, Snapshot};
use crate::module::{ActorDef, Item, Module, SendStmt, ShowStmt, SpawnStmt};
use crate::scheduler::{RunReport, Scheduler};
use crate::template::{parse_state, ActorTemplate};
use crate::token::{Token, TokenKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Environment {
    module: Module,
    scheduler: Scheduler,
    templates: HashMap<String, Arc<ActorTemplate>>,
    /// Last pid spawned under each name, kept after the process is gone for `show`.
    spawned: HashMap<String, Pid>,
    shows: Vec<Snapshot>,
}

impl Environment {
    pub fn new(module: Module, config: RuntimeConfig) -> Self {
        Self::with_scheduler(module, Scheduler::new(config))
    }

    pub fn with_scheduler(module: Module, scheduler: Scheduler) -> Self {
        Self {
            module,
            scheduler,
            templates: HashMap::new(),
            spawned: HashMap::new(),
            shows: Vec::new(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs the module to completion and reports what every process ended with.
    pub async fn exec(mut self) -> Result<RunReport, RuntimeError> {
        self.scheduler.start_root_process().await?;

        let module = std::mem::take(&mut self.module);
        let walked = self.walk(&module).await;
        if let Err(e) = &walked {
            warn!(error = %e, "Aborting run");
        }

        let joined = self.scheduler.join_all().await;
        walked?;
        let mut report = joined?;
        report.shows = self.shows;
        Ok(report)
    }

    async fn walk(&mut self, module: &Module) -> Result<(), RuntimeError> {
        for item in &module.items {
            match item {
                Item::ActorDef(def) => self.define(def)?,
                Item::Spawn(stmt) => {
                    self.spawn(stmt).await?;
                }
                Item::Send(stmt) => self.send(stmt).await?,
                Item::Show(stmt) => self.show(stmt).await?,
            }
        }
        Ok(())
    }

    fn define(&mut self, def: &ActorDef) -> Result<(), RuntimeError> {
        if self.templates.contains_key(&def.name) {
            return Err(RuntimeError::DuplicateActorName(def.name.clone()));
        }
        let template = ActorTemplate::from_def(def)?;
        info!(actor = %def.name, state = template.initial_state(), ?template, "Actor defined");
        self.templates.insert(def.name.clone(), Arc::new(template));
        Ok(())
    }

    async fn spawn(&mut self, stmt: &SpawnStmt) -> Result<Pid, RuntimeError> {
        let (actor, rest) = stmt
            .scope
            .split_first()
            .ok_or_else(|| RuntimeError::EmptySpawnScope(stmt.name.clone()))?;
        let template = self
            .templates
            .get(&actor.text)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedActor(actor.text.clone()))?;

        let state = match rest {
            [] => template.initial_state(),
            [state] => parse_state(template.name(), &state.text)?,
            [state, extra @ ..] => {
                warn!(name = %stmt.name, ignored = extra.len(), "Extra tokens in spawn scope");
                parse_state(template.name(), &state.text)?
            }
        };

        let pid = self
            .scheduler
            .start_process(stmt.name.clone(), template, state)
            .ready()
            .await?;
        self.spawned.insert(stmt.name.clone(), pid);
        Ok(pid)
    }

    /// A target that is gone or has already taken its message fails the same way,
    /// named as written in the program.
    async fn send(&mut self, stmt: &SendStmt) -> Result<(), RuntimeError> {
        let not_found = |e| match e {
            RuntimeError::ProcessNotFound(_) => {
                RuntimeError::ProcessNotFound(stmt.target.text.clone())
            }
            e => e,
        };
        let target = self.resolve_target(&stmt.target).map_err(not_found)?;
        let args = stmt
            .args
            .iter()
            .map(|arg| self.resolve_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let message = Message::new(stmt.message.clone(), args);
        debug!(to = %stmt.target.text, %target, ?message, "Send");
        self.scheduler.deliver(target, message).await.map_err(not_found)
    }

    async fn show(&mut self, stmt: &ShowStmt) -> Result<(), RuntimeError> {
        // Finished processes are still shown, from their exit record.
        let pid = match self.resolve_target(&stmt.target) {
            Ok(pid) => pid,
            Err(e) => match stmt.target.kind {
                TokenKind::Lit => Pid::parse(&stmt.target.text).ok_or(e)?,
                _ => *self.spawned.get(&stmt.target.text).ok_or(e)?,
            },
        };
        let snapshot = self.scheduler.show(pid).await?;
        info!(%snapshot, "Show");
        self.shows.push(snapshot);
        Ok(())
    }

    /// `@`, a numeric pid, or the name of a live process.
    fn resolve_target(&self, token: &Token) -> Result<Pid, RuntimeError> {
        if token.is_root_ref() {
            return Ok(Pid::ROOT);
        }
        match token.kind {
            TokenKind::Lit => {
                let pid = Pid::parse(&token.text)
                    .ok_or_else(|| RuntimeError::ProcessNotFound(token.text.clone()))?;
                Ok(self.scheduler.lookup_by_pid(pid)?.pid)
            }
            _ => Ok(self.scheduler.lookup_by_name(&token.text)?.pid),
        }
    }

    /// `@` and process names resolve to pids; literals to their value.
    fn resolve_arg(&self, token: &Token) -> Result<i64, RuntimeError> {
        if token.is_root_ref() {
            return Ok(Pid::ROOT.as_value());
        }
        match token.kind {
            TokenKind::Lit => token
                .text
                .parse::<i64>()
                .map_err(|_| RuntimeError::InvalidArgument(token.text.clone())),
            TokenKind::Ident => Ok(self.scheduler.lookup_by_name(&token.text)?.pid.as_value()),
            _ => Err(RuntimeError::InvalidArgument(token.text.clone())),
        }
    }
}
