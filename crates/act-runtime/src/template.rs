//! # Actor Templates
//!
//! A template is the shared prototype behind every process spawned from one `actor`
//! definition: its initial state and one compiled handler per message name.
//!
//! Processes hold an `Arc<ActorTemplate>`; the template never holds process state.

use crate::error::{HandlerError, RuntimeError};
use crate::eval;
use crate::message::{Message, Pid};
use crate::module::{ActionDef, ActorDef};
use crate::token::ROOT_NAME;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a successful handler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// New state to commit.
    pub state: i64,
    /// Value of the reply parameter, if the action declares one.
    pub reply_to: Option<i64>,
}

/// A compiled handler: `(message, current state) -> outcome`.
pub type ActionFn = Arc<dyn Fn(&Message, i64) -> Result<Outcome, HandlerError> + Send + Sync>;

pub struct ActorTemplate {
    name: String,
    initial_state: i64,
    actions: HashMap<String, ActionFn>,
}

impl ActorTemplate {
    /// Compiles an `actor` definition.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidInitialState`] if the state token is not an integer.
    pub fn from_def(def: &ActorDef) -> Result<Self, RuntimeError> {
        let initial_state = parse_state(&def.name, &def.initial_state.text)?;
        let actions = def
            .actions
            .iter()
            .map(|action| (action.message.clone(), compile_action(action.clone())))
            .collect();
        Ok(Self {
            name: def.name.clone(),
            initial_state,
            actions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> i64 {
        self.initial_state
    }

    pub fn has_action(&self, message: &str) -> bool {
        self.actions.contains_key(message)
    }

    /// Runs the handler for `message` against `state`.
    ///
    /// Returns `None` when the template has no action for the message name.
    pub fn handle(&self, message: &Message, state: i64) -> Option<Result<Outcome, HandlerError>> {
        self.actions
            .get(&message.id)
            .map(|action| action(message, state))
    }
}

impl fmt::Debug for ActorTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("ActorTemplate")
            .field("name", &self.name)
            .field("initial_state", &self.initial_state)
            .field("actions", &actions)
            .finish()
    }
}

pub(crate) fn parse_state(actor: &str, text: &str) -> Result<i64, RuntimeError> {
    text.parse::<i64>()
        .map_err(|_| RuntimeError::InvalidInitialState {
            actor: actor.to_string(),
            value: text.to_string(),
        })
}

/// Builds the closure for one action. The definition is moved in, so every closure
/// owns its own copy.
fn compile_action(def: ActionDef) -> ActionFn {
    Arc::new(move |message: &Message, state: i64| {
        if message.args.len() != def.params.len() {
            return Err(HandlerError::ArityMismatch {
                message: def.message.clone(),
                expected: def.params.len(),
                got: message.args.len(),
            });
        }

        let mut locals: HashMap<String, i64> = def
            .params
            .iter()
            .cloned()
            .zip(message.args.iter().copied())
            .collect();
        locals.insert(ROOT_NAME.to_string(), Pid::ROOT.as_value());

        let reply_to = match def.reply_param.as_deref() {
            None => None,
            Some(ROOT_NAME) => Some(Pid::ROOT.as_value()),
            Some(param) => match def.params.iter().position(|p| p == param) {
                Some(index) => Some(message.args[index]),
                None => {
                    return Err(HandlerError::MissingReplyArgument {
                        message: def.message.clone(),
                        param: param.to_string(),
                    })
                }
            },
        };

        let state = eval::eval(&def.body, state, &locals)?;
        Ok(Outcome { state, reply_to })
    })
}
