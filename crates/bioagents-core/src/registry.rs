//! Per-agent task registry.
//!
//! Each agent declares its closed set of task identifiers at construction
//! and binds every one to a handler function there and then, so a declared
//! task without a handler fails at startup instead of at first use. Task
//! identifiers are case-insensitive and unique per agent.

use std::collections::HashMap;

use crate::content::Content;
use crate::dispatch::Response;
use crate::error::{HandlerError, RegistryError};

/// A task handler bound at registry construction.
///
/// Handlers receive the agent state and the full request content (head
/// included, so an agent may re-validate its own head) and return either an
/// outcome payload or a [`HandlerError`].
pub type Handler<A> = fn(&mut A, &Content) -> Result<Response, HandlerError>;

/// Closed set of supported task identifiers with their bound handlers.
#[derive(Debug)]
pub struct TaskRegistry<A> {
    declared: Vec<String>,
    handlers: HashMap<String, Handler<A>>,
}

impl<A> TaskRegistry<A> {
    pub fn builder() -> TaskRegistryBuilder<A> {
        TaskRegistryBuilder {
            declared: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn is_supported(&self, task_id: &str) -> bool {
        let task_id = task_id.to_ascii_uppercase();
        self.declared.iter().any(|t| *t == task_id)
    }

    pub fn handler_for(&self, task_id: &str) -> Option<Handler<A>> {
        self.handlers.get(&task_id.to_ascii_uppercase()).copied()
    }

    /// Declared task identifiers, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Assemble a registry from raw parts, skipping builder validation.
    /// Only the dispatcher tests use this, to reach the defensive
    /// declared-but-unbound branch.
    pub(crate) fn from_parts(declared: Vec<String>, handlers: HashMap<String, Handler<A>>) -> Self {
        Self { declared, handlers }
    }
}

/// Builder validating the declaration set eagerly in [`build`](Self::build).
pub struct TaskRegistryBuilder<A> {
    declared: Vec<String>,
    handlers: HashMap<String, Handler<A>>,
}

impl<A> TaskRegistryBuilder<A> {
    /// Declare a supported task identifier without binding it yet.
    pub fn declare(mut self, task_id: &str) -> Self {
        self.declared.push(task_id.to_ascii_uppercase());
        self
    }

    /// Bind a handler to an already-declared task identifier.
    pub fn bind(mut self, task_id: &str, handler: Handler<A>) -> Self {
        self.handlers.insert(task_id.to_ascii_uppercase(), handler);
        self
    }

    /// Declare and bind in one step.
    pub fn task(self, task_id: &str, handler: Handler<A>) -> Self {
        self.declare(task_id).bind(task_id, handler)
    }

    /// Validate and build. Fails for duplicate declarations and for any
    /// declared task with no bound handler.
    pub fn build(self) -> Result<TaskRegistry<A>, RegistryError> {
        for (i, task) in self.declared.iter().enumerate() {
            if self.declared[..i].contains(task) {
                return Err(RegistryError::Duplicate(task.clone()));
            }
            if !self.handlers.contains_key(task) {
                return Err(RegistryError::Unbound(task.clone()));
            }
        }
        Ok(TaskRegistry {
            declared: self.declared,
            handlers: self.handlers,
        })
    }
}
