//! Request dispatch — turning one inbound request into exactly one reply.
//!
//! The dispatcher is the shared state machine of every agent: decode the
//! request, route it to the registered handler, convert the outcome into a
//! correlated reply, and send any provenance notification the handler
//! attached — strictly after the reply, never instead of it.
//!
//! Generic failures are fully recovered here and always yield a reply. The
//! one deliberate exception is [`Escalation`]: a handler that escalates is
//! observed by the caller as that escalation, not as `INTERNAL_FAILURE`.

use tracing::{debug, error, warn};

use crate::content::Content;
use crate::envelope::Envelope;
use crate::error::{DispatchError, Escalation, HandlerError, ParseError};
use crate::failure::{failure, FailureReason};
use crate::registry::TaskRegistry;
use crate::transport::Transport;

/// A parsed request: the case-normalized task identifier plus its content.
#[derive(Debug)]
pub struct TaskRequest<'a> {
    pub task_id: String,
    pub content: &'a Content,
}

/// Extract the task identifier and payload from an inbound envelope.
///
/// Pure; the dispatcher converts any failure here into
/// `FAILURE`/`INVALID_REQUEST` before any handler runs.
pub fn transcode(envelope: &Envelope) -> Result<TaskRequest<'_>, ParseError> {
    let content = envelope.content.as_ref().ok_or(ParseError::MissingContent)?;
    if content.head().is_empty() {
        return Err(ParseError::MissingHead);
    }
    Ok(TaskRequest {
        task_id: content.head().to_ascii_uppercase(),
        content,
    })
}

/// A handler outcome: the reply payload plus an optional provenance
/// notification to send once the reply is out.
#[derive(Debug)]
pub struct Response {
    pub content: Content,
    pub provenance: Option<Content>,
}

impl Response {
    pub fn of(content: Content) -> Self {
        Self {
            content,
            provenance: None,
        }
    }

    pub fn with_provenance(content: Content, provenance: Content) -> Self {
        Self {
            content,
            provenance: Some(provenance),
        }
    }
}

impl From<Content> for Response {
    fn from(content: Content) -> Self {
        Response::of(content)
    }
}

/// The generic request dispatcher, parameterized by an agent's capability
/// set (its task registry) and state type.
pub struct Dispatcher<A> {
    name: String,
    registry: TaskRegistry<A>,
}

impl<A> Dispatcher<A> {
    pub fn new(name: impl Into<String>, registry: TaskRegistry<A>) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }

    /// The agent name used in logs and provenance headers.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &TaskRegistry<A> {
        &self.registry
    }

    /// Handle one request end to end: exactly one reply is sent, then any
    /// provenance notification. Returns the reply for inspection.
    ///
    /// A handler failure is terminal for the request; the handler is never
    /// re-invoked.
    pub fn handle_request(
        &self,
        agent: &mut A,
        transport: &mut dyn Transport,
        request: &Envelope,
    ) -> Result<Envelope, DispatchError> {
        let outcome = match transcode(request) {
            Err(err) => {
                error!(agent = %self.name, %err, "could not get task from request");
                Response::of(failure(FailureReason::InvalidRequest))
            }
            Ok(task) => self.respond_to(agent, &task)?,
        };

        let reply = Envelope::reply_to(request, outcome.content);
        transport.send(reply.clone())?;

        if let Some(provenance) = outcome.provenance {
            // Best effort only; a lost notification never fails the request.
            if let Err(err) = transport.send(Envelope::tell(provenance)) {
                warn!(agent = %self.name, %err, "dropping provenance notification");
            }
        }
        Ok(reply)
    }

    /// Route a decoded request to its handler and map the outcome.
    fn respond_to(&self, agent: &mut A, task: &TaskRequest<'_>) -> Result<Response, Escalation> {
        if !self.registry.is_supported(&task.task_id) {
            error!(agent = %self.name, task = %task.task_id, "task not in registry");
            return Ok(failure(FailureReason::UnknownTask).into());
        }
        let handler = match self.registry.handler_for(&task.task_id) {
            Some(handler) => handler,
            None => {
                // Declared but unbound: a registry inconsistency, not a
                // caller mistake.
                error!(agent = %self.name, task = %task.task_id, "no handler bound for declared task");
                return Ok(failure(FailureReason::InvalidTask).into());
            }
        };
        debug!(agent = %self.name, task = %task.task_id, "dispatching");
        match handler(agent, task.content) {
            Ok(response) => Ok(response),
            Err(HandlerError::Escalation(escalation)) => Err(escalation),
            Err(HandlerError::Unexpected(cause)) => {
                // Full detail stays server-side; only the generic code
                // crosses the boundary.
                error!(
                    agent = %self.name,
                    task = %task.task_id,
                    cause = ?cause,
                    "handler failed unexpectedly"
                );
                Ok(failure(FailureReason::InternalFailure).into())
            }
        }
    }
}
