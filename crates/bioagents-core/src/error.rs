//! Error types for the dispatch core.
//!
//! The taxonomy follows the reply vocabulary: a `ParseError` becomes
//! `INVALID_REQUEST`, a routing miss becomes `UNKNOWN_TASK`, a registry
//! inconsistency becomes `INVALID_TASK`, and any unexpected handler error
//! becomes `INTERNAL_FAILURE`. The one deliberate exception is
//! [`Escalation`], which the dispatcher lets through unconverted.

use thiserror::Error;

/// Failures while decoding an inbound message.
///
/// All of these surface externally as a `FAILURE`/`INVALID_REQUEST` reply;
/// the variant only matters for the server-side log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The envelope carries no content payload.
    #[error("envelope carries no content payload")]
    MissingContent,
    /// The content payload has no head token.
    #[error("content has no head token")]
    MissingHead,
    /// Unbalanced or misplaced token in the wire text.
    #[error("unexpected token at byte {0}")]
    UnexpectedToken(usize),
    /// A keyword slot was expected (a token starting with `:`).
    #[error("expected keyword slot at byte {0}")]
    ExpectedKeyword(usize),
    /// A quoted string never closed.
    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),
    /// The message ended mid-expression.
    #[error("unexpected end of message")]
    UnexpectedEnd,
    /// Extra tokens after a complete message.
    #[error("trailing input after message")]
    TrailingInput,
    /// The envelope head is not a known performative.
    #[error("unknown performative '{0}'")]
    UnknownPerformative(String),
}

/// A domain condition that must reach the caller unconverted.
///
/// This is the single escape hatch past the dispatcher: everything else a
/// handler returns is turned into a reply, but an escalation propagates so
/// the caller can tell "this domain condition needs my handling" apart from
/// "the agent infrastructure is broken".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Escalation {
    /// Short machine-readable condition code, e.g. `DRUG_NOT_FOUND`.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl Escalation {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// What a handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Propagates past the dispatcher untouched.
    #[error(transparent)]
    Escalation(#[from] Escalation),
    /// Anything else. Converted to `FAILURE`/`INTERNAL_FAILURE` at the
    /// boundary; the cause is kept for the local log only.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Errors detected while building a task registry.
///
/// These fire at agent construction, never at request time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The same task identifier was declared twice.
    #[error("task {0} declared twice")]
    Duplicate(String),
    /// A declared task has no bound handler.
    #[error("task {0} declared without a bound handler")]
    Unbound(String),
}

/// Failure to hand an envelope to the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Send(e.to_string())
    }
}

/// Why a dispatch produced no reply.
///
/// Every generic failure is recovered into a reply before this type is ever
/// constructed; dispatch only errors when a handler escalates or the
/// transport itself refuses the reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Escalation(#[from] Escalation),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
