//! The closed failure vocabulary and the FAILURE payload shape.
//!
//! Every FAILURE reply carries exactly one reason code and, optionally, a
//! free-text description. No other slots are defined for FAILURE payloads.

use std::fmt;

use crate::content::Content;

/// Reason codes a FAILURE reply may carry.
///
/// The first four are produced by the dispatcher itself; agents declare
/// their domain codes (e.g. `MISSING_TARGET`) through [`FailureReason::Domain`]
/// and map their own domain conditions to them — the dispatcher never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The request envelope could not be decoded.
    InvalidRequest,
    /// The task identifier is not in this agent's registry.
    UnknownTask,
    /// The registry declares the task but has no bound handler.
    InvalidTask,
    /// The handler failed in an undeclared way. Detail stays server-side.
    InternalFailure,
    /// An agent-declared domain code.
    Domain(&'static str),
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InvalidRequest => "INVALID_REQUEST",
            FailureReason::UnknownTask => "UNKNOWN_TASK",
            FailureReason::InvalidTask => "INVALID_TASK",
            FailureReason::InternalFailure => "INTERNAL_FAILURE",
            FailureReason::Domain(code) => code,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Build a `(FAILURE :reason CODE)` payload.
pub fn failure(reason: FailureReason) -> Content {
    Content::new("FAILURE").with_atom("reason", reason.code())
}

/// Build a `(FAILURE :reason CODE :description "...")` payload.
pub fn failure_with(reason: FailureReason, description: impl Into<String>) -> Content {
    failure(reason).with_text("description", description)
}
