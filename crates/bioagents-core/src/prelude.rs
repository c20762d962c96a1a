//! Bioagents Core Prelude — convenient imports for common usage.
//!
//! ```rust
//! use bioagents_core::prelude::*;
//! ```

pub use crate::content::{Content, SlotValue};
pub use crate::dispatch::{transcode, Dispatcher, Response, TaskRequest};
pub use crate::envelope::{Envelope, MessageId, Performative};
pub use crate::error::{
    DispatchError, Escalation, HandlerError, ParseError, RegistryError, TransportError,
};
pub use crate::failure::{failure, failure_with, FailureReason};
pub use crate::provenance::{
    provenance_content, EvidenceItem, Supported, DEFAULT_STATEMENT_LIMIT,
};
pub use crate::registry::{Handler, TaskRegistry, TaskRegistryBuilder};
pub use crate::transport::{ClosedTransport, MemoryTransport, Transport};
