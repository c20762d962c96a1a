//! Outbound message seam.
//!
//! The dispatcher talks to the outside world through [`Transport`], so agents
//! run the same against a socket, a pipe, or the in-memory recorder the
//! integration tests inspect.

use crate::envelope::{Envelope, Performative};
use crate::error::TransportError;

/// One-way outbound channel for envelopes.
pub trait Transport {
    fn send(&mut self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Records every sent envelope. The tests' output log.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    pub sent: Vec<Envelope>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `tell` envelopes sent so far.
    pub fn tells(&self) -> impl Iterator<Item = &Envelope> {
        self.sent
            .iter()
            .filter(|e| e.performative == Performative::Tell)
    }

    /// The `add-provenance` notifications sent so far.
    pub fn provenance_tells(&self) -> impl Iterator<Item = &Envelope> {
        self.tells().filter(|e| {
            e.content
                .as_ref()
                .map(|c| c.head() == "add-provenance")
                .unwrap_or(false)
        })
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        self.sent.push(envelope);
        Ok(())
    }
}

/// Rejects every send. Stands in for a dead peer in tests of the
/// reply-path transport failure.
#[derive(Debug, Default)]
pub struct ClosedTransport;

impl Transport for ClosedTransport {
    fn send(&mut self, _envelope: Envelope) -> Result<(), TransportError> {
        Err(TransportError::Send("transport closed".to_string()))
    }
}
