//! Bioagents Agents — the domain agents of the dialogue system.
//!
//! Three agents, each a struct owning its collaborators plus a
//! [`Dispatcher`](bioagents_core::prelude::Dispatcher) built from its task
//! registry:
//!
//! - [`biosense`] — protein sense and grounding questions
//! - [`dtda`] — disease, target and drug lookups
//! - [`msa`] — mechanism search over literature statements
//!
//! Agents are single-threaded: one agent instance processes one request at
//! a time, and a slow collaborator simply delays that instance. Collaborator
//! seams are traits (`SenseOntology`, `LiteratureStore`, `CancerGenomics`)
//! so tests and offline runs can swap in in-memory tables.

pub mod biosense;
pub mod dtda;
pub mod msa;
