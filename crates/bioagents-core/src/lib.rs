//! # Bioagents Core
//!
//! The request-dispatch, failure and provenance layer shared by every
//! bioagent. A bioagent answers biology questions (protein sense
//! disambiguation, drug–target lookup, mutation statistics) over an
//! agent-communication protocol of typed envelopes carrying structured
//! content. This crate owns everything generic about that exchange:
//!
//! - **Content** — head token plus ordered keyword slots, with an
//!   s-expression wire codec
//! - **Envelope** — request / reply / tell performatives with correlation
//! - **Transcoder** — task extraction from an inbound request
//! - **TaskRegistry** — a closed, eagerly validated task → handler map
//! - **Dispatcher** — the exactly-one-reply state machine
//! - **Failure taxonomy** — the closed reply reason vocabulary
//! - **Provenance** — evidence grouping and the `add-provenance` report
//!
//! Domain lookup logic lives in the agent crates behind collaborator
//! traits; this crate never interprets domain payloads.
//!
//! ## Quick start
//!
//! ```rust
//! use bioagents_core::prelude::*;
//!
//! struct Echo;
//!
//! fn respond_echo(_: &mut Echo, content: &Content) -> Result<Response, HandlerError> {
//!     let text = content.value_str("text").unwrap_or_default();
//!     Ok(Content::new("SUCCESS").with_text("text", text).into())
//! }
//!
//! let registry = TaskRegistry::builder().task("ECHO", respond_echo).build().unwrap();
//! let dispatcher = Dispatcher::new("Echo", registry);
//!
//! let mut transport = MemoryTransport::new();
//! let request = Envelope::request(Content::new("ECHO").with_text("text", "hi"));
//! let reply = dispatcher.handle_request(&mut Echo, &mut transport, &request).unwrap();
//! assert_eq!(reply.content.unwrap().head(), "SUCCESS");
//! ```

pub mod content;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod failure;
pub mod provenance;
pub mod registry;
pub mod transport;
pub mod prelude;
