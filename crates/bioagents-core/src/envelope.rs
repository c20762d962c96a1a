//! Typed message envelopes — the performative layer.
//!
//! An [`Envelope`] wraps one [`Content`] payload in a performative type and
//! the correlation bookkeeping a reply needs. Envelopes are created at the
//! transport boundary on receipt, or by the dispatch layer on send, and are
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::content::Content;
use crate::error::ParseError;

/// The message classes of the agent-communication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Performative {
    /// Asks an agent to perform a task and answer.
    Request,
    /// Answers a prior request.
    Reply,
    /// One-way notification, e.g. a provenance report.
    Tell,
}

impl Performative {
    pub fn as_str(&self) -> &'static str {
        match self {
            Performative::Request => "request",
            Performative::Reply => "reply",
            Performative::Tell => "tell",
        }
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Performative {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "request" => Ok(Performative::Request),
            "reply" => Ok(Performative::Reply),
            "tell" => Ok(Performative::Tell),
            other => Err(ParseError::UnknownPerformative(other.to_string())),
        }
    }
}

/// Correlation identifier carried in `:reply-with` / `:in-reply-to`.
///
/// Inbound ids are opaque strings from the peer; fresh ids are v4 UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message on the wire: a performative, correlation ids, and a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub performative: Performative,
    /// Id the sender expects back in a reply's `:in-reply-to`.
    pub reply_with: Option<MessageId>,
    /// Id of the request this message answers.
    pub in_reply_to: Option<MessageId>,
    pub content: Option<Content>,
}

impl Envelope {
    /// A fresh request expecting a correlated reply.
    pub fn request(content: Content) -> Self {
        Self {
            performative: Performative::Request,
            reply_with: Some(MessageId::fresh()),
            in_reply_to: None,
            content: Some(content),
        }
    }

    /// A one-way notification.
    pub fn tell(content: Content) -> Self {
        Self {
            performative: Performative::Tell,
            reply_with: None,
            in_reply_to: None,
            content: Some(content),
        }
    }

    /// Wrap an outcome payload into the reply correlated to `request`.
    ///
    /// This is the whole response builder: no interpretation of the payload,
    /// just the performative and the correlation id.
    pub fn reply_to(request: &Envelope, content: Content) -> Self {
        Self {
            performative: Performative::Reply,
            reply_with: None,
            in_reply_to: request.reply_with.clone(),
            content: Some(content),
        }
    }

    /// Render as wire text, e.g.
    /// `(reply :in-reply-to m1 :content (SUCCESS :is-activating TRUE))`.
    pub fn render(&self) -> String {
        let mut outer = Content::new(self.performative.as_str());
        if let Some(id) = &self.reply_with {
            outer.set_atom("reply-with", id.as_str());
        }
        if let Some(id) = &self.in_reply_to {
            outer.set_atom("in-reply-to", id.as_str());
        }
        if let Some(content) = &self.content {
            outer.set_content("content", content.clone());
        }
        outer.render()
    }

    /// Parse wire text into an envelope.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let outer = Content::parse(input)?;
        let performative = outer.head().parse()?;
        Ok(Self {
            performative,
            reply_with: outer.value_str("reply-with").map(MessageId::from),
            in_reply_to: outer.value_str("in-reply-to").map(MessageId::from),
            content: outer.content("content").cloned(),
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_correlates_with_request() {
        let request = Envelope::request(Content::new("CHOOSE-SENSE"));
        let reply = Envelope::reply_to(&request, Content::new("SUCCESS"));
        assert_eq!(reply.performative, Performative::Reply);
        assert_eq!(reply.in_reply_to, request.reply_with);
        assert!(reply.reply_with.is_none());
    }

    #[test]
    fn envelope_round_trip() {
        let request = Envelope::request(
            Content::new("IS-DRUG-TARGET")
                .with_text("drug", "Vemurafenib")
                .with_text("target", "BRAF"),
        );
        let parsed = Envelope::parse(&request.render()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn unknown_performative_is_rejected() {
        assert!(matches!(
            Envelope::parse("(shout :content (HELLO))"),
            Err(ParseError::UnknownPerformative(_))
        ));
    }

    #[test]
    fn envelope_without_content_parses() {
        let parsed = Envelope::parse("(request :reply-with m7)").unwrap();
        assert!(parsed.content.is_none());
        assert_eq!(parsed.reply_with, Some(MessageId::from("m7")));
    }
}
