//! Structured message payloads — the content model.
//!
//! A [`Content`] is the payload of an envelope: a head token naming a task or
//! result kind, followed by an ordered mapping of keyword slots. Slot values
//! are bare atoms, quoted strings, nested contents, or ordered lists of
//! contents. Keys are unique within one content; setting an existing key
//! replaces its value in place so unrelated slot order is untouched.
//!
//! The wire shape is an s-expression token sequence:
//! `(HEAD :key value :key value ...)`. Atom-versus-quoted-string distinctions
//! survive a round-trip through [`Content::parse`] and [`Content::render`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParseError;

/// A single slot value inside a [`Content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotValue {
    /// A bare token, e.g. `TRUE` or `MAP2K1`.
    Atom(String),
    /// A quoted string. Stays quoted on the wire.
    Text(String),
    /// A nested content.
    Content(Content),
    /// An ordered list of contents. Element order is significant.
    List(Vec<Content>),
}

impl SlotValue {
    /// The string behind an atom or quoted value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SlotValue::Atom(s) | SlotValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Head token plus ordered keyword slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Content {
    head: String,
    slots: Vec<(String, SlotValue)>,
}

impl Content {
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            slots: Vec::new(),
        }
    }

    /// A content with no head token. The transcoder rejects these as task
    /// requests, but they occur as list entries (e.g. synonym records).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    /// Set a slot, replacing any previous value for the same key.
    pub fn set(&mut self, key: &str, value: SlotValue) {
        let key = normalize_key(key);
        if let Some(entry) = self.slots.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.slots.push((key, value));
        }
    }

    pub fn set_atom(&mut self, key: &str, value: impl Into<String>) {
        self.set(key, SlotValue::Atom(value.into()));
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        self.set(key, SlotValue::Text(value.into()));
    }

    pub fn set_content(&mut self, key: &str, value: Content) {
        self.set(key, SlotValue::Content(value));
    }

    pub fn set_list(&mut self, key: &str, value: Vec<Content>) {
        self.set(key, SlotValue::List(value));
    }

    pub fn with_atom(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_atom(key, value);
        self
    }

    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_text(key, value);
        self
    }

    pub fn with_content(mut self, key: &str, value: Content) -> Self {
        self.set_content(key, value);
        self
    }

    pub fn with_list(mut self, key: &str, value: Vec<Content>) -> Self {
        self.set_list(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&SlotValue> {
        let key = normalize_key(key);
        self.slots.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// The string behind an atom or quoted slot.
    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SlotValue::as_str)
    }

    pub fn atom(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(SlotValue::Atom(s)) => Some(s),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(SlotValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn content(&self, key: &str) -> Option<&Content> {
        match self.get(key) {
            Some(SlotValue::Content(c)) => Some(c),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Content]> {
        match self.get(key) {
            Some(SlotValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Iterate slots in insertion order.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &SlotValue)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as wire text.
    ///
    /// `()` is ambiguous on the wire: a slot-less empty-head content and an
    /// empty list both render to it, and in value position it always parses
    /// back as an empty list. Every payload the agents exchange has either a
    /// head or slots, so nothing relies on the other reading.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_content(self, &mut out);
        out
    }

    /// Parse wire text into a content. The whole input must be one
    /// s-expression; anything after it is an error.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut tokens = Tokenizer::new(input);
        let tok = tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)?;
        let content = match tok {
            Token::LParen(_) => parse_content(&mut tokens)?,
            Token::Atom(pos, _) | Token::Text(pos, _) | Token::RParen(pos) => {
                return Err(ParseError::UnexpectedToken(pos))
            }
        };
        match tokens.next_token()? {
            None => Ok(content),
            Some(_) => Err(ParseError::TrailingInput),
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim_start_matches(':').to_ascii_lowercase()
}

fn render_content(content: &Content, out: &mut String) {
    out.push('(');
    out.push_str(&content.head);
    for (key, value) in &content.slots {
        if !out.ends_with('(') {
            out.push(' ');
        }
        out.push(':');
        out.push_str(key);
        out.push(' ');
        render_value(value, out);
    }
    out.push(')');
}

fn render_value(value: &SlotValue, out: &mut String) {
    match value {
        SlotValue::Atom(s) => out.push_str(s),
        SlotValue::Text(s) => {
            out.push('"');
            for ch in s.chars() {
                if ch == '"' || ch == '\\' {
                    out.push('\\');
                }
                out.push(ch);
            }
            out.push('"');
        }
        SlotValue::Content(c) => render_content(c, out),
        SlotValue::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                render_content(item, out);
            }
            out.push(')');
        }
    }
}

#[derive(Debug)]
enum Token {
    LParen(usize),
    RParen(usize),
    Atom(usize, String),
    Text(usize, String),
}

struct Tokenizer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
        let (pos, ch) = match self.chars.next() {
            Some(pair) => pair,
            None => return Ok(None),
        };
        match ch {
            '(' => Ok(Some(Token::LParen(pos))),
            ')' => Ok(Some(Token::RParen(pos))),
            '"' => {
                let mut text = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '"')) => return Ok(Some(Token::Text(pos, text))),
                        Some((esc_pos, '\\')) => match self.chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => return Err(ParseError::UnterminatedString(esc_pos)),
                        },
                        Some((_, other)) => text.push(other),
                        None => return Err(ParseError::UnterminatedString(pos)),
                    }
                }
            }
            _ => {
                let mut end = pos + ch.len_utf8();
                while let Some(&(next_pos, next_ch)) = self.chars.peek() {
                    if next_ch.is_whitespace() || next_ch == '(' || next_ch == ')' || next_ch == '"'
                    {
                        break;
                    }
                    self.chars.next();
                    end = next_pos + next_ch.len_utf8();
                }
                Ok(Some(Token::Atom(pos, self.input[pos..end].to_string())))
            }
        }
    }
}

/// Parse a content body after its opening paren was consumed.
fn parse_content(tokens: &mut Tokenizer<'_>) -> Result<Content, ParseError> {
    let mut content = Content::empty();
    match tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)? {
        Token::RParen(_) => return Ok(content),
        Token::Atom(_, word) => {
            if let Some(stripped) = word.strip_prefix(':') {
                // No head; the first token is already a keyword.
                let value = parse_value(tokens)?;
                content.set(stripped, value);
            } else {
                content.head = word;
            }
        }
        Token::Text(pos, _) | Token::LParen(pos) => return Err(ParseError::ExpectedKeyword(pos)),
    }
    finish_content(tokens, content)
}

/// Consume `:key value` pairs until the closing paren.
fn finish_content(tokens: &mut Tokenizer<'_>, mut content: Content) -> Result<Content, ParseError> {
    loop {
        let key = match tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)? {
            Token::RParen(_) => return Ok(content),
            Token::Atom(pos, word) => match word.strip_prefix(':') {
                Some(stripped) => stripped.to_string(),
                None => return Err(ParseError::ExpectedKeyword(pos)),
            },
            Token::Text(pos, _) | Token::LParen(pos) => {
                return Err(ParseError::ExpectedKeyword(pos))
            }
        };
        let value = parse_value(tokens)?;
        content.set(&key, value);
    }
}

fn parse_value(tokens: &mut Tokenizer<'_>) -> Result<SlotValue, ParseError> {
    match tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)? {
        Token::Atom(_, word) => Ok(SlotValue::Atom(word)),
        Token::Text(_, text) => Ok(SlotValue::Text(text)),
        Token::LParen(_) => parse_group(tokens),
        Token::RParen(pos) => Err(ParseError::UnexpectedToken(pos)),
    }
}

/// Parse a parenthesized value: a nested content, or a list of contents when
/// the group's own first token opens another paren.
fn parse_group(tokens: &mut Tokenizer<'_>) -> Result<SlotValue, ParseError> {
    match tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)? {
        Token::RParen(_) => Ok(SlotValue::List(Vec::new())),
        Token::LParen(_) => {
            let mut items = vec![parse_content(tokens)?];
            loop {
                match tokens.next_token()?.ok_or(ParseError::UnexpectedEnd)? {
                    Token::RParen(_) => return Ok(SlotValue::List(items)),
                    Token::LParen(_) => items.push(parse_content(tokens)?),
                    Token::Atom(pos, _) | Token::Text(pos, _) => {
                        return Err(ParseError::UnexpectedToken(pos))
                    }
                }
            }
        }
        Token::Atom(_, word) => {
            let mut content = Content::empty();
            if let Some(stripped) = word.strip_prefix(':') {
                let value = parse_value(tokens)?;
                content.set(stripped, value);
            } else {
                content.head = word;
            }
            finish_content(tokens, content).map(SlotValue::Content)
        }
        Token::Text(pos, _) => Err(ParseError::UnexpectedToken(pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut content = Content::new("SUCCESS");
        content.set_atom("is-activating", "FALSE");
        content.set_text("note", "first");
        content.set_atom("is-activating", "TRUE");

        let keys: Vec<&str> = content.slots().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["is-activating", "note"]);
        assert_eq!(content.atom("is-activating"), Some("TRUE"));
    }

    #[test]
    fn keys_are_case_insensitive_and_colon_blind() {
        let mut content = Content::new("FAILURE");
        content.set_atom(":Reason", "UNKNOWN_TASK");
        assert_eq!(content.atom("reason"), Some("UNKNOWN_TASK"));
    }

    #[test]
    fn atoms_and_strings_survive_round_trip() {
        let content = Content::new("PHOSPHORYLATION-ACTIVATING")
            .with_text("target", "MAP2K1")
            .with_atom("residue", "S")
            .with_atom("position", "222");
        let wire = content.render();
        assert_eq!(
            wire,
            "(PHOSPHORYLATION-ACTIVATING :target \"MAP2K1\" :residue S :position 222)"
        );
        assert_eq!(Content::parse(&wire).unwrap(), content);
    }

    #[test]
    fn nested_content_and_lists_round_trip() {
        let member = Content::new("term")
            .with_text("name", "MAP2K1")
            .with_atom("ont-type", "ONT::PROTEIN");
        let content = Content::new("SUCCESS")
            .with_list("members", vec![member.clone(), member])
            .with_content("preferred", Content::new("term").with_text("name", "BRAF"));
        let parsed = Content::parse(&content.render()).unwrap();
        assert_eq!(parsed, content);
        assert_eq!(parsed.list("members").unwrap().len(), 2);
    }

    #[test]
    fn string_escapes() {
        let content = Content::new("add-provenance").with_text("html", "say \"hi\" \\ bye");
        let parsed = Content::parse(&content.render()).unwrap();
        assert_eq!(parsed.text("html"), Some("say \"hi\" \\ bye"));
    }

    #[test]
    fn empty_parens_parse_to_empty_head() {
        let content = Content::parse("()").unwrap();
        assert_eq!(content.head(), "");
        assert_eq!(content.slots().count(), 0);
    }

    #[test]
    fn headless_slot_record_round_trips() {
        let entry = Content::empty().with_text("name", "MEK1");
        let parsed = Content::parse(&entry.render()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn list_order_is_preserved() {
        let items: Vec<Content> = ["a", "b", "c"]
            .iter()
            .map(|h| Content::new(*h))
            .collect();
        let content = Content::new("SUCCESS").with_list("matches", items.clone());
        let parsed = Content::parse(&content.render()).unwrap();
        assert_eq!(parsed.list("matches").unwrap(), items.as_slice());
    }

    #[test]
    fn empty_parens_in_value_position_parse_as_empty_list() {
        let content = Content::new("SUCCESS").with_content("inner", Content::empty());
        assert_eq!(content.render(), "(SUCCESS :inner ())");
        let parsed = Content::parse(&content.render()).unwrap();
        assert_eq!(parsed.list("inner"), Some(&[][..]));
        // Same wire text as an empty list; the list reading wins.
        let as_list = Content::new("SUCCESS").with_list("inner", Vec::new());
        assert_eq!(Content::parse(&as_list.render()).unwrap(), as_list);
    }

    #[test]
    fn unterminated_string_is_rejected() {
        assert!(matches!(
            Content::parse("(FAILURE :description \"oops)"),
            Err(ParseError::UnterminatedString(_))
        ));
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert_eq!(
            Content::parse("(SUCCESS) extra"),
            Err(ParseError::TrailingInput)
        );
    }

    #[test]
    fn value_without_keyword_is_rejected() {
        assert!(matches!(
            Content::parse("(SUCCESS stray)"),
            Err(ParseError::ExpectedKeyword(_))
        ));
    }

    #[test]
    fn serde_round_trip() {
        let content = Content::new("SUCCESS").with_atom("is-activating", "TRUE");
        let json = serde_json::to_string(&content).unwrap();
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }
}
