//! End-to-end dispatch tests for the MSA agent: one envelope in, one
//! correlated reply out, plus the provenance notification on success.

use bioagents_agents::msa::{InMemoryLiterature, MsaModule};
use bioagents_core::prelude::*;

fn setup() -> (Dispatcher<MsaModule<InMemoryLiterature>>, MsaModule<InMemoryLiterature>) {
    let dispatcher = MsaModule::dispatcher().unwrap();
    let agent = MsaModule::new(InMemoryLiterature::curated());
    (dispatcher, agent)
}

fn request(head: &str, slots: &[(&str, &str)]) -> Envelope {
    let mut content = Content::new(head);
    for (key, value) in slots {
        content.set_text(key, *value);
    }
    Envelope::request(content)
}

#[test]
fn activating_query_replies_success_then_one_provenance_tell() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let req = request(
        "PHOSPHORYLATION-ACTIVATING",
        &[("target", "MAP2K1"), ("site", "S-222")],
    );

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    let content = reply.content.as_ref().unwrap();
    assert_eq!(content.head(), "SUCCESS");
    assert_eq!(content.atom("is-activating"), Some("TRUE"));
    assert_eq!(reply.in_reply_to, req.reply_with);

    // Reply first, then exactly one provenance notification.
    assert_eq!(transport.sent.len(), 2);
    assert_eq!(transport.sent[0].performative, Performative::Reply);
    assert_eq!(transport.provenance_tells().count(), 1);
    let tell = transport.provenance_tells().next().unwrap();
    let html = tell.content.as_ref().unwrap().text("html").unwrap();
    assert!(html.contains("Supporting evidence from the MSA"));
    assert!(html.contains("PMID7957065"));
}

#[test]
fn missing_target_fails_without_provenance() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let req = request("PHOSPHORYLATION-ACTIVATING", &[("site", "S-222")]);

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    let content = reply.content.as_ref().unwrap();
    assert_eq!(content.head(), "FAILURE");
    assert_eq!(content.atom("reason"), Some("MISSING_TARGET"));
    assert_eq!(transport.sent.len(), 1);
    assert_eq!(transport.provenance_tells().count(), 0);
}

#[test]
fn unregistered_head_is_unknown_task_at_the_dispatcher() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let req = request("BOGUS-ACTIVATING", &[("target", "MAP2K1")]);

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    let content = reply.content.as_ref().unwrap();
    assert_eq!(content.atom("reason"), Some("UNKNOWN_TASK"));
}

#[test]
fn uncurated_site_is_missing_mechanism() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let req = request(
        "PHOSPHORYLATION-ACTIVATING",
        &[("target", "MAP2K1"), ("site", "Y-999")],
    );

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    let content = reply.content.as_ref().unwrap();
    assert_eq!(content.atom("reason"), Some("MISSING_MECHANISM"));
    assert_eq!(transport.provenance_tells().count(), 0);
}

#[test]
fn find_relations_replies_success_then_one_provenance_tell() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let mut content = Content::new("FIND-RELATIONS-FROM-LITERATURE");
    content.set_atom("type", "Phosphorylation");
    content.set_text("source", "None");
    content.set_text("target", "MAPK1");
    let req = Envelope::request(content);

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    assert_eq!(reply.content.as_ref().unwrap().head(), "SUCCESS");
    assert_eq!(transport.provenance_tells().count(), 1);
    let tell = transport.provenance_tells().next().unwrap();
    let html = tell.content.as_ref().unwrap().text("html").unwrap();
    assert!(html.contains("relations involving MAPK1"));
}

#[test]
fn confirm_relation_replies_success_then_one_provenance_tell() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let mut content = Content::new("CONFIRM-RELATION-FROM-LITERATURE");
    content.set_atom("type", "phosphorylation");
    content.set_text("source", "MAP2K1");
    content.set_text("target", "MAPK1");
    let req = Envelope::request(content);

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    let reply_content = reply.content.as_ref().unwrap();
    assert_eq!(reply_content.head(), "SUCCESS");
    assert_eq!(reply_content.atom("some-relations-exist"), Some("TRUE"));
    assert_eq!(transport.sent.len(), 2);
    assert_eq!(transport.sent[0].performative, Performative::Reply);
    assert_eq!(transport.provenance_tells().count(), 1);
}

#[test]
fn wire_round_trip_through_the_dispatcher() {
    let (dispatcher, mut agent) = setup();
    let mut transport = MemoryTransport::new();
    let raw = r#"(request :reply-with m7 :content (PHOSPHORYLATION-ACTIVATING :target "MAPK1" :residue T :position 185))"#;
    let req = Envelope::parse(raw).unwrap();

    let reply = dispatcher
        .handle_request(&mut agent, &mut transport, &req)
        .unwrap();

    assert_eq!(reply.in_reply_to, Some(MessageId::from("m7")));
    let rendered = reply.render();
    assert!(rendered.contains(":in-reply-to m7"));
    assert!(rendered.contains(":is-activating TRUE"));
}
