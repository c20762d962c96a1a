//! End-to-end dispatch tests for the BioSense agent.

use bioagents_agents::biosense::{
    Ambiguity, BioSenseModule, SenseReading, StaticOntology,
};
use bioagents_core::prelude::*;

fn setup() -> (Dispatcher<BioSenseModule<StaticOntology>>, BioSenseModule<StaticOntology>) {
    let dispatcher = BioSenseModule::dispatcher().unwrap();
    let agent = BioSenseModule::new(StaticOntology::curated());
    (dispatcher, agent)
}

fn dispatch(
    dispatcher: &Dispatcher<BioSenseModule<StaticOntology>>,
    agent: &mut BioSenseModule<StaticOntology>,
    content: Content,
) -> Content {
    let mut transport = MemoryTransport::new();
    let reply = dispatcher
        .handle_request(agent, &mut transport, &Envelope::request(content))
        .unwrap();
    assert_eq!(transport.sent.len(), 1); // BioSense never sends provenance
    reply.content.unwrap()
}

#[test]
fn choose_sense_reports_grounding_slots() {
    let (dispatcher, mut agent) = setup();
    let reply = dispatch(
        &dispatcher,
        &mut agent,
        Content::new("CHOOSE-SENSE").with_text("ekb-term", "MAPK1"),
    );
    assert_eq!(reply.head(), "SUCCESS");
    let agents = reply.list("agents").unwrap();
    assert_eq!(agents[0].text("ids"), Some("HGNC:6871|UP:P28482"));
    assert_eq!(agents[0].atom("ont-type"), Some("ONT::PROTEIN"));
}

#[test]
fn choose_sense_reports_ambiguities() {
    let mut ontology = StaticOntology::curated();
    ontology.add_ambiguity(
        "ER",
        Ambiguity {
            term_id: "V1".to_string(),
            preferred: SenseReading {
                name: "ESR1".to_string(),
                ont_type: "ONT::PROTEIN".to_string(),
                ids: vec![("HGNC".to_string(), "3467".to_string())],
            },
            alternative: SenseReading {
                name: "endoplasmic reticulum".to_string(),
                ont_type: "ONT::CELL-PART".to_string(),
                ids: vec![("GO".to_string(), "0005783".to_string())],
            },
        },
    );
    let dispatcher = BioSenseModule::dispatcher().unwrap();
    let mut agent = BioSenseModule::new(ontology);
    let reply = dispatch(
        &dispatcher,
        &mut agent,
        Content::new("CHOOSE-SENSE").with_text("ekb-term", "ER"),
    );
    let ambiguities = reply.list("ambiguities").unwrap();
    assert_eq!(ambiguities.len(), 1);
    let preferred = ambiguities[0].content("preferred").unwrap();
    assert_eq!(preferred.text("name"), Some("ESR1"));
    let alternative = ambiguities[0].content("alternative").unwrap();
    assert_eq!(alternative.atom("ont-type"), Some("ONT::CELL-PART"));
}

#[test]
fn lowercase_task_head_is_normalized() {
    let (dispatcher, mut agent) = setup();
    let reply = dispatch(
        &dispatcher,
        &mut agent,
        Content::new("get-synonyms").with_text("entity", "MAP2K1"),
    );
    assert_eq!(reply.head(), "SUCCESS");
    assert_eq!(reply.list("synonyms").unwrap().len(), 3);
}

#[test]
fn domain_codes_survive_dispatch() {
    let (dispatcher, mut agent) = setup();
    let reply = dispatch(
        &dispatcher,
        &mut agent,
        Content::new("CHOOSE-SENSE-WHAT-MEMBER").with_text("collection", "TP53"),
    );
    assert_eq!(reply.head(), "FAILURE");
    assert_eq!(
        reply.atom("reason"),
        Some("COLLECTION_NOT_FAMILY_OR_COMPLEX")
    );
}

#[test]
fn missing_required_slot_is_internal_failure() {
    let (dispatcher, mut agent) = setup();
    let reply = dispatch(&dispatcher, &mut agent, Content::new("CHOOSE-SENSE"));
    assert_eq!(reply.head(), "FAILURE");
    assert_eq!(reply.atom("reason"), Some("INTERNAL_FAILURE"));
    // The missing-slot detail stays server-side.
    assert!(reply.text("description").is_none());
}

#[test]
fn unknown_task_names_fail_closed() {
    let (dispatcher, mut agent) = setup();
    let reply = dispatch(
        &dispatcher,
        &mut agent,
        Content::new("CHOOSE-EVERYTHING").with_text("ekb-term", "MAPK1"),
    );
    assert_eq!(reply.atom("reason"), Some("UNKNOWN_TASK"));
}
