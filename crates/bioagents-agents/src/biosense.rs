//! BioSense — the sense-disambiguation agent.
//!
//! Resolves what a biological term refers to (protein, family, complex),
//! whether it belongs to a category or collection, and what its synonyms
//! are. All biological knowledge sits behind the [`SenseOntology`]
//! collaborator; this module only maps request slots to collaborator calls
//! and collaborator errors to the agent's domain failure codes.

use std::collections::HashMap;

use anyhow::anyhow;
use bioagents_core::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_AGENT: FailureReason = FailureReason::Domain("INVALID_AGENT");
pub const UNKNOWN_CATEGORY: FailureReason = FailureReason::Domain("UNKNOWN_CATEGORY");
pub const INVALID_COLLECTION: FailureReason = FailureReason::Domain("INVALID_COLLECTION");
pub const COLLECTION_NOT_FAMILY_OR_COMPLEX: FailureReason =
    FailureReason::Domain("COLLECTION_NOT_FAMILY_OR_COMPLEX");

/// Domain conditions the ontology collaborator can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenseError {
    #[error("term does not ground to a known agent")]
    InvalidAgent,
    #[error("unknown category")]
    UnknownCategory,
    #[error("term does not ground to a known collection")]
    InvalidCollection,
    #[error("collection is neither a family nor a complex")]
    NotFamilyOrComplex,
}

/// One resolved sense of a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermGrounding {
    /// Identifier of the term occurrence being grounded, when known.
    pub term_id: Option<String>,
    pub name: String,
    /// Ontology type, e.g. `ONT::PROTEIN` or `ONT::PROTEIN-FAMILY`.
    pub ont_type: String,
    /// Database references as (namespace, id) pairs, e.g. `("HGNC", "6840")`.
    pub ids: Vec<(String, String)>,
    /// Human-facing links as (name, url) pairs.
    pub urls: Vec<(String, String)>,
}

/// One alternative reading in an ambiguity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseReading {
    pub name: String,
    pub ont_type: String,
    pub ids: Vec<(String, String)>,
}

/// A term with two plausible readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub term_id: String,
    pub preferred: SenseReading,
    pub alternative: SenseReading,
}

/// Result of disambiguating a term mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grounding {
    pub agents: Vec<TermGrounding>,
    pub ambiguities: Vec<Ambiguity>,
}

/// Ontology lookup collaborator. Read-only.
pub trait SenseOntology {
    fn choose_sense(&self, term: &str) -> Result<Grounding, SenseError>;
    fn in_category(&self, term: &str, category: &str) -> Result<bool, SenseError>;
    fn is_member(&self, term: &str, collection: &str) -> Result<bool, SenseError>;
    fn members(&self, collection: &str) -> Result<Vec<TermGrounding>, SenseError>;
    fn synonyms(&self, term: &str) -> Result<Vec<String>, SenseError>;
}

/// The BioSense agent.
pub struct BioSenseModule<O: SenseOntology> {
    ontology: O,
}

impl<O: SenseOntology> BioSenseModule<O> {
    pub const NAME: &'static str = "BioSense";

    pub fn new(ontology: O) -> Self {
        Self { ontology }
    }

    pub fn dispatcher() -> Result<Dispatcher<Self>, RegistryError> {
        let registry = TaskRegistry::builder()
            .task("CHOOSE-SENSE", Self::respond_choose_sense)
            .task("CHOOSE-SENSE-CATEGORY", Self::respond_choose_sense_category)
            .task(
                "CHOOSE-SENSE-IS-MEMBER",
                Self::respond_choose_sense_is_member,
            )
            .task(
                "CHOOSE-SENSE-WHAT-MEMBER",
                Self::respond_choose_sense_what_member,
            )
            .task("GET-SYNONYMS", Self::respond_get_synonyms)
            .build()?;
        Ok(Dispatcher::new(Self::NAME, registry))
    }

    /// Return response content to a choose-sense request.
    fn respond_choose_sense(&mut self, content: &Content) -> Result<Response, HandlerError> {
        let term = required_slot(content, "ekb-term")?;
        let grounding = match self.ontology.choose_sense(term) {
            Ok(grounding) => grounding,
            Err(SenseError::InvalidAgent) => return Ok(failure(INVALID_AGENT).into()),
            Err(other) => return Err(anyhow!(other).into()),
        };
        let mut msg = Content::new("SUCCESS");
        if !grounding.agents.is_empty() {
            let kagents = grounding.agents.iter().map(grounding_content).collect();
            msg.set_list("agents", kagents);
        }
        if !grounding.ambiguities.is_empty() {
            let entries = grounding.ambiguities.iter().map(ambiguity_content).collect();
            msg.set_list("ambiguities", entries);
        }
        Ok(msg.into())
    }

    /// Return response content to a choose-sense-category request.
    fn respond_choose_sense_category(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let term = required_slot(content, "ekb-term")?;
        let category = required_slot(content, "category")?;
        let msg = match self.ontology.in_category(term, category) {
            Ok(in_category) => {
                Content::new("SUCCESS").with_atom("in-category", bool_atom(in_category))
            }
            Err(SenseError::InvalidAgent) => failure(INVALID_AGENT),
            Err(SenseError::UnknownCategory) => failure(UNKNOWN_CATEGORY),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }

    /// Return response content to a choose-sense-is-member request.
    fn respond_choose_sense_is_member(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let term = required_slot(content, "ekb-term")?;
        let collection = required_slot(content, "collection")?;
        let msg = match self.ontology.is_member(term, collection) {
            Ok(is_member) => Content::new("SUCCESS").with_atom("is-member", bool_atom(is_member)),
            Err(SenseError::InvalidCollection) => failure(INVALID_COLLECTION),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }

    /// Return response content to a choose-sense-what-member request.
    fn respond_choose_sense_what_member(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let collection = required_slot(content, "collection")?;
        let msg = match self.ontology.members(collection) {
            Ok(members) => {
                let kagents = members.iter().map(grounding_content).collect();
                Content::new("SUCCESS").with_list("members", kagents)
            }
            Err(SenseError::InvalidCollection) => failure(INVALID_COLLECTION),
            Err(SenseError::NotFamilyOrComplex) => failure(COLLECTION_NOT_FAMILY_OR_COMPLEX),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }

    /// Respond to a query looking for synonyms of a protein.
    fn respond_get_synonyms(&mut self, content: &Content) -> Result<Response, HandlerError> {
        let entity = required_slot(content, "entity")?;
        let msg = match self.ontology.synonyms(entity) {
            Ok(synonyms) => {
                let entries = synonyms
                    .into_iter()
                    .map(|s| Content::empty().with_text("name", s))
                    .collect();
                Content::new("SUCCESS").with_list("synonyms", entries)
            }
            Err(SenseError::InvalidAgent) => failure(INVALID_AGENT),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }
}

/// A missing required slot is not a domain condition here: it surfaces as
/// INTERNAL_FAILURE, the way the original module crashed and recovered.
fn required_slot<'c>(content: &'c Content, key: &str) -> Result<&'c str, HandlerError> {
    content
        .value_str(key)
        .ok_or_else(|| anyhow!("request {} has no {key} slot", content.head()).into())
}

fn bool_atom(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn joined_ids(ids: &[(String, String)]) -> String {
    ids.iter()
        .map(|(ns, id)| format!("{ns}:{id}"))
        .collect::<Vec<_>>()
        .join("|")
}

fn grounding_content(grounding: &TermGrounding) -> Content {
    let mut kagent = match &grounding.term_id {
        Some(term_id) => Content::new(term_id.clone()),
        None => Content::empty(),
    };
    kagent.set_text("name", grounding.name.clone());
    kagent.set_text("ids", joined_ids(&grounding.ids));
    let urls = grounding
        .urls
        .iter()
        .map(|(name, url)| {
            Content::empty()
                .with_text("name", name.clone())
                .with_text("dblink", url.clone())
        })
        .collect();
    kagent.set_list("id-urls", urls);
    kagent.set_atom("ont-type", grounding.ont_type.clone());
    kagent
}

fn reading_content(reading: &SenseReading) -> Content {
    Content::new("term")
        .with_atom("ont-type", reading.ont_type.clone())
        .with_text("ids", joined_ids(&reading.ids))
        .with_text("name", reading.name.clone())
}

fn ambiguity_content(ambiguity: &Ambiguity) -> Content {
    Content::new(ambiguity.term_id.clone())
        .with_content("preferred", reading_content(&ambiguity.preferred))
        .with_content("alternative", reading_content(&ambiguity.alternative))
}

/// In-memory ontology tables, for tests and offline runs.
#[derive(Debug, Default)]
pub struct StaticOntology {
    groundings: HashMap<String, TermGrounding>,
    ambiguities: HashMap<String, Ambiguity>,
    /// category name -> member names
    categories: HashMap<String, Vec<String>>,
    /// collection name -> member names; only families and complexes appear
    collections: HashMap<String, Vec<String>>,
    synonyms: HashMap<String, Vec<String>>,
}

impl StaticOntology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_protein(&mut self, name: &str, hgnc: &str, uniprot: &str) {
        self.groundings.insert(
            name.to_uppercase(),
            TermGrounding {
                term_id: None,
                name: name.to_string(),
                ont_type: "ONT::PROTEIN".to_string(),
                ids: vec![
                    ("HGNC".to_string(), hgnc.to_string()),
                    ("UP".to_string(), uniprot.to_string()),
                ],
                urls: vec![(
                    "HGNC".to_string(),
                    format!("https://identifiers.org/hgnc:{hgnc}"),
                )],
            },
        );
    }

    pub fn add_family(&mut self, name: &str, fplx: &str, members: &[&str]) {
        self.groundings.insert(
            name.to_uppercase(),
            TermGrounding {
                term_id: None,
                name: name.to_string(),
                ont_type: "ONT::PROTEIN-FAMILY".to_string(),
                ids: vec![("FPLX".to_string(), fplx.to_string())],
                urls: Vec::new(),
            },
        );
        self.collections.insert(
            name.to_uppercase(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn add_category(&mut self, category: &str, members: &[&str]) {
        self.categories.insert(
            category.to_lowercase(),
            members.iter().map(|m| m.to_uppercase()).collect(),
        );
    }

    pub fn add_ambiguity(&mut self, term: &str, ambiguity: Ambiguity) {
        self.ambiguities.insert(term.to_uppercase(), ambiguity);
    }

    pub fn add_synonyms(&mut self, name: &str, synonyms: &[&str]) {
        self.synonyms.insert(
            name.to_uppercase(),
            synonyms.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// A small curated slice of the protein ontology.
    pub fn curated() -> Self {
        let mut ontology = Self::new();
        ontology.add_protein("MAP2K1", "6840", "Q02750");
        ontology.add_protein("MAPK1", "6871", "P28482");
        ontology.add_protein("BRAF", "1097", "P15056");
        ontology.add_protein("TP53", "11998", "P04637");
        ontology.add_family("MEK", "MEK", &["MAP2K1", "MAP2K2"]);
        ontology.add_family("ERK", "ERK", &["MAPK1", "MAPK3"]);
        ontology.add_category("kinase activity", &["MAP2K1", "MAPK1", "BRAF"]);
        ontology.add_category("transcription factor", &["TP53"]);
        ontology.add_synonyms("MAP2K1", &["MEK1", "MKK1", "PRKMK1"]);
        ontology
    }

    fn grounding_for(&self, term: &str) -> Result<&TermGrounding, SenseError> {
        self.groundings
            .get(&term.to_uppercase())
            .ok_or(SenseError::InvalidAgent)
    }
}

impl SenseOntology for StaticOntology {
    fn choose_sense(&self, term: &str) -> Result<Grounding, SenseError> {
        let mut grounding = Grounding::default();
        if let Ok(agent) = self.grounding_for(term) {
            grounding.agents.push(agent.clone());
        }
        if let Some(ambiguity) = self.ambiguities.get(&term.to_uppercase()) {
            grounding.ambiguities.push(ambiguity.clone());
        }
        Ok(grounding)
    }

    fn in_category(&self, term: &str, category: &str) -> Result<bool, SenseError> {
        self.grounding_for(term)?;
        let members = self
            .categories
            .get(&category.to_lowercase())
            .ok_or(SenseError::UnknownCategory)?;
        Ok(members.iter().any(|m| m.eq_ignore_ascii_case(term)))
    }

    fn is_member(&self, term: &str, collection: &str) -> Result<bool, SenseError> {
        let members = self
            .collections
            .get(&collection.to_uppercase())
            .ok_or(SenseError::InvalidCollection)?;
        Ok(members.iter().any(|m| m.eq_ignore_ascii_case(term)))
    }

    fn members(&self, collection: &str) -> Result<Vec<TermGrounding>, SenseError> {
        let grounding = self
            .groundings
            .get(&collection.to_uppercase())
            .ok_or(SenseError::InvalidCollection)?;
        if grounding.ont_type == "ONT::PROTEIN" {
            return Err(SenseError::NotFamilyOrComplex);
        }
        let names = self
            .collections
            .get(&collection.to_uppercase())
            .ok_or(SenseError::NotFamilyOrComplex)?;
        Ok(names
            .iter()
            .filter_map(|name| self.groundings.get(&name.to_uppercase()).cloned())
            .collect())
    }

    fn synonyms(&self, term: &str) -> Result<Vec<String>, SenseError> {
        self.grounding_for(term)?;
        Ok(self
            .synonyms
            .get(&term.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}
