//! MSA — the mechanism-search agent.
//!
//! Answers mechanism questions from a literature-statement collaborator:
//! whether a phosphorylation at a given site is known to activate a protein,
//! which relations of a given type involve a protein, and whether a specific
//! relation between two proteins has literature support. A positive answer
//! is followed by one provenance notification listing the supporting
//! evidence.
//!
//! The handler re-validates its own head instead of trusting the router:
//! driven directly with a foreign head (as the dialogue system's tests do),
//! it answers `MISSING_MECHANISM` or `UNKNOWN_ACTION` rather than relying
//! on the dispatcher's `UNKNOWN_TASK`.

use bioagents_core::prelude::*;
use serde::{Deserialize, Serialize};

pub const MISSING_TARGET: FailureReason = FailureReason::Domain("MISSING_TARGET");
pub const MISSING_MECHANISM: FailureReason = FailureReason::Domain("MISSING_MECHANISM");
pub const UNKNOWN_ACTION: FailureReason = FailureReason::Domain("UNKNOWN_ACTION");

/// An activating-modification statement found in the literature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStatement {
    /// Gene symbol of the modified protein.
    pub target: String,
    /// Modified residue, e.g. `S`.
    pub residue: Option<String>,
    /// Site position, e.g. `222`.
    pub position: Option<String>,
    pub evidence: Vec<EvidenceItem>,
}

impl Supported for ActivityStatement {
    fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    fn describe(&self) -> String {
        match (&self.residue, &self.position) {
            (Some(residue), Some(position)) => format!(
                "Phosphorylation at {residue}{position} activates {}.",
                self.target
            ),
            _ => format!("Phosphorylation activates {}.", self.target),
        }
    }
}

/// A directed mechanistic relation found in the literature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationStatement {
    /// Relation kind, e.g. `Phosphorylation`.
    pub relation: String,
    /// Gene symbol of the acting protein, when the literature names one.
    pub source: Option<String>,
    /// Gene symbol of the affected protein.
    pub target: String,
    pub evidence: Vec<EvidenceItem>,
}

impl Supported for RelationStatement {
    fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    fn describe(&self) -> String {
        match &self.source {
            Some(source) => format!("{} of {} by {source}.", self.relation, self.target),
            None => format!("{} of {}.", self.relation, self.target),
        }
    }
}

/// Literature lookup collaborator.
///
/// Implementations are read-only; a slow one delays the whole agent
/// instance, which is accepted (see the concurrency notes in the crate doc).
pub trait LiteratureStore {
    /// Statements where phosphorylation of `target` — at the given site,
    /// when one is specified — is activating.
    fn activating_phosphorylations(
        &self,
        target: &str,
        residue: Option<&str>,
        position: Option<&str>,
    ) -> Vec<ActivityStatement>;

    /// Statements of the given relation kind, filtered by whichever
    /// endpoints are specified.
    fn relations(
        &self,
        relation: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Vec<RelationStatement>;
}

/// In-memory statement table, for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryLiterature {
    statements: Vec<ActivityStatement>,
    relations: Vec<RelationStatement>,
}

impl InMemoryLiterature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, statement: ActivityStatement) {
        self.statements.push(statement);
    }

    pub fn add_relation(&mut self, statement: RelationStatement) {
        self.relations.push(statement);
    }

    /// A handful of well-known activating phosphorylations, so the agent
    /// answers something useful without a database service.
    pub fn curated() -> Self {
        let mut store = Self::new();
        store.add(ActivityStatement {
            target: "MAP2K1".to_string(),
            residue: Some("S".to_string()),
            position: Some("222".to_string()),
            evidence: vec![EvidenceItem {
                text: Some(
                    "Phosphorylation of MEK1 at serine 222 is required for activation".to_string(),
                ),
                source_api: Some("reach".to_string()),
                source_id: None,
                pmid: Some("7957065".to_string()),
            }],
        });
        store.add(ActivityStatement {
            target: "MAPK1".to_string(),
            residue: Some("T".to_string()),
            position: Some("185".to_string()),
            evidence: vec![EvidenceItem {
                text: Some("ERK2 is activated by phosphorylation on Thr-185".to_string()),
                source_api: Some("reach".to_string()),
                source_id: None,
                pmid: Some("1540184".to_string()),
            }],
        });
        store.add_relation(RelationStatement {
            relation: "Phosphorylation".to_string(),
            source: Some("MAP2K1".to_string()),
            target: "MAPK1".to_string(),
            evidence: vec![EvidenceItem {
                text: Some("MEK1 phosphorylates ERK2 on Thr-183 and Tyr-185".to_string()),
                source_api: Some("reach".to_string()),
                source_id: None,
                pmid: Some("8388392".to_string()),
            }],
        });
        store.add_relation(RelationStatement {
            relation: "Phosphorylation".to_string(),
            source: Some("BRAF".to_string()),
            target: "MAP2K1".to_string(),
            evidence: vec![EvidenceItem {
                text: Some("B-Raf phosphorylates MEK1 on serines 218 and 222".to_string()),
                source_api: Some("reach".to_string()),
                source_id: None,
                pmid: Some("9069255".to_string()),
            }],
        });
        store
    }
}

impl LiteratureStore for InMemoryLiterature {
    fn activating_phosphorylations(
        &self,
        target: &str,
        residue: Option<&str>,
        position: Option<&str>,
    ) -> Vec<ActivityStatement> {
        self.statements
            .iter()
            .filter(|s| {
                s.target.eq_ignore_ascii_case(target)
                    && residue
                        .map(|r| s.residue.as_deref().is_some_and(|sr| sr.eq_ignore_ascii_case(r)))
                        .unwrap_or(true)
                    && position
                        .map(|p| s.position.as_deref() == Some(p))
                        .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    fn relations(
        &self,
        relation: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Vec<RelationStatement> {
        self.relations
            .iter()
            .filter(|s| {
                s.relation.eq_ignore_ascii_case(relation)
                    && source
                        .map(|q| s.source.as_deref().is_some_and(|ss| ss.eq_ignore_ascii_case(q)))
                        .unwrap_or(true)
                    && target
                        .map(|q| s.target.eq_ignore_ascii_case(q))
                        .unwrap_or(true)
            })
            .cloned()
            .collect()
    }
}

/// The MSA agent: one registered task, one literature collaborator.
pub struct MsaModule<L: LiteratureStore> {
    literature: L,
}

impl<L: LiteratureStore> MsaModule<L> {
    pub const NAME: &'static str = "MSA";

    pub fn new(literature: L) -> Self {
        Self { literature }
    }

    pub fn dispatcher() -> Result<Dispatcher<Self>, RegistryError> {
        let registry = TaskRegistry::builder()
            .task(
                "PHOSPHORYLATION-ACTIVATING",
                Self::respond_phosphorylation_activating,
            )
            .task(
                "FIND-RELATIONS-FROM-LITERATURE",
                Self::respond_find_relations_from_literature,
            )
            .task(
                "CONFIRM-RELATION-FROM-LITERATURE",
                Self::respond_confirm_relation_from_literature,
            )
            .build()?;
        Ok(Dispatcher::new(Self::NAME, registry))
    }

    /// Respond to a query regarding an activating modification.
    pub fn respond_phosphorylation_activating(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let head = content.head().to_ascii_uppercase();
        if head.is_empty() {
            return Ok(failure(UNKNOWN_ACTION).into());
        }
        match head.rsplit_once('-') {
            Some((mechanism, "ACTIVATING")) if mechanism == "PHOSPHORYLATION" => {}
            _ => return Ok(failure(MISSING_MECHANISM).into()),
        }

        let target = match content.value_str("target") {
            Some(target) if !target.is_empty() => target.to_string(),
            _ => return Ok(failure(MISSING_TARGET).into()),
        };
        let (residue, position) = site_of(content);

        let statements = self.literature.activating_phosphorylations(
            &target,
            residue.as_deref(),
            position.as_deref(),
        );
        if statements.is_empty() {
            return Ok(failure(MISSING_MECHANISM).into());
        }

        let site = match (&residue, &position) {
            (Some(residue), Some(position)) => format!("{target}-{residue}{position}"),
            _ => target.clone(),
        };
        let provenance = provenance_content(
            Self::NAME,
            &statements,
            &format!("phosphorylation at {site} being activating"),
            DEFAULT_STATEMENT_LIMIT,
        );
        let reply = Content::new("SUCCESS").with_atom("is-activating", "TRUE");
        Ok(Response::with_provenance(reply, provenance))
    }

    /// Respond to an open-ended relation search: type plus at least one of
    /// source/target.
    pub fn respond_find_relations_from_literature(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let relation = match content.value_str("type") {
            Some(relation) if !relation.is_empty() => relation.to_string(),
            _ => return Ok(failure(MISSING_MECHANISM).into()),
        };
        let source = endpoint_of(content, "source");
        let target = endpoint_of(content, "target");
        if source.is_none() && target.is_none() {
            return Ok(failure(MISSING_TARGET).into());
        }

        let statements = self
            .literature
            .relations(&relation, source.as_deref(), target.as_deref());
        if statements.is_empty() {
            return Ok(failure(MISSING_MECHANISM).into());
        }

        let subject = target.or(source).unwrap_or_default();
        let provenance = provenance_content(
            Self::NAME,
            &statements,
            &format!("relations involving {subject}"),
            DEFAULT_STATEMENT_LIMIT,
        );
        let entries = statements.iter().map(relation_content).collect();
        let reply = Content::new("SUCCESS")
            .with_atom("num-relations", statements.len().to_string())
            .with_list("relations", entries);
        Ok(Response::with_provenance(reply, provenance))
    }

    /// Respond to a yes/no question about one specific relation.
    pub fn respond_confirm_relation_from_literature(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let relation = match content.value_str("type") {
            Some(relation) if !relation.is_empty() => relation.to_string(),
            _ => return Ok(failure(MISSING_MECHANISM).into()),
        };
        let source = endpoint_of(content, "source");
        let target = endpoint_of(content, "target");
        if source.is_none() && target.is_none() {
            return Ok(failure(MISSING_TARGET).into());
        }

        let statements = self
            .literature
            .relations(&relation, source.as_deref(), target.as_deref());
        if statements.is_empty() {
            // A confirmed negative is an answer, not a failure.
            let reply = Content::new("SUCCESS")
                .with_atom("some-relations-exist", "FALSE")
                .with_atom("num-relations", "0");
            return Ok(reply.into());
        }

        let pair = match (&source, &target) {
            (Some(source), Some(target)) => format!("{source} and {target}"),
            _ => source.clone().or(target.clone()).unwrap_or_default(),
        };
        let provenance = provenance_content(
            Self::NAME,
            &statements,
            &format!("the relation between {pair}"),
            DEFAULT_STATEMENT_LIMIT,
        );
        let reply = Content::new("SUCCESS")
            .with_atom("some-relations-exist", "TRUE")
            .with_atom("num-relations", statements.len().to_string());
        Ok(Response::with_provenance(reply, provenance))
    }
}

/// An endpoint slot; the dialogue system sends the placeholder `None` for an
/// unspecified endpoint, which counts as absent.
fn endpoint_of(content: &Content, key: &str) -> Option<String> {
    content
        .value_str(key)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"))
        .map(str::to_string)
}

fn relation_content(statement: &RelationStatement) -> Content {
    let mut entry = Content::empty()
        .with_atom("type", statement.relation.clone())
        .with_text("target", statement.target.clone());
    if let Some(source) = &statement.source {
        entry.set_text("source", source.clone());
    }
    entry
}

/// Site slots: separate `:residue`/`:position`, or combined `:site "S-222"`.
fn site_of(content: &Content) -> (Option<String>, Option<String>) {
    let residue = content.value_str("residue").map(str::to_string);
    let position = content.value_str("position").map(str::to_string);
    if residue.is_some() || position.is_some() {
        return (residue, position);
    }
    match content.value_str("site").and_then(|s| s.split_once('-')) {
        Some((residue, position)) => (Some(residue.to_string()), Some(position.to_string())),
        None => (None, None),
    }
}
