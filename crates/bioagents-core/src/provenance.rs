//! Provenance assembly — the secondary evidence notification.
//!
//! After a successful lookup, an agent reports the supporting evidence in a
//! best-effort `tell` so the dialogue system can show where a conclusion
//! came from. Evidence items are grouped by the literature identifier that
//! owns them, deduplicated within each group, and rendered into one HTML
//! body wrapped in an `(add-provenance :html "...")` payload.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::content::Content;

/// Default cap on how many statements one report draws evidence from.
pub const DEFAULT_STATEMENT_LIMIT: usize = 5;

const PUBMED_URL: &str = "https://www.ncbi.nlm.nih.gov/pubmed/";

/// One piece of supporting evidence, derived read-only from a domain
/// statement supplied by a lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Literal supporting text, quoted verbatim when present.
    pub text: Option<String>,
    /// Name of the source api that produced this item.
    pub source_api: Option<String>,
    /// Identifier of the entry in the source database.
    pub source_id: Option<String>,
    /// Owning literature identifier (PubMed id).
    pub pmid: Option<String>,
}

/// A domain statement that can support a conclusion.
///
/// Lookup collaborators implement this for their statement types; the
/// paraphrase is only consulted for items with neither literal text nor a
/// source-database entry.
pub trait Supported {
    fn evidence(&self) -> &[EvidenceItem];

    /// Natural-language paraphrase of the owning statement.
    fn describe(&self) -> String;
}

/// Assemble one `(add-provenance :html ...)` payload for a conclusion.
///
/// At most `limit` statements are consulted, in input order. Groups are
/// rendered in pmid order; items missing a pmid form their own group.
/// Repeated identical display text within a group collapses to one entry.
pub fn provenance_content<S: Supported>(
    agent_name: &str,
    statements: &[S],
    for_what: &str,
    limit: usize,
) -> Content {
    let mut groups: BTreeMap<Option<String>, BTreeSet<String>> = BTreeMap::new();
    for statement in statements.iter().take(limit) {
        for item in statement.evidence() {
            let entry = if let Some(text) = &item.text {
                format!("<i>'{text}'</i>")
            } else if let Some(source_id) = &item.source_id {
                format!(
                    "Database entry in '{}': {source_id}",
                    item.source_api.as_deref().unwrap_or("unknown")
                )
            } else {
                format!(
                    "Evidence from '{}': {}",
                    item.source_api.as_deref().unwrap_or("unknown"),
                    statement.describe()
                )
            };
            groups.entry(item.pmid.clone()).or_default().insert(entry);
        }
    }

    let blocks: Vec<String> = groups
        .iter()
        .map(|(pmid, entries)| {
            let items: Vec<String> = entries.iter().map(|e| format!("<li>{e}</li>")).collect();
            let label = match pmid {
                Some(pmid) => format!(
                    "Found in <a href={PUBMED_URL}{pmid} target=\"_blank\">PMID{pmid}</a>:"
                ),
                None => "Found without a literature reference:".to_string(),
            };
            format!("{label}\n<ul>{}</ul>", items.join("\n"))
        })
        .collect();

    let body = format!(
        "<h4>Supporting evidence from the {agent_name} for {for_what}:</h4>\n{}<hr>",
        blocks.join("\n")
    );
    Content::new("add-provenance").with_text("html", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Activation {
        sentence: String,
        evidence: Vec<EvidenceItem>,
    }

    impl Supported for Activation {
        fn evidence(&self) -> &[EvidenceItem] {
            &self.evidence
        }

        fn describe(&self) -> String {
            self.sentence.clone()
        }
    }

    fn text_item(pmid: &str, text: &str) -> EvidenceItem {
        EvidenceItem {
            text: Some(text.to_string()),
            pmid: Some(pmid.to_string()),
            ..EvidenceItem::default()
        }
    }

    #[test]
    fn duplicate_text_collapses_within_a_group() {
        let statement = Activation {
            sentence: "X activates Y.".to_string(),
            evidence: vec![
                text_item("12345", "X activates Y"),
                text_item("12345", "X activates Y"),
                text_item("12345", "X phosphorylates Y"),
            ],
        };
        let content = provenance_content("MSA", &[statement], "activation of Y", 5);
        let html = content.text("html").unwrap();

        assert_eq!(html.matches("<i>'X activates Y'</i>").count(), 1);
        assert_eq!(html.matches("PMID12345").count(), 1);
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn grouping_is_order_independent_for_duplicates() {
        let forward = Activation {
            sentence: String::new(),
            evidence: vec![
                text_item("11111", "A binds B"),
                text_item("22222", "B binds C"),
            ],
        };
        let reversed = Activation {
            sentence: String::new(),
            evidence: vec![
                text_item("22222", "B binds C"),
                text_item("11111", "A binds B"),
            ],
        };
        let a = provenance_content("MSA", &[forward], "binding", 5);
        let b = provenance_content("MSA", &[reversed], "binding", 5);
        assert_eq!(a.text("html"), b.text("html"));
    }

    #[test]
    fn display_priority_text_then_source_then_paraphrase() {
        let statement = Activation {
            sentence: "MAP2K1 phosphorylates MAPK1.".to_string(),
            evidence: vec![
                EvidenceItem {
                    text: Some("MEK1 activates ERK2".to_string()),
                    source_api: Some("reach".to_string()),
                    source_id: Some("R1".to_string()),
                    pmid: Some("33333".to_string()),
                },
                EvidenceItem {
                    source_api: Some("biopax".to_string()),
                    source_id: Some("BP77".to_string()),
                    pmid: Some("33333".to_string()),
                    ..EvidenceItem::default()
                },
                EvidenceItem {
                    source_api: Some("bel".to_string()),
                    pmid: None,
                    ..EvidenceItem::default()
                },
            ],
        };
        let content = provenance_content("MSA", &[statement], "activation", 5);
        let html = content.text("html").unwrap();

        assert!(html.contains("<i>'MEK1 activates ERK2'</i>"));
        assert!(html.contains("Database entry in 'biopax': BP77"));
        assert!(html.contains("Evidence from 'bel': MAP2K1 phosphorylates MAPK1."));
        assert!(html.contains("Found without a literature reference:"));
    }

    #[test]
    fn statement_limit_is_honored_in_input_order() {
        let statements: Vec<Activation> = (0..8)
            .map(|i| Activation {
                sentence: String::new(),
                evidence: vec![text_item("99999", &format!("sentence {i}"))],
            })
            .collect();
        let content = provenance_content("DTDA", &statements, "targets", 5);
        let html = content.text("html").unwrap();

        assert!(html.contains("sentence 0"));
        assert!(html.contains("sentence 4"));
        assert!(!html.contains("sentence 5"));
    }

    #[test]
    fn report_payload_shape() {
        let statement = Activation {
            sentence: String::new(),
            evidence: vec![text_item("12345", "X activates Y")],
        };
        let content = provenance_content("MSA", &[statement], "activation of Y", 5);
        assert_eq!(content.head(), "add-provenance");
        let html = content.text("html").unwrap();
        assert!(html.starts_with("<h4>Supporting evidence from the MSA for activation of Y:</h4>"));
        assert!(html.ends_with("<hr>"));
    }
}
