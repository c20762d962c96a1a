//! DTDA — the disease-target-drug agent.
//!
//! Searches for targets known to be implicated in a disease and for drugs
//! known to affect a target directly or indirectly. Drug–target pairs come
//! from a read-only SQLite store owned by the agent for its lifetime;
//! mutation frequencies come from a cancer-genomics collaborator and are
//! interpreted against a curated index of mutation-effect statements.

use std::collections::HashMap;
use std::path::Path;

use anyhow::anyhow;
use bioagents_core::prelude::*;
use regex::Regex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const DRUG_NOT_FOUND: FailureReason = FailureReason::Domain("DRUG_NOT_FOUND");
pub const DISEASE_NOT_FOUND: FailureReason = FailureReason::Domain("DISEASE_NOT_FOUND");

/// Domain conditions of the drug/disease lookup layer.
#[derive(Debug, Error)]
pub enum DtdaError {
    /// No drug in the store matches the given names.
    #[error("drug not found")]
    DrugNotFound,
    /// No study covers the given disease.
    #[error("disease not found")]
    DiseaseNotFound,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl From<DtdaError> for Escalation {
    fn from(err: DtdaError) -> Self {
        match &err {
            DtdaError::DrugNotFound => Escalation::new("DRUG_NOT_FOUND", err.to_string()),
            DtdaError::DiseaseNotFound => Escalation::new("DISEASE_NOT_FOUND", err.to_string()),
            DtdaError::Db(_) => Escalation::new("INTERNAL", err.to_string()),
        }
    }
}

/// A drug matched in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugEntry {
    pub name: String,
    pub pubchem_id: Option<String>,
}

/// Read-only SQLite store of drug–target pairs.
///
/// The connection is acquired once at agent startup, owned exclusively for
/// the agent's lifetime, and released on drop.
pub struct DrugTargetDb {
    conn: Connection,
}

impl DrugTargetDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DtdaError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, DtdaError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DtdaError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS agent (
                name TEXT NOT NULL,
                synonyms TEXT NOT NULL DEFAULT '',
                nominal_target TEXT NOT NULL,
                primary_cid TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_agent_target ON agent(nominal_target);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Insert one drug row. Used for seeding and tests.
    pub fn insert(
        &self,
        name: &str,
        synonyms: &str,
        nominal_target: &str,
        primary_cid: Option<&str>,
    ) -> Result<(), DtdaError> {
        self.conn.execute(
            "INSERT INTO agent (name, synonyms, nominal_target, primary_cid)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, synonyms, nominal_target, primary_cid],
        )?;
        Ok(())
    }

    /// A small curated set of kinase-inhibitor pairs.
    pub fn curated() -> Result<Self, DtdaError> {
        let db = Self::open_in_memory()?;
        db.insert("Vemurafenib", "PLX4032,RG7204", "BRAF", Some("42611257"))?;
        db.insert("Dabrafenib", "GSK2118436", "BRAF", Some("44462760"))?;
        db.insert("Selumetinib", "AZD6244", "MAP2K1", Some("10127622"))?;
        db.insert("Trametinib", "GSK1120212", "MAP2K1", Some("11707110"))?;
        info!("loaded curated drug-target entries");
        Ok(db)
    }

    /// Whether any of the named drugs nominally targets `target`.
    ///
    /// Fails with [`DtdaError::DrugNotFound`] when none of the names match
    /// a row at all.
    pub fn is_nominal_drug_target(
        &self,
        drug_names: &[&str],
        target: &str,
    ) -> Result<bool, DtdaError> {
        let mut stmt = self.conn.prepare(
            "SELECT nominal_target FROM agent
             WHERE name LIKE ?1 OR synonyms LIKE ?1",
        )?;
        let mut any_match = false;
        for drug in drug_names {
            let pattern = format!("%{drug}%");
            let targets = stmt
                .query_map(params![pattern], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            if targets.is_empty() {
                continue;
            }
            any_match = true;
            if targets.iter().any(|t| t.eq_ignore_ascii_case(target)) {
                return Ok(true);
            }
        }
        if !any_match {
            return Err(DtdaError::DrugNotFound);
        }
        Ok(false)
    }

    /// All drugs that nominally target `target`.
    pub fn find_target_drugs(&self, target: &str) -> Result<Vec<DrugEntry>, DtdaError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, primary_cid FROM agent WHERE nominal_target LIKE ?1",
        )?;
        let pattern = format!("%{target}%");
        let drugs = stmt
            .query_map(params![pattern], |row| {
                Ok(DrugEntry {
                    name: row.get(0)?,
                    pubchem_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drugs)
    }

    /// All targets the named drug nominally affects.
    pub fn find_drug_targets(&self, drug: &str) -> Result<Vec<String>, DtdaError> {
        let mut stmt = self.conn.prepare(
            "SELECT nominal_target FROM agent WHERE name LIKE ?1 OR synonyms LIKE ?1",
        )?;
        let pattern = format!("%{drug}%");
        let targets = stmt
            .query_map(params![pattern], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }
}

/// An active-form statement: one mutation and its effect on activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFormStatement {
    pub agent: String,
    pub residue_from: String,
    pub position: String,
    pub residue_to: String,
    pub is_active: bool,
}

/// What a mutation does to its protein's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationEffect {
    Activate,
    Deactivate,
}

/// Curated mutation-effect statements indexed for point lookups.
pub struct MutationEffectIndex {
    statements: Vec<ActiveFormStatement>,
    change_re: Regex,
}

impl MutationEffectIndex {
    pub fn new(statements: Vec<ActiveFormStatement>) -> Self {
        info!(count = statements.len(), "loaded mutation effect statements");
        Self {
            statements,
            // Amino acid changes come in the compact form V600E.
            change_re: Regex::new(r"^([A-Z])([0-9]+)([A-Z])$").expect("static regex"),
        }
    }

    /// A small curated set of well-known driver mutations.
    pub fn curated() -> Self {
        let active = |agent: &str, from: &str, pos: &str, to: &str| ActiveFormStatement {
            agent: agent.to_string(),
            residue_from: from.to_string(),
            position: pos.to_string(),
            residue_to: to.to_string(),
            is_active: true,
        };
        Self::new(vec![
            active("BRAF", "V", "600", "E"),
            active("KRAS", "G", "12", "D"),
            active("KRAS", "G", "13", "D"),
            active("EGFR", "L", "858", "R"),
            ActiveFormStatement {
                agent: "TP53".to_string(),
                residue_from: "R".to_string(),
                position: "175".to_string(),
                residue_to: "H".to_string(),
                is_active: false,
            },
        ])
    }

    /// Effect of `change` (e.g. `V600E`) on `protein`, if curated.
    pub fn find_mutation_effect(&self, protein: &str, change: &str) -> Option<MutationEffect> {
        let caps = self.change_re.captures(change)?;
        let (from, pos, to) = (&caps[1], &caps[2], &caps[3]);
        self.statements
            .iter()
            .find(|s| {
                s.agent == protein
                    && s.residue_from == from
                    && s.position == pos
                    && s.residue_to == to
            })
            .map(|s| {
                if s.is_active {
                    MutationEffect::Activate
                } else {
                    MutationEffect::Deactivate
                }
            })
    }
}

/// Cancer-genomics lookup collaborator (study lists and mutation calls).
pub trait CancerGenomics {
    /// Study identifiers covering a disease, empty when unknown.
    fn studies_for(&self, disease: &str) -> Vec<String>;
    /// Number of sequenced cases in a study.
    fn num_sequenced(&self, study: &str) -> u64;
    /// `(gene_symbol, amino_acid_change)` pairs observed in a study for the
    /// given genes and mutation type.
    fn mutations(&self, study: &str, genes: &[&str], mutation_type: &str) -> Vec<(String, String)>;
}

/// In-memory study table, for tests and offline runs.
#[derive(Debug, Default)]
pub struct StaticGenomics {
    /// disease name (lowercased) -> study ids
    studies: HashMap<String, Vec<String>>,
    /// study id -> (num sequenced, mutation calls)
    calls: HashMap<String, (u64, Vec<(String, String)>)>,
}

impl StaticGenomics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_study(
        &mut self,
        disease: &str,
        study: &str,
        num_sequenced: u64,
        calls: &[(&str, &str)],
    ) {
        self.studies
            .entry(disease.to_lowercase())
            .or_default()
            .push(study.to_string());
        self.calls.insert(
            study.to_string(),
            (
                num_sequenced,
                calls
                    .iter()
                    .map(|(g, c)| (g.to_string(), c.to_string()))
                    .collect(),
            ),
        );
    }

    /// A small curated melanoma/colorectal study table.
    pub fn curated() -> Self {
        let mut genomics = Self::new();
        genomics.add_study(
            "melanoma",
            "skcm_tcga",
            100,
            &[
                ("BRAF", "V600E"),
                ("BRAF", "V600E"),
                ("BRAF", "V600K"),
                ("KRAS", "G12D"),
            ],
        );
        genomics.add_study(
            "colorectal cancer",
            "coadread_tcga",
            80,
            &[("KRAS", "G12D"), ("KRAS", "G13D"), ("BRAF", "V600E")],
        );
        genomics
    }
}

impl CancerGenomics for StaticGenomics {
    fn studies_for(&self, disease: &str) -> Vec<String> {
        self.studies
            .get(&disease.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn num_sequenced(&self, study: &str) -> u64 {
        self.calls.get(study).map(|(n, _)| *n).unwrap_or(0)
    }

    fn mutations(&self, study: &str, genes: &[&str], _mutation_type: &str) -> Vec<(String, String)> {
        self.calls
            .get(study)
            .map(|(_, calls)| {
                calls
                    .iter()
                    .filter(|(gene, _)| genes.contains(&gene.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-gene mutation statistics over the studies of one disease.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationStats {
    /// Fraction of sequenced cases carrying a mutation in this gene.
    pub fraction: f64,
    /// Shares of the observed mutations by effect; the three sum to 1.
    pub activate: f64,
    pub deactivate: f64,
    pub other: f64,
}

/// Genes scanned when ranking disease targets, by pathway.
const GENE_LISTS: &[(&str, &[&str])] = &[
    (
        "rtk_signaling",
        &[
            "EGFR", "ERBB2", "ERBB3", "ERBB4", "PDGFA", "PDGFB", "PDGFRA", "PDGFRB", "KIT",
            "FGF1", "FGFR1", "IGF1", "IGF1R", "VEGFA", "VEGFB", "KDR",
        ],
    ),
    (
        "pi3k_signaling",
        &[
            "PIK3CA", "PIK3R1", "PIK3R2", "PTEN", "PDPK1", "AKT1", "AKT2", "FOXO1", "FOXO3",
            "MTOR", "RICTOR", "TSC1", "TSC2", "RHEB", "AKT1S1", "RPTOR", "MLST8",
        ],
    ),
    (
        "mapk_signaling",
        &[
            "KRAS", "HRAS", "BRAF", "RAF1", "MAP3K1", "MAP3K2", "MAP3K3", "MAP3K4", "MAP3K5",
            "MAP2K1", "MAP2K2", "MAP2K3", "MAP2K4", "MAP2K5", "MAPK1", "MAPK3", "MAPK4", "MAPK6",
            "MAPK7", "MAPK8", "MAPK9", "MAPK12", "MAPK14", "DAB2", "RASSF1", "RAB25",
        ],
    ),
];

/// The drug/disease lookup layer behind the DTDA agent.
pub struct Dtda<G: CancerGenomics> {
    pub db: DrugTargetDb,
    pub effects: MutationEffectIndex,
    pub genomics: G,
}

impl<G: CancerGenomics> Dtda<G> {
    pub fn new(db: DrugTargetDb, effects: MutationEffectIndex, genomics: G) -> Self {
        Self {
            db,
            effects,
            genomics,
        }
    }

    fn gene_list() -> Vec<&'static str> {
        GENE_LISTS.iter().flat_map(|(_, genes)| genes.iter().copied()).collect()
    }

    /// Per-gene mutation statistics across all studies of a disease.
    pub fn mutation_statistics(
        &self,
        disease: &str,
        mutation_type: &str,
    ) -> Result<HashMap<String, MutationStats>, DtdaError> {
        let studies = self.genomics.studies_for(disease);
        if studies.is_empty() {
            return Err(DtdaError::DiseaseNotFound);
        }
        let genes = Self::gene_list();
        let mut num_cases = 0u64;
        let mut counts: HashMap<String, (f64, f64, f64, f64)> = HashMap::new();
        for study in &studies {
            num_cases += self.genomics.num_sequenced(study);
            for (gene, change) in self.genomics.mutations(study, &genes, mutation_type) {
                let entry = counts.entry(gene.clone()).or_default();
                entry.0 += 1.0;
                match self.effects.find_mutation_effect(&gene, &change) {
                    Some(MutationEffect::Activate) => entry.1 += 1.0,
                    Some(MutationEffect::Deactivate) => entry.2 += 1.0,
                    None => entry.3 += 1.0,
                }
            }
        }
        if num_cases == 0 {
            return Err(DtdaError::DiseaseNotFound);
        }
        Ok(counts
            .into_iter()
            .map(|(gene, (total, activate, deactivate, other))| {
                (
                    gene,
                    MutationStats {
                        fraction: total / num_cases as f64,
                        activate: activate / total,
                        deactivate: deactivate / total,
                        other: other / total,
                    },
                )
            })
            .collect())
    }

    /// The most frequently mutated gene for a disease, with the percentage
    /// of sequenced cases carrying it.
    pub fn top_mutation(&self, disease: &str) -> Result<(String, u32), DtdaError> {
        let stats = self.mutation_statistics(disease, "missense")?;
        let top = stats
            .into_iter()
            .max_by(|a, b| a.1.fraction.total_cmp(&b.1.fraction))
            .ok_or(DtdaError::DiseaseNotFound)?;
        Ok((top.0, (top.1.fraction * 100.0) as u32))
    }
}

/// The DTDA agent.
pub struct DtdaModule<G: CancerGenomics> {
    dtda: Dtda<G>,
}

impl<G: CancerGenomics> DtdaModule<G> {
    pub const NAME: &'static str = "DTDA";

    pub fn new(dtda: Dtda<G>) -> Self {
        Self { dtda }
    }

    pub fn dispatcher() -> Result<Dispatcher<Self>, RegistryError> {
        let registry = TaskRegistry::builder()
            .task("IS-DRUG-TARGET", Self::respond_is_drug_target)
            .task("FIND-TARGET-DRUG", Self::respond_find_target_drug)
            .task("FIND-DRUG-TARGETS", Self::respond_find_drug_targets)
            .task("FIND-DISEASE-TARGETS", Self::respond_find_disease_targets)
            .build()?;
        Ok(Dispatcher::new(Self::NAME, registry))
    }

    /// Does the named drug nominally target the named protein?
    fn respond_is_drug_target(&mut self, content: &Content) -> Result<Response, HandlerError> {
        let drug = match content.value_str("drug") {
            Some(drug) if !drug.is_empty() => drug,
            _ => return Ok(failure_with(DRUG_NOT_FOUND, "no drug given").into()),
        };
        let target = content
            .value_str("target")
            .ok_or_else(|| anyhow!("is-drug-target request has no target slot"))?;
        let msg = match self.dtda.db.is_nominal_drug_target(&[drug], target) {
            Ok(is_target) => {
                Content::new("SUCCESS").with_atom("is-target", bool_atom(is_target))
            }
            Err(DtdaError::DrugNotFound) => failure(DRUG_NOT_FOUND),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }

    /// All drugs nominally targeting a protein.
    fn respond_find_target_drug(&mut self, content: &Content) -> Result<Response, HandlerError> {
        let target = content
            .value_str("target")
            .ok_or_else(|| anyhow!("find-target-drug request has no target slot"))?;
        let drugs = self
            .dtda
            .db
            .find_target_drugs(target)
            .map_err(|e| anyhow!(e))?;
        let entries = drugs
            .into_iter()
            .map(|drug| {
                let mut entry = Content::empty().with_text("name", drug.name);
                if let Some(cid) = drug.pubchem_id {
                    entry.set_atom("pubchem-id", cid);
                }
                entry
            })
            .collect();
        Ok(Content::new("SUCCESS").with_list("drugs", entries).into())
    }

    /// All targets a drug nominally affects.
    fn respond_find_drug_targets(&mut self, content: &Content) -> Result<Response, HandlerError> {
        let drug = match content.value_str("drug") {
            Some(drug) if !drug.is_empty() => drug,
            _ => return Ok(failure_with(DRUG_NOT_FOUND, "no drug given").into()),
        };
        let targets = self
            .dtda
            .db
            .find_drug_targets(drug)
            .map_err(|e| anyhow!(e))?;
        let entries = targets
            .into_iter()
            .map(|name| Content::empty().with_text("name", name))
            .collect();
        Ok(Content::new("SUCCESS").with_list("targets", entries).into())
    }

    /// The most promising target for a disease, by mutation frequency.
    fn respond_find_disease_targets(
        &mut self,
        content: &Content,
    ) -> Result<Response, HandlerError> {
        let disease = match content.value_str("disease") {
            Some(disease) if !disease.is_empty() => disease,
            _ => return Ok(failure_with(DISEASE_NOT_FOUND, "no disease given").into()),
        };
        let msg = match self.dtda.top_mutation(disease) {
            Ok((protein, percent)) => Content::new("SUCCESS")
                .with_content("target", Content::empty().with_text("name", protein))
                .with_atom("prevalence", percent.to_string()),
            Err(DtdaError::DiseaseNotFound) => failure(DISEASE_NOT_FOUND),
            Err(other) => return Err(anyhow!(other).into()),
        };
        Ok(msg.into())
    }
}

fn bool_atom(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}
