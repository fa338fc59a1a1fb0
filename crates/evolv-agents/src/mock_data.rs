//! Simulated regulatory knowledge base and sample requirement documents.
//!
//! All passages are fictional paraphrases written for demonstration. No
//! vector index or embedding model is contacted; relevance is the share of
//! query terms that appear in a passage.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use evolv_contracts::{error::EvolvResult, verify::ReferencePassage};
use evolv_core::traits::Retriever;

/// Version tag carried by every built-in GAMP 5 passage.
pub const GAMP5_VERSION: &str = "GAMP5-2nd-Ed";
pub const PART11_VERSION: &str = "Part11-2003";

const STOPWORDS: [&str; 22] = [
    "the", "and", "for", "any", "all", "are", "its", "per", "may", "not", "shall", "should",
    "must", "system", "with", "from", "that", "this", "each", "every", "into", "will",
];

struct Entry {
    text: String,
    source_label: String,
    page_number: u32,
    version_tag: Option<String>,
}

/// In-memory stand-in for the regulatory vector store.
#[derive(Default)]
pub struct MockKnowledgeBase {
    entries: Vec<Entry>,
}

impl MockKnowledgeBase {
    /// A knowledge base with no passages; every query returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A small GAMP 5 / Part 11 corpus.
    pub fn gamp5() -> Self {
        Self::empty()
            .with_passage(
                "Warehouse temperature probes used for GxP decisions require validation; \
                 computerized systems shall be validated before use.",
                "GAMP 5",
                23,
                Some(GAMP5_VERSION),
            )
            .with_passage(
                "Storage areas shall monitor cold room humidity continuously and record any \
                 deviation from the approved range.",
                "GAMP 5",
                112,
                Some(GAMP5_VERSION),
            )
            .with_passage(
                "An audit trail shall record the date, time and user identity for every change \
                 to GxP electronic records, ensuring full traceability.",
                "GAMP 5",
                147,
                Some(GAMP5_VERSION),
            )
            .with_passage(
                "Changes to a configured application shall be assessed for impact and approved \
                 through formal change control before implementation.",
                "GAMP 5",
                58,
                Some(GAMP5_VERSION),
            )
            .with_passage(
                "Electronic signatures shall be unique to one individual and linked to their \
                 respective records.",
                "21 CFR Part 11",
                3,
                Some(PART11_VERSION),
            )
    }

    pub fn with_passage(
        mut self,
        text: &str,
        source_label: &str,
        page_number: u32,
        version_tag: Option<&str>,
    ) -> Self {
        self.entries.push(Entry {
            text: text.to_string(),
            source_label: source_label.to_string(),
            page_number,
            version_tag: version_tag.map(str::to_string),
        });
        self
    }
}

/// Lowercased content words with a trailing plural `s` removed.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .map(|word| match word.strip_suffix('s') {
            Some(stem) if stem.len() >= 3 && !stem.ends_with('s') => stem.to_string(),
            _ => word,
        })
        .filter(|word| word.len() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// Share of the query's terms present in `passage`, in [0, 1].
pub fn overlap_score(query: &BTreeSet<String>, passage: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    query.intersection(passage).count() as f64 / query.len() as f64
}

impl Retriever for MockKnowledgeBase {
    fn query(&self, text: &str, top_k: usize, min_score: f64) -> EvolvResult<Vec<ReferencePassage>> {
        let query = terms(text);
        let mut ranked: Vec<ReferencePassage> = self
            .entries
            .iter()
            .map(|entry| ReferencePassage {
                text: entry.text.clone(),
                source_label: entry.source_label.clone(),
                page_number: entry.page_number,
                similarity_score: overlap_score(&query, &terms(&entry.text)),
                version_tag: entry.version_tag.clone(),
            })
            .filter(|p| p.similarity_score >= min_score)
            .collect();
        ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

// ── Sample requirement documents ─────────────────────────────────────────────

/// Medium criticality, well grounded; expected to be approved.
pub fn humidity_requirement() -> Value {
    json!({
        "URS_ID": "URS-7.1",
        "Requirement_Statement": "The system shall monitor cold room humidity and record excursions.",
        "Criticality": "Medium",
        "Regulatory_Rationale": "GAMP 5 Appendix O: storage condition monitoring"
    })
}

/// Low criticality that contradicts validation guidance; expected to be rejected.
pub fn probe_requirement() -> Value {
    json!({
        "URS_ID": "URS-7.2",
        "Requirement_Statement": "The system may skip validation of warehouse temperature probes.",
        "Criticality": "Low",
        "Regulatory_Rationale": "Probes are calibrated by the vendor"
    })
}

/// High criticality audit-trail requirement; expected to be approved.
pub fn audit_trail_requirement() -> Value {
    json!({
        "URS_ID": "URS-9.3",
        "Requirement_Statement": "The system shall maintain an audit trail for GxP electronic records.",
        "Criticality": "High",
        "Regulatory_Rationale": "21 CFR Part 11.10(e)"
    })
}

pub fn sample_requirements() -> Vec<Value> {
    vec![humidity_requirement(), probe_requirement(), audit_trail_requirement()]
}
