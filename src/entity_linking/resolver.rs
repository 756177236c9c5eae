//! Mention resolution
//!
//! Maps free-text property mentions onto catalog records. Candidate phrases
//! come from alias hits, "Building N" references, street addresses and
//! conjunction-separated segments; each is resolved on its own, then the full
//! query backfills anything still missing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::{EntityCatalog, EntityRecord, RecordId};
use crate::patterns::{
    building_references, tenant_references, trim_phrase, BUILDING_RE, CONJUNCTION_RE,
    PERIOD_TOKEN_RE, PROPERTY_SIGNAL_RE, STREET_RE,
};

/// Default confidence gate for phrase matches
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.12;

/// Which matching stage produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    ExactAlias,
    LexicalSimilarity,
    EmbeddingBlended,
}

impl MatchSource {
    pub fn label(&self) -> &'static str {
        match self {
            MatchSource::ExactAlias => "alias match",
            MatchSource::LexicalSimilarity => "TF-IDF similarity",
            MatchSource::EmbeddingBlended => "Hybrid similarity (tf-idf + embeddings)",
        }
    }
}

/// A resolved property reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub address: String,
    pub display_name: Option<String>,
    /// In [0, 1], rounded to four decimals
    pub confidence: f64,
    /// 1-based, assigned after final ordering
    pub rank: usize,
    /// Provenance, e.g. "alias match (from 'the tower')"
    pub reason: String,
    pub source: MatchSource,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl EntityMatch {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.address)
    }
}

/// Why a candidate phrase did not produce a match
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// No catalog document shares a term with the phrase
    NoOverlap,
    /// Best score fell below the confidence gate
    LowConfidence(f64),
    /// Best record was already claimed by an earlier phrase
    AlreadyClaimed(String),
    /// The phrase names a building or tenant the best record does not carry
    ReferenceMismatch(String),
}

/// Outcome of resolving one candidate phrase
#[derive(Debug, Clone, PartialEq)]
pub enum MentionOutcome {
    ExactAlias(EntityMatch),
    LexicalSimilarity(EntityMatch),
    EmbeddingBlended(EntityMatch),
    Unresolved {
        term: String,
        reason: UnresolvedReason,
    },
}

impl MentionOutcome {
    fn matched(m: EntityMatch) -> Self {
        match m.source {
            MatchSource::ExactAlias => MentionOutcome::ExactAlias(m),
            MatchSource::LexicalSimilarity => MentionOutcome::LexicalSimilarity(m),
            MatchSource::EmbeddingBlended => MentionOutcome::EmbeddingBlended(m),
        }
    }

    pub fn entity_match(&self) -> Option<&EntityMatch> {
        match self {
            MentionOutcome::ExactAlias(m)
            | MentionOutcome::LexicalSimilarity(m)
            | MentionOutcome::EmbeddingBlended(m) => Some(m),
            MentionOutcome::Unresolved { .. } => None,
        }
    }

    pub fn into_match(self) -> Option<EntityMatch> {
        match self {
            MentionOutcome::ExactAlias(m)
            | MentionOutcome::LexicalSimilarity(m)
            | MentionOutcome::EmbeddingBlended(m) => Some(m),
            MentionOutcome::Unresolved { .. } => None,
        }
    }
}

/// Result of [`MentionResolver::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionResolution {
    pub query: String,
    pub matches: Vec<EntityMatch>,
    pub candidate_terms: Vec<String>,
    pub unresolved_terms: Vec<String>,
    /// Addresses admitted by the full-query backfill rather than a phrase
    pub backfilled: Vec<String>,
}

impl MentionResolution {
    pub fn addresses(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.address.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub min_confidence: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Resolves property mentions against an [`EntityCatalog`]
#[derive(Debug, Clone, Default)]
pub struct MentionResolver {
    config: ResolverConfig,
}

impl MentionResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn with_min_confidence(min_confidence: f64) -> Self {
        Self::new(ResolverConfig { min_confidence })
    }

    pub fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    /// Resolve up to `expected` distinct properties mentioned in `text`
    pub fn resolve(&self, text: &str, expected: usize, catalog: &EntityCatalog) -> MentionResolution {
        let mut resolution = MentionResolution {
            query: text.to_string(),
            ..Default::default()
        };
        if text.trim().is_empty() || catalog.is_empty() {
            return resolution;
        }

        let candidates = candidate_terms(text, catalog);
        let mut claimed: Vec<String> = Vec::new();

        for candidate in &candidates {
            if resolution.matches.len() >= expected {
                break;
            }
            match self.resolve_candidate(candidate, catalog, &claimed) {
                MentionOutcome::Unresolved { term, reason } => {
                    tracing::debug!(term = %term, reason = ?reason, "candidate unresolved");
                    resolution.unresolved_terms.push(term);
                }
                outcome => {
                    if let Some(mut m) = outcome.into_match() {
                        m.rank = resolution.matches.len() + 1;
                        m.reason = format!("{} (from '{}')", m.reason, candidate);
                        claimed.push(m.address.clone());
                        resolution.matches.push(m);
                    }
                }
            }
        }

        if !candidates.is_empty() && resolution.matches.len() < expected {
            let references = explicit_references(text);
            let filler = catalog.search(text, expected + claimed.len());
            for m in filler {
                if resolution.matches.len() >= expected {
                    break;
                }
                if claimed.contains(&m.address) || m.confidence < self.config.min_confidence {
                    continue;
                }
                if !references.is_empty() && !carries_any_reference(catalog, &m.address, &references) {
                    continue;
                }
                claimed.push(m.address.clone());
                resolution.backfilled.push(m.address.clone());
                resolution.matches.push(EntityMatch {
                    rank: resolution.matches.len() + 1,
                    reason: format!("{} (fallback from full query)", m.reason),
                    ..m
                });
            }
        }

        resolution.candidate_terms = candidates;
        resolution
    }

    /// Resolve one phrase against the catalog.
    ///
    /// Exact alias hits win outright; everything else goes through search
    /// and the confidence gate.
    pub fn resolve_candidate(
        &self,
        term: &str,
        catalog: &EntityCatalog,
        claimed: &[String],
    ) -> MentionOutcome {
        let unresolved = |reason| MentionOutcome::Unresolved {
            term: term.to_string(),
            reason,
        };

        let found = match catalog.lookup_alias(term) {
            Some((id, _)) => catalog.make_match(id, 1.0, 1, MatchSource::ExactAlias),
            None => match catalog.search(term, 1).into_iter().next() {
                Some(m) => m,
                None => return unresolved(UnresolvedReason::NoOverlap),
            },
        };

        let references = explicit_references(term);
        if !references.is_empty() && !carries_any_reference(catalog, &found.address, &references) {
            return unresolved(UnresolvedReason::ReferenceMismatch(references.join(", ")));
        }
        if found.confidence < self.config.min_confidence {
            return unresolved(UnresolvedReason::LowConfidence(found.confidence));
        }
        if claimed.contains(&found.address) {
            return unresolved(UnresolvedReason::AlreadyClaimed(found.address));
        }
        MentionOutcome::matched(found)
    }

    /// Resolve a follow-up answer: best match with any positive score, no gate
    pub fn resolve_answer(&self, answer: &str, catalog: &EntityCatalog) -> Option<EntityMatch> {
        let term = trim_phrase(answer);
        if let Some((id, _)) = catalog.lookup_alias(term) {
            let mut m = catalog.make_match(id, 1.0, 1, MatchSource::ExactAlias);
            m.reason = format!("{} (from answer '{}')", m.reason, term);
            return Some(m);
        }
        let references = explicit_references(term);
        catalog
            .search(term, 1)
            .into_iter()
            .find(|m| references.is_empty() || carries_any_reference(catalog, &m.address, &references))
            .map(|mut m| {
                m.reason = format!("{} (from answer '{}')", m.reason, term);
                m
            })
    }
}

/// Explicit building and tenant references named in `text`
fn explicit_references(text: &str) -> Vec<String> {
    let mut refs = building_references(text);
    refs.extend(tenant_references(text));
    refs
}

fn carries_any_reference(catalog: &EntityCatalog, address: &str, references: &[String]) -> bool {
    catalog
        .record_by_address(address)
        .is_some_and(|record| references.iter().any(|r| record_carries(record, r)))
}

fn record_carries(record: &EntityRecord, reference: &str) -> bool {
    record.has_alias(reference)
        || record
            .tenant_name
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(reference))
}

/// Candidate phrases in priority order: alias hits by position, building
/// references, street addresses, then conjunction segments carrying a
/// property signal not already covered by an earlier candidate.
pub fn candidate_terms(text: &str, catalog: &EntityCatalog) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();
    let push = |term: &str, ordered: &mut Vec<String>| {
        let term = trim_phrase(term);
        if !term.is_empty() && !ordered.iter().any(|t| t.eq_ignore_ascii_case(term)) {
            ordered.push(term.to_string());
        }
    };

    for hit in catalog.alias_hits(text) {
        push(&hit.snippet, &mut ordered);
    }
    for m in BUILDING_RE.find_iter(text) {
        push(m.as_str(), &mut ordered);
    }
    for m in STREET_RE.find_iter(text) {
        push(m.as_str(), &mut ordered);
    }

    for segment in CONJUNCTION_RE.split(text) {
        let segment = trim_phrase(segment);
        if segment.is_empty() || !has_property_signal(segment) {
            continue;
        }
        let lowered = segment.to_lowercase();
        if ordered.iter().any(|t| lowered.contains(&t.to_lowercase())) {
            continue;
        }
        push(segment, &mut ordered);
    }
    ordered
}

/// Digits or property nouns left once period expressions are removed
fn has_property_signal(segment: &str) -> bool {
    let without_periods = PERIOD_TOKEN_RE.replace_all(segment, " ");
    PROPERTY_SIGNAL_RE.is_match(&without_periods)
}

/// Record ids of every alias hit in `text`, deduplicated, in position order
pub fn alias_record_ids(text: &str, catalog: &EntityCatalog) -> Vec<RecordId> {
    let mut ids: Vec<RecordId> = Vec::new();
    for hit in catalog.alias_hits(text) {
        if !ids.contains(&hit.record) {
            ids.push(hit.record);
        }
    }
    ids
}
