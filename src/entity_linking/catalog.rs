//! Entity catalog
//!
//! Canonical, deduplicated property records built from dataset rows, with an
//! alias index, the known tenant list and a TF-IDF space over each record's
//! similarity document. A catalog is immutable once built; refresh builds a
//! new one (see [`super::handle::CatalogHandle`]).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::embedder::{DocumentEmbeddings, Embedder};
use super::resolver::{EntityMatch, MatchSource};
use super::tfidf::TermSpace;
use crate::dataset::DatasetRow;
use crate::entity_linking::normalize::{find_word_bounded, title_case};
use crate::patterns::BUILDING_RE;

/// Index of a record inside its catalog
pub type RecordId = usize;

/// One canonical property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    /// Canonical key (unique within a catalog)
    pub address: String,
    pub display_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub tenant_name: Option<String>,
    pub price: Option<f64>,
    pub pnl: Option<f64>,
    /// Sorted, case-preserving phrases that resolve to this record
    pub aliases: Vec<String>,
    /// Text indexed for similarity search
    pub document: String,
}

impl EntityRecord {
    /// Display name when present, address otherwise
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.address)
    }

    /// Whether any alias equals `reference` ignoring case
    pub fn has_alias(&self, reference: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(reference))
    }

    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        for (key, value) in [
            ("city", &self.city),
            ("state", &self.state),
            ("tenant_name", &self.tenant_name),
        ] {
            if let Some(v) = value {
                metadata.insert(key.to_string(), v.clone());
            }
        }
        metadata
    }
}

// ============================================================================
// Record construction
// ============================================================================

fn cell_text(row: &DatasetRow, column: &str) -> Option<String> {
    let text = match row.get(column)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty() && !text.eq_ignore_ascii_case("nan")).then_some(text)
}

fn cell_number(row: &DatasetRow, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn compose_document(record: &EntityRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(name) = &record.display_name {
        if !name.eq_ignore_ascii_case(&record.address) {
            parts.push(name.clone());
        }
    }
    parts.push(record.address.clone());
    let location: Vec<&str> = [record.city.as_deref(), record.state.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !location.is_empty() {
        parts.push(location.join(", "));
    }
    if let Some(tenant) = &record.tenant_name {
        parts.push(format!("Tenant {}", tenant));
    }
    if let Some(price) = record.price {
        parts.push(format!("Price {}", price));
    }
    if let Some(pnl) = record.pnl {
        parts.push(format!("PNL {}", pnl));
    }
    parts.join(" | ")
}

fn derive_aliases(address: &str, display_name: Option<&str>, tenant: Option<&str>) -> Vec<String> {
    let mut aliases: Vec<String> = vec![address.to_string()];
    for source in std::iter::once(address).chain(display_name) {
        if source != address {
            aliases.push(source.to_string());
        }
        for m in BUILDING_RE.find_iter(source) {
            aliases.push(title_case(m.as_str()));
        }
    }
    if let Some(tenant) = tenant {
        aliases.push(tenant.to_string());
    }
    normalize_alias_set(aliases)
}

fn normalize_alias_set(aliases: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = aliases
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Group rows into canonical records.
///
/// The key is `address`, falling back to `property_name` on rows without one.
/// The first row seen for a key wins; records keep first-appearance order.
pub fn build_catalog(rows: &[DatasetRow]) -> Vec<EntityRecord> {
    let mut records: Vec<EntityRecord> = Vec::new();
    let mut seen: HashMap<String, RecordId> = HashMap::new();

    for row in rows {
        let display_name = cell_text(row, "property_name");
        let Some(address) = cell_text(row, "address").or_else(|| display_name.clone()) else {
            continue;
        };
        if seen.contains_key(&address) {
            continue;
        }

        let tenant_name = cell_text(row, "tenant_name");
        let mut record = EntityRecord {
            aliases: derive_aliases(&address, display_name.as_deref(), tenant_name.as_deref()),
            display_name,
            city: cell_text(row, "city"),
            state: cell_text(row, "state"),
            tenant_name,
            price: cell_number(row, "price"),
            pnl: cell_number(row, "pnl"),
            document: String::new(),
            address: address.clone(),
        };
        record.document = compose_document(&record);

        seen.insert(address, records.len());
        records.push(record);
    }

    tracing::info!(records = records.len(), rows = rows.len(), "catalog records built");
    records
}

/// Merge user-supplied alias → canonical pairs into existing records.
///
/// Targets are matched case-insensitively against each record's address,
/// display name and aliases. Unknown targets are dropped, and an alias key
/// already claimed by a record is never reassigned.
pub fn inject_aliases(mut records: Vec<EntityRecord>, aliases: &[(String, String)]) -> Vec<EntityRecord> {
    if aliases.is_empty() || records.is_empty() {
        return records;
    }

    let mut index: HashMap<String, RecordId> = HashMap::new();
    for (id, record) in records.iter().enumerate() {
        let keys = std::iter::once(&record.address)
            .chain(record.display_name.as_ref())
            .chain(record.aliases.iter());
        for key in keys {
            index.entry(key.to_lowercase()).or_insert(id);
        }
    }

    for (alias, canonical) in aliases {
        let alias = alias.trim();
        let canonical = canonical.trim();
        if alias.is_empty() || canonical.is_empty() {
            continue;
        }
        let Some(&id) = index.get(&canonical.to_lowercase()) else {
            tracing::debug!(alias, canonical, "alias target not in catalog, skipped");
            continue;
        };
        let key = alias.to_lowercase();
        if index.contains_key(&key) {
            continue;
        }
        let record = &mut records[id];
        record.aliases.push(alias.to_string());
        record.aliases.sort();
        index.insert(key, id);
    }
    records
}

// ============================================================================
// Catalog
// ============================================================================

/// An alias found verbatim in a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct AliasHit {
    /// Byte offset in the original text
    pub start: usize,
    /// The text as written by the user
    pub snippet: String,
    pub record: RecordId,
}

#[derive(Debug, Default)]
pub struct EntityCatalog {
    records: Vec<EntityRecord>,
    alias_index: HashMap<String, RecordId>,
    known_tenants: Vec<String>,
    space: TermSpace,
    embeddings: Option<DocumentEmbeddings>,
    fingerprint: String,
}

impl EntityCatalog {
    /// A catalog with no records; every lookup comes back empty
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder(rows: Vec<DatasetRow>) -> CatalogBuilder {
        CatalogBuilder::new(rows)
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&EntityRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Content hash of records, aliases and documents
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Tenant names seen anywhere in the dataset, longest first
    pub fn known_tenants(&self) -> &[String] {
        &self.known_tenants
    }

    pub fn known_addresses(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.address.as_str())
    }

    pub fn is_hybrid(&self) -> bool {
        self.embeddings.is_some()
    }

    pub fn record_by_address(&self, address: &str) -> Option<&EntityRecord> {
        self.records
            .iter()
            .find(|r| r.address.eq_ignore_ascii_case(address.trim()))
    }

    /// Exact alias lookup, case-insensitive
    pub fn lookup_alias(&self, phrase: &str) -> Option<(RecordId, &EntityRecord)> {
        let key = phrase.trim().to_lowercase();
        let id = *self.alias_index.get(&key)?;
        self.records.get(id).map(|r| (id, r))
    }

    /// Aliases appearing verbatim (word-bounded, case-insensitive) in `text`,
    /// ordered by position, one hit per distinct snippet.
    pub fn alias_hits(&self, text: &str) -> Vec<AliasHit> {
        let lowered = text.to_lowercase();
        // Byte offsets only line up when lowercasing kept the length
        let same_layout = lowered.len() == text.len();

        let mut hits: Vec<AliasHit> = Vec::new();
        for (alias, &record) in &self.alias_index {
            let Some(start) = find_word_bounded(&lowered, alias) else {
                continue;
            };
            let snippet = if same_layout {
                text.get(start..start + alias.len()).unwrap_or(alias).to_string()
            } else {
                alias.clone()
            };
            hits.push(AliasHit {
                start,
                snippet,
                record,
            });
        }

        // Longer aliases first at equal positions, then drop hits nested in an earlier one
        hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.snippet.len().cmp(&a.snippet.len())));
        let mut ordered: Vec<AliasHit> = Vec::new();
        let mut covered_until = 0usize;
        for hit in hits {
            if !ordered.is_empty() && hit.start < covered_until {
                continue;
            }
            if ordered.iter().any(|h| h.snippet == hit.snippet) {
                continue;
            }
            covered_until = hit.start + hit.snippet.len();
            ordered.push(hit);
        }
        ordered
    }

    /// Rank records against `text`.
    ///
    /// Returns at most `top_k` matches with a positive score, best first;
    /// equal scores keep catalog order.
    pub fn search(&self, text: &str, top_k: usize) -> Vec<EntityMatch> {
        if text.trim().is_empty() || self.records.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let lexical = self.space.scores(text);
        let (scores, source) = match self
            .embeddings
            .as_ref()
            .and_then(|e| e.blend(text, &lexical))
        {
            Some(blended) => (blended, MatchSource::EmbeddingBlended),
            None => (lexical, MatchSource::LexicalSimilarity),
        };

        let mut order: Vec<RecordId> = (0..scores.len()).collect();
        // stable sort: ties stay in insertion order
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        order
            .into_iter()
            .take(top_k)
            .take_while(|&id| scores[id] > 0.0)
            .enumerate()
            .map(|(pos, id)| self.make_match(id, scores[id], pos + 1, source))
            .collect()
    }

    /// Wrap a record as a match with a clamped, rounded confidence
    pub fn make_match(&self, id: RecordId, score: f64, rank: usize, source: MatchSource) -> EntityMatch {
        let record = &self.records[id];
        EntityMatch {
            address: record.address.clone(),
            display_name: record.display_name.clone(),
            confidence: ((score * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0),
            rank,
            reason: source.label().to_string(),
            source,
            metadata: record.metadata(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            fingerprint: self.fingerprint.clone(),
            record_count: self.records.len(),
            alias_index_size: self.alias_index.len(),
            tenant_count: self.known_tenants.len(),
            vocabulary_size: self.space.vocabulary_size(),
            embedding_model: self.embeddings.as_ref().map(|e| e.model_name().to_string()),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds an [`EntityCatalog`] from rows, aliases and an optional embedder
pub struct CatalogBuilder {
    rows: Vec<DatasetRow>,
    aliases: Vec<(String, String)>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl CatalogBuilder {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self {
            rows,
            aliases: Vec::new(),
            embedder: None,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<(String, String)>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn build(self) -> EntityCatalog {
        let records = inject_aliases(build_catalog(&self.rows), &self.aliases);
        if records.is_empty() {
            tracing::warn!("entity catalog built from an empty dataset");
            return EntityCatalog::empty();
        }

        let mut alias_index: HashMap<String, RecordId> = HashMap::new();
        for (id, record) in records.iter().enumerate() {
            for alias in &record.aliases {
                alias_index.entry(alias.to_lowercase()).or_insert(id);
            }
        }

        let mut known_tenants: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(tenant) = cell_text(row, "tenant_name") {
                if !known_tenants.iter().any(|t| t.eq_ignore_ascii_case(&tenant)) {
                    known_tenants.push(tenant);
                }
            }
        }
        known_tenants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let documents: Vec<&str> = records.iter().map(|r| r.document.as_str()).collect();
        let space = TermSpace::fit(&documents);
        let embeddings = self
            .embedder
            .and_then(|e| DocumentEmbeddings::warm(e, &documents));

        let mut hasher = Sha256::new();
        for record in &records {
            hasher.update(record.address.as_bytes());
            hasher.update([0u8]);
            hasher.update(record.aliases.join("\u{1f}").as_bytes());
            hasher.update([0u8]);
            hasher.update(record.document.as_bytes());
            hasher.update([0xffu8]);
        }
        let fingerprint = hex::encode(hasher.finalize());

        let catalog = EntityCatalog {
            records,
            alias_index,
            known_tenants,
            space,
            embeddings,
            fingerprint,
        };
        tracing::debug!(stats = %catalog.stats(), "entity catalog ready");
        catalog
    }
}

/// Catalog statistics for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub fingerprint: String,
    pub record_count: usize,
    pub alias_index_size: usize,
    pub tenant_count: usize,
    pub vocabulary_size: usize,
    pub embedding_model: Option<String>,
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Entity Catalog Statistics:")?;
        writeln!(
            f,
            "  Fingerprint: {}",
            self.fingerprint.get(..16).unwrap_or(&self.fingerprint)
        )?;
        writeln!(f, "  Records: {}", self.record_count)?;
        writeln!(f, "  Alias index entries: {}", self.alias_index_size)?;
        writeln!(f, "  Known tenants: {}", self.tenant_count)?;
        writeln!(f, "  Vocabulary: {}", self.vocabulary_size)?;
        writeln!(
            f,
            "  Embeddings: {}",
            self.embedding_model.as_deref().unwrap_or("disabled")
        )?;
        Ok(())
    }
}
