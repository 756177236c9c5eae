//! Address phrase extraction
//!
//! Layered, cheapest first: alias hits, literal known addresses,
//! "Building N" patterns, then a closest-string window scan when the earlier
//! stages found fewer than `max` phrases.

use serde::Serialize;

use crate::entity_linking::EntityCatalog;
use crate::patterns::{trim_phrase, BUILDING_RE, TENANT_REF_RE};

/// Minimum normalized Levenshtein similarity for the fuzzy stage
pub const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSource {
    Alias,
    KnownAddress,
    BuildingPattern,
    Fuzzy,
}

/// A property phrase found in text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedAddress {
    /// The phrase as written
    pub term: String,
    /// Canonical address when the phrase is known to the catalog
    pub address: Option<String>,
    pub source: AddressSource,
}

impl ExtractedAddress {
    /// Canonical address, else the raw phrase
    pub fn value(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.term)
    }
}

pub fn extract_addresses(text: &str, catalog: &EntityCatalog, max: usize) -> Vec<ExtractedAddress> {
    let mut found: Vec<ExtractedAddress> = Vec::new();
    let push = |candidate: ExtractedAddress, found: &mut Vec<ExtractedAddress>| {
        if found.len() >= max {
            return;
        }
        let duplicate = found.iter().any(|f| {
            f.term.eq_ignore_ascii_case(&candidate.term)
                || (f.address.is_some() && f.address == candidate.address)
        });
        if !duplicate {
            found.push(candidate);
        }
    };

    for hit in catalog.alias_hits(text) {
        let address = catalog.get(hit.record).map(|r| r.address.clone());
        push(
            ExtractedAddress {
                term: hit.snippet,
                address,
                source: AddressSource::Alias,
            },
            &mut found,
        );
    }

    let lowered = text.to_lowercase();
    for address in catalog.known_addresses() {
        if lowered.contains(&address.to_lowercase()) {
            push(
                ExtractedAddress {
                    term: address.to_string(),
                    address: Some(address.to_string()),
                    source: AddressSource::KnownAddress,
                },
                &mut found,
            );
        }
    }

    for m in BUILDING_RE.find_iter(text) {
        let term = trim_phrase(m.as_str()).to_string();
        let address = catalog.lookup_alias(&term).map(|(_, r)| r.address.clone());
        push(
            ExtractedAddress {
                term,
                address,
                source: AddressSource::BuildingPattern,
            },
            &mut found,
        );
    }

    if found.len() < max {
        for (term, address) in fuzzy_candidates(text, catalog) {
            push(
                ExtractedAddress {
                    term,
                    address: Some(address),
                    source: AddressSource::Fuzzy,
                },
                &mut found,
            );
        }
    }
    found
}

/// Word windows of `text` close to a known address, best first
fn fuzzy_candidates(text: &str, catalog: &EntityCatalog) -> Vec<(String, String)> {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(trim_phrase)
        .filter(|w| !w.is_empty())
        .collect();

    let mut scored: Vec<(f64, String, String)> = Vec::new();
    for record in catalog.records() {
        let target = record.address.to_lowercase();
        let width = target.split_whitespace().count();
        if width == 0 || width > words.len() {
            continue;
        }
        let best = words
            .windows(width)
            .map(|window| window.join(" "))
            // explicit references are exact or nothing
            .filter(|phrase| !BUILDING_RE.is_match(phrase) && !TENANT_REF_RE.is_match(phrase))
            .map(|phrase| {
                let score = strsim::normalized_levenshtein(&phrase.to_lowercase(), &target);
                (score, phrase)
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((score, phrase)) = best {
            if score >= FUZZY_THRESHOLD {
                scored.push((score, phrase, record.address.clone()));
            }
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .map(|(_, phrase, address)| (phrase, address))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetProvider, InMemoryDataset};
    use serde_json::json;

    fn catalog() -> EntityCatalog {
        let rows = InMemoryDataset::from_values(vec![
            json!({"address": "Building 120"}),
            json!({"address": "Building 160"}),
            json!({"address": "742 Evergreen Terrace", "property_name": "Simpson House"}),
        ])
        .rows(None)
        .unwrap();
        EntityCatalog::builder(rows)
            .with_aliases(vec![("the house".to_string(), "742 Evergreen Terrace".to_string())])
            .build()
    }

    #[test]
    fn test_alias_then_pattern() {
        let catalog = catalog();
        let found = extract_addresses("Compare the house with Building 120 and Building 999", &catalog, 4);
        let summary: Vec<(&str, Option<&str>, AddressSource)> = found
            .iter()
            .map(|f| (f.term.as_str(), f.address.as_deref(), f.source))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("the house", Some("742 Evergreen Terrace"), AddressSource::Alias),
                ("Building 120", Some("Building 120"), AddressSource::Alias),
                ("Building 999", None, AddressSource::BuildingPattern),
            ]
        );
        assert_eq!(found[2].value(), "Building 999");
    }

    #[test]
    fn test_fuzzy_fallback_catches_typos() {
        let catalog = catalog();
        let found = extract_addresses("details for 742 Evergren Terrace please", &catalog, 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, AddressSource::Fuzzy);
        assert_eq!(found[0].address.as_deref(), Some("742 Evergreen Terrace"));
        assert_eq!(found[0].term, "742 Evergren Terrace");
    }

    #[test]
    fn test_max_is_respected() {
        let catalog = catalog();
        let found = extract_addresses("Building 120, Building 160 and the house", &catalog, 2);
        assert_eq!(found.len(), 2);
        assert!(extract_addresses("anything", &EntityCatalog::empty(), 3).is_empty());
    }
}
