//! Shared lexical patterns for property and tenant references

use std::sync::LazyLock;

use regex::Regex;

/// "Building 180" style short-form property references
pub static BUILDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbuilding\s+\d+\b").unwrap());

/// "Tenant 14" style numbered tenant references
pub static TENANT_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btenant\s+\d+\b").unwrap());

/// Street addresses: a house number, one to four words, a street suffix
pub static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{2,6}\s+(?:[a-z0-9.]+\s+){1,4}?(?:street|st|avenue|ave|road|rd|boulevard|blvd|drive|dr|lane|ln|court|ct|way|parkway|pkwy)\b\.?",
    )
    .unwrap()
});

/// Conjunctions that separate compared entities
pub static CONJUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:versus|vs|and|between|compared\s+to|compared\s+with|with|against|to)\b")
        .unwrap()
});

/// A digit or a property noun: the minimum signal for a free-form segment
pub static PROPERTY_SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d|\b(?:building|tower|plaza|property|suite|unit|center|centre|park)\b")
        .unwrap()
});

/// Years and quarter tokens, which must not count as property digits
pub static PERIOD_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:q[1-4]\s*)?(?:19|20)\d{2}(?:\s*-?\s*(?:q[1-4]|m\d{2}))?\b|\bq[1-4]\b")
        .unwrap()
});

/// Collapse a reference to its lowercase single-spaced form
fn canonical_reference(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased "building N" references in `text`, in order, deduplicated
pub fn building_references(text: &str) -> Vec<String> {
    collect_references(&BUILDING_RE, text)
}

/// Lowercased "tenant N" references in `text`, in order, deduplicated
pub fn tenant_references(text: &str) -> Vec<String> {
    collect_references(&TENANT_REF_RE, text)
}

fn collect_references(re: &Regex, text: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let canonical = canonical_reference(m.as_str());
        if !refs.contains(&canonical) {
            refs.push(canonical);
        }
    }
    refs
}

/// Trim whitespace and surrounding punctuation from a phrase
pub fn trim_phrase(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '?' | '!' | ';' | ':'))
}
