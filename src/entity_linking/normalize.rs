//! Text normalization for entity matching
//!
//! Two flavours:
//! - [`normalize_text`]: NFKC fold, lowercase, punctuation to spaces,
//!   collapsed whitespace. Used for alias keys and phrase comparison.
//! - [`term_tokens`]: similarity-space tokens. Words of two or more
//!   characters with English stop words removed.

use unicode_normalization::UnicodeNormalization;

/// English stop words dropped from the similarity space
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either", "few",
    "find", "for", "from", "further", "get", "give", "had", "has", "have", "having", "he", "her",
    "here", "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself",
    "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "out", "over", "own", "please", "same", "see",
    "she", "should", "show", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
    "until", "up", "us", "very", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Normalize text for matching.
///
/// # Examples
///
/// ```
/// use portfolio_router::entity_linking::normalize::normalize_text;
///
/// assert_eq!(normalize_text("  Building-180, Austin "), "building 180 austin");
/// assert_eq!(normalize_text("P&L"), "p l");
/// ```
pub fn normalize_text(s: &str) -> String {
    let folded: String = s.nfkc().collect();

    let stripped: String = folded
        .chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check if a token is an English stop word
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Tokenize for the similarity space.
///
/// Single-character tokens and stop words are dropped.
pub fn term_tokens(s: &str) -> Vec<String> {
    normalize_text(s)
        .split_whitespace()
        .filter(|t| t.chars().count() > 1 && !is_stop_word(t))
        .map(|t| t.to_string())
        .collect()
}

/// Title-case each whitespace separated word (`"building 180"` → `"Building 180"`)
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte offsets where `needle` occurs in `haystack` without touching an
/// alphanumeric character on either side. Callers lowercase both sides.
pub fn word_bounded_positions<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack
        .match_indices(needle)
        .map(|(i, _)| i)
        .filter(move |&i| {
            if needle.is_empty() {
                return false;
            }
            let before = haystack[..i].chars().next_back();
            let after = haystack[i + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
}

/// First word-bounded occurrence of `needle`
pub fn find_word_bounded(haystack: &str, needle: &str) -> Option<usize> {
    word_bounded_positions(haystack, needle).next()
}
