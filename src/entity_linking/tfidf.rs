//! Sparse TF-IDF vector space over catalog documents
//!
//! Raw term counts weighted by smoothed inverse document frequency
//! (`ln((1 + n) / (1 + df)) + 1`), L2-normalised, compared by cosine.
//! Query terms missing from the fitted vocabulary carry no weight.

use std::collections::HashMap;

use super::normalize::term_tokens;

/// Term index → weight, sorted by term index
type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, Default)]
pub struct TermSpace {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: Vec<SparseVector>,
}

impl TermSpace {
    /// Fit vocabulary and idf weights, then vectorise every document
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| term_tokens(d.as_ref())).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen_in_doc: Vec<usize> = Vec::new();
            for token in tokens {
                let next_index = vocabulary.len();
                let index = *vocabulary.entry(token.clone()).or_insert(next_index);
                if index == doc_freq.len() {
                    doc_freq.push(0);
                }
                if !seen_in_doc.contains(&index) {
                    seen_in_doc.push(index);
                    doc_freq[index] += 1;
                }
            }
        }

        let n = tokenized.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut space = Self {
            vocabulary,
            idf,
            documents: Vec::with_capacity(tokenized.len()),
        };
        let documents: Vec<SparseVector> = tokenized.iter().map(|t| space.vectorize(t)).collect();
        space.documents = documents;
        space
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Cosine similarity of `text` against every document, in document order.
    ///
    /// All zeros when the query shares no terms with the vocabulary.
    pub fn scores(&self, text: &str) -> Vec<f64> {
        let query = self.vectorize(&term_tokens(text));
        self.documents
            .iter()
            .map(|doc| sparse_dot(&query, doc))
            .collect()
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        vector.sort_by_key(|(index, _)| *index);

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in vector.iter_mut() {
                *w /= norm;
            }
        }
        vector
    }
}

fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
