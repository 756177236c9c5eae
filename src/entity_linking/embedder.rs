//! Optional embedding backend for hybrid similarity
//!
//! When an [`Embedder`] is attached to the catalog, document vectors are
//! computed once at build time and each search blends cosine similarity with
//! the lexical TF-IDF score. A warm-up failure disables blending for that
//! catalog; a query-time failure falls back to lexical scores for that call.

use std::sync::Arc;

use anyhow::Result;

/// Weight of the TF-IDF score in a blended search
pub const LEXICAL_WEIGHT: f64 = 0.6;
/// Weight of the rescaled embedding cosine in a blended search
pub const EMBEDDING_WEIGHT: f64 = 0.4;

/// Text embedding model
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Embed catalog documents (target side)
    fn embed_documents(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a user phrase (query side)
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Document vectors for one catalog build
#[derive(Clone)]
pub struct DocumentEmbeddings {
    embedder: Arc<dyn Embedder>,
    vectors: Vec<Vec<f32>>,
}

impl std::fmt::Debug for DocumentEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEmbeddings")
            .field("model", &self.embedder.model_name())
            .field("documents", &self.vectors.len())
            .finish()
    }
}

impl DocumentEmbeddings {
    /// Embed every document. Returns `None` (and logs) when the backend fails
    /// or returns a vector count that does not line up with the documents.
    pub fn warm(embedder: Arc<dyn Embedder>, documents: &[&str]) -> Option<Self> {
        match embedder.embed_documents(documents) {
            Ok(vectors) if vectors.len() == documents.len() => {
                tracing::info!(
                    model = embedder.model_name(),
                    documents = vectors.len(),
                    "hybrid similarity enabled"
                );
                Some(Self { embedder, vectors })
            }
            Ok(vectors) => {
                tracing::warn!(
                    model = embedder.model_name(),
                    expected = documents.len(),
                    got = vectors.len(),
                    "embedding count mismatch, falling back to TF-IDF"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    model = embedder.model_name(),
                    error = %e,
                    "failed to warm document embeddings, falling back to TF-IDF"
                );
                None
            }
        }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Blend lexical scores with embedding similarity for `text`.
    ///
    /// `None` when the query embedding could not be computed.
    pub fn blend(&self, text: &str, lexical: &[f64]) -> Option<Vec<f64>> {
        let query = match self.embedder.embed_query(text) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, using TF-IDF only");
                return None;
            }
        };

        Some(
            lexical
                .iter()
                .zip(&self.vectors)
                .map(|(lex, doc)| {
                    let rescaled = (cosine(&query, doc) + 1.0) / 2.0;
                    LEXICAL_WEIGHT * lex + EMBEDDING_WEIGHT * rescaled
                })
                .collect(),
        )
    }
}

/// Cosine similarity in [-1, 1]; zero-length vectors give 0
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let denom = (norm_a * norm_b).max(1e-9);
    (dot / denom).clamp(-1.0, 1.0)
}
