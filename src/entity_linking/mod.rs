//! Entity linking for property mentions
//!
//! ## Architecture
//!
//! ```text
//! DatasetProvider ─┐
//!                  ├─► CatalogBuilder ─► EntityCatalog ──► CatalogHandle (Arc swap)
//! AliasProvider ───┘        │                 │
//!                      Embedder (opt)     search / alias_hits
//!                                             │
//!                           MentionResolver ◄─┘
//!                      alias → building → street → segments → backfill
//! ```
//!
//! - `normalize`: text folding and similarity tokens
//! - `tfidf`: sparse TF-IDF vector space
//! - `embedder`: optional embedding backend and score blending
//! - `catalog`: canonical records, alias index, search
//! - `resolver`: multi-mention resolution with tagged outcomes
//! - `handle`: shared, refreshable catalog reference

pub mod catalog;
pub mod embedder;
pub mod handle;
pub mod normalize;
pub mod resolver;
pub mod tfidf;

pub use catalog::{build_catalog, inject_aliases, CatalogBuilder, EntityCatalog, EntityRecord};
pub use embedder::Embedder;
pub use handle::{CatalogHandle, CatalogSource};
pub use resolver::{
    EntityMatch, MatchSource, MentionOutcome, MentionResolution, MentionResolver, UnresolvedReason,
};
