//! Shared, refreshable catalog reference
//!
//! Readers take an `Arc` snapshot and keep using it for the whole request.
//! `refresh` builds a complete new catalog outside the lock and swaps the
//! pointer, so no reader ever sees a partially built catalog and the write
//! lock is held only for the swap.

use std::sync::{Arc, PoisonError, RwLock};

use super::catalog::EntityCatalog;
use super::embedder::Embedder;
use crate::dataset::{AliasProvider, DatasetProvider};
use crate::error::CatalogError;

/// Columns the catalog reads from the dataset
pub const CATALOG_COLUMNS: &[&str] = &[
    "address",
    "property_name",
    "city",
    "state",
    "tenant_name",
    "price",
    "pnl",
];

/// Where a catalog is built from
#[derive(Clone)]
pub struct CatalogSource {
    pub dataset: Arc<dyn DatasetProvider>,
    pub aliases: Option<Arc<dyn AliasProvider>>,
    pub embedder: Option<Arc<dyn Embedder>>,
}

impl CatalogSource {
    pub fn new(dataset: Arc<dyn DatasetProvider>) -> Self {
        Self {
            dataset,
            aliases: None,
            embedder: None,
        }
    }

    pub fn with_aliases(mut self, aliases: Arc<dyn AliasProvider>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Read the providers and build a catalog; an empty result is an error
    pub fn build(&self) -> Result<EntityCatalog, CatalogError> {
        let rows = self.dataset.rows(Some(CATALOG_COLUMNS))?;
        let aliases = match &self.aliases {
            Some(provider) => provider.aliases()?,
            None => Vec::new(),
        };

        let mut builder = EntityCatalog::builder(rows).with_aliases(aliases);
        if let Some(embedder) = &self.embedder {
            builder = builder.with_embedder(Arc::clone(embedder));
        }
        let catalog = builder.build();
        if catalog.is_empty() {
            return Err(CatalogError::EmptyDataset);
        }
        Ok(catalog)
    }
}

/// Process-wide catalog shared by every session
pub struct CatalogHandle {
    current: RwLock<Arc<EntityCatalog>>,
    source: Option<CatalogSource>,
}

impl CatalogHandle {
    /// Wrap an already built catalog; `refresh` keeps it as is
    pub fn from_catalog(catalog: EntityCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
            source: None,
        }
    }

    /// Build the first catalog from `source`
    pub fn load(source: CatalogSource) -> Result<Self, CatalogError> {
        let catalog = source.build()?;
        tracing::info!(
            records = catalog.len(),
            fingerprint = catalog.fingerprint(),
            "entity catalog loaded"
        );
        Ok(Self {
            current: RwLock::new(Arc::new(catalog)),
            source: Some(source),
        })
    }

    /// Current catalog; the snapshot stays valid across a concurrent refresh
    pub fn snapshot(&self) -> Arc<EntityCatalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rebuild from the source and swap it in.
    ///
    /// On failure the previous catalog stays in place.
    pub fn refresh(&self) -> Result<Arc<EntityCatalog>, CatalogError> {
        let Some(source) = &self.source else {
            return Ok(self.snapshot());
        };

        source.dataset.invalidate();
        let rebuilt = Arc::new(source.build()?);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&rebuilt))
        };

        tracing::info!(
            records = rebuilt.len(),
            previous = previous.fingerprint(),
            fingerprint = rebuilt.fingerprint(),
            "entity catalog refreshed"
        );
        Ok(rebuilt)
    }
}

impl std::fmt::Debug for CatalogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CatalogHandle")
            .field("records", &snapshot.len())
            .field("fingerprint", &snapshot.fingerprint())
            .field("refreshable", &self.source.is_some())
            .finish()
    }
}
