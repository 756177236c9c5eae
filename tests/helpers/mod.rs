//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use portfolio_router::dataset::{JsonAliasFile, JsonFileDataset};
use portfolio_router::entity_linking::{CatalogHandle, CatalogSource};
use portfolio_router::{IntentClassifier, Supervisor};

pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

/// Catalog loaded from the sample dataset and alias file
pub fn sample_catalog() -> Arc<CatalogHandle> {
    let source = CatalogSource::new(Arc::new(JsonFileDataset::new(data_path("assets.json"))))
        .with_aliases(Arc::new(JsonAliasFile::new(data_path("address_aliases.json"))));
    Arc::new(CatalogHandle::load(source).expect("sample dataset loads"))
}

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

/// Rules-only supervisor with a pinned clock
pub fn supervisor() -> Supervisor {
    Supervisor::new(sample_catalog()).with_classifier(IntentClassifier::new().with_today(fixed_today()))
}
