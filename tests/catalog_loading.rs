//! File-backed catalog loading, refresh and dispatch
//!
//! Run with: cargo test --test catalog_loading

mod helpers;

use std::fs;
use std::sync::Arc;

use portfolio_router::dataset::{DatasetProvider, JsonAliasFile, JsonFileDataset};
use portfolio_router::entity_linking::{CatalogHandle, CatalogSource};
use portfolio_router::{CatalogError, HandlerRegistry, RouteError, RoutedRequest};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

#[test]
fn test_sample_dataset_loads() {
    let catalog = helpers::sample_catalog().snapshot();
    let stats = catalog.stats();

    // Building 120 has two tenant rows but one record
    assert_eq!(stats.record_count, 7);
    assert_eq!(stats.tenant_count, 8);
    assert_eq!(stats.fingerprint.len(), 64);
    assert!(stats.embedding_model.is_none());

    let (_, tower) = catalog.lookup_alias("The Tower").expect("alias from file");
    assert_eq!(tower.address, "Building 180");
    let (_, harbor) = catalog.lookup_alias("harbor point").expect("display name alias");
    assert_eq!(harbor.address, "55 Pier Road");
}

#[test]
fn test_dataset_summary() {
    let dataset = JsonFileDataset::new(helpers::data_path("assets.json"));
    let summary = dataset.summary().unwrap();
    assert_eq!(summary.rows, 8);
    assert!(summary.columns.contains(&"tenant_name".to_string()));
    let pnl = &summary.numerics["pnl"];
    assert_eq!(pnl.count, 8);
    assert_eq!(pnl.min, -145000.0);
}

#[test]
fn test_refresh_rereads_dataset_file() {
    let dir = TempDir::new().unwrap();
    let assets = write(&dir, "assets.json", r#"[{"address": "Building 120", "price": 100.0}]"#);
    let aliases = write(&dir, "aliases.json", r#"{"Riverside": "Building 300", "": "Building 120"}"#);

    let source = CatalogSource::new(Arc::new(JsonFileDataset::new(&assets)))
        .with_aliases(Arc::new(JsonAliasFile::new(&aliases)));
    let handle = CatalogHandle::load(source).unwrap();
    let before = handle.snapshot();
    assert_eq!(before.len(), 1);
    // alias target not in the catalog yet
    assert!(before.lookup_alias("riverside").is_none());

    fs::write(
        &assets,
        r#"[{"address": "Building 120", "price": 100.0}, {"address": "Building 300", "price": 250.0}]"#,
    )
    .unwrap();
    let after = handle.refresh().unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after.lookup_alias("RIVERSIDE").map(|(_, r)| r.address.as_str()), Some("Building 300"));
    assert_ne!(before.fingerprint(), after.fingerprint());
    // earlier snapshots are untouched
    assert_eq!(before.len(), 1);
}

#[test]
fn test_refresh_to_empty_file_keeps_catalog() {
    let dir = TempDir::new().unwrap();
    let assets = write(&dir, "assets.json", r#"[{"address": "Building 120"}]"#);
    let handle = CatalogHandle::load(CatalogSource::new(Arc::new(JsonFileDataset::new(&assets)))).unwrap();

    fs::write(&assets, "[]").unwrap();
    assert!(matches!(handle.refresh(), Err(CatalogError::EmptyDataset)));
    assert_eq!(handle.snapshot().len(), 1);

    fs::write(&assets, "{not json").unwrap();
    assert!(matches!(handle.refresh(), Err(CatalogError::DatasetFile { .. })));
    assert_eq!(handle.snapshot().len(), 1);
}

#[test]
fn test_malformed_alias_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let assets = write(&dir, "assets.json", r#"[{"address": "Building 120"}]"#);
    let aliases = write(&dir, "aliases.json", "[1, 2]");

    let source = CatalogSource::new(Arc::new(JsonFileDataset::new(&assets)))
        .with_aliases(Arc::new(JsonAliasFile::new(&aliases)));
    assert!(matches!(CatalogHandle::load(source), Err(CatalogError::AliasFile { .. })));
}

#[tokio::test]
async fn test_routed_comparison_dispatches_to_catalog_handler() {
    let sup = helpers::supervisor();
    let registry = HandlerRegistry::new().with_catalog_handlers(sup.catalog().clone());

    let (_, outcome) = sup.start("Compare the tower with Harbor Point").await;
    let routed = outcome.routed().expect("both properties resolve");
    assert_eq!(
        routed,
        &RoutedRequest::PriceComparison {
            addresses: ["Building 180".to_string(), "55 Pier Road".to_string()]
        }
    );

    let response = registry.dispatch(routed).await.unwrap();
    assert_eq!(response.payload["result"]["difference"], -11400000.0);
    assert_eq!(
        response.message.as_deref(),
        Some("Harbor Point is valued USD 11,400,000.00 above Building 180.")
    );
}

#[tokio::test]
async fn test_pnl_without_aggregator_is_not_dispatched() {
    let sup = helpers::supervisor();
    let registry = HandlerRegistry::new().with_catalog_handlers(sup.catalog().clone());

    let (_, outcome) = sup.start("Show me the P&L for Building 180 for March 2025.").await;
    let routed = outcome.routed().expect("routable");
    assert!(matches!(
        registry.dispatch(routed).await,
        Err(RouteError::NoHandler("pnl"))
    ));
}
