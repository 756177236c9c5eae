//! Dataset and alias providers
//!
//! The entity catalog is built from tabular rows supplied by a
//! [`DatasetProvider`] plus an optional phrase→address mapping supplied by an
//! [`AliasProvider`]. Rows are JSON objects so providers can hand over any
//! column set; the catalog only reads the columns it knows about.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::error::CatalogError;

/// One dataset row, keyed by column name
pub type DatasetRow = serde_json::Map<String, Value>;

/// Source of the rows backing the entity catalog
pub trait DatasetProvider: Send + Sync {
    /// Current rows, optionally projected onto `columns`
    fn rows(&self, columns: Option<&[&str]>) -> Result<Vec<DatasetRow>, CatalogError>;

    /// Drop any cached rows so the next `rows` call re-reads the source
    fn invalidate(&self) {}

    /// High level stats for diagnostics
    fn summary(&self) -> Result<DatasetSummary, CatalogError> {
        Ok(DatasetSummary::from_rows(&self.rows(None)?))
    }
}

/// Source of user-supplied alias → canonical address pairs
pub trait AliasProvider: Send + Sync {
    fn aliases(&self) -> Result<Vec<(String, String)>, CatalogError>;
}

fn project(rows: &[DatasetRow], columns: Option<&[&str]>) -> Vec<DatasetRow> {
    match columns {
        None => rows.to_vec(),
        Some(cols) => rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|(k, _)| cols.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect(),
    }
}

// ============================================================================
// In-memory dataset
// ============================================================================

/// Rows held in memory, mainly for tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    rows: Vec<DatasetRow>,
}

impl InMemoryDataset {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    /// Build from `serde_json::json!` objects; non-object values are skipped
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let rows = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self { rows }
    }
}

impl DatasetProvider for InMemoryDataset {
    fn rows(&self, columns: Option<&[&str]>) -> Result<Vec<DatasetRow>, CatalogError> {
        Ok(project(&self.rows, columns))
    }
}

// ============================================================================
// JSON file dataset
// ============================================================================

/// A JSON array of row objects on disk, cached after the first read
#[derive(Debug)]
pub struct JsonFileDataset {
    path: PathBuf,
    cache: RwLock<Option<Arc<Vec<DatasetRow>>>>,
}

impl JsonFileDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Arc<Vec<DatasetRow>>, CatalogError> {
        if let Some(rows) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(rows));
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let rows: Vec<DatasetRow> =
            serde_json::from_str(&raw).map_err(|source| CatalogError::DatasetFile {
                path: self.path.clone(),
                source,
            })?;
        let rows = Arc::new(rows);
        tracing::info!(path = %self.path.display(), rows = rows.len(), "dataset loaded");

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&rows));
        Ok(rows)
    }
}

impl DatasetProvider for JsonFileDataset {
    fn rows(&self, columns: Option<&[&str]>) -> Result<Vec<DatasetRow>, CatalogError> {
        let rows = self.load()?;
        Ok(project(&rows, columns))
    }

    fn invalidate(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ============================================================================
// Dataset summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Row count, column names and per-column numeric stats
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub numerics: BTreeMap<String, NumericSummary>,
}

impl DatasetSummary {
    pub fn from_rows(rows: &[DatasetRow]) -> Self {
        let mut columns = BTreeSet::new();
        let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for row in rows {
            for (key, value) in row {
                columns.insert(key.clone());
                if let Some(n) = value.as_f64() {
                    values.entry(key.clone()).or_default().push(n);
                }
            }
        }

        let numerics = values
            .into_iter()
            .map(|(column, nums)| {
                let count = nums.len();
                let min = nums.iter().copied().fold(f64::INFINITY, f64::min);
                let max = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = nums.iter().sum::<f64>() / count as f64;
                (
                    column,
                    NumericSummary {
                        count,
                        min,
                        max,
                        mean,
                    },
                )
            })
            .collect();

        Self {
            rows: rows.len(),
            columns: columns.into_iter().collect(),
            numerics,
        }
    }
}

// ============================================================================
// Alias providers
// ============================================================================

/// Fixed alias pairs
#[derive(Debug, Clone, Default)]
pub struct StaticAliases(pub Vec<(String, String)>);

impl AliasProvider for StaticAliases {
    fn aliases(&self) -> Result<Vec<(String, String)>, CatalogError> {
        Ok(self.0.clone())
    }
}

/// Alias JSON file (`{"the tower": "Building 180", ...}`)
#[derive(Debug, Clone)]
pub struct JsonAliasFile {
    path: PathBuf,
}

impl JsonAliasFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AliasProvider for JsonAliasFile {
    fn aliases(&self) -> Result<Vec<(String, String)>, CatalogError> {
        load_address_aliases(&self.path)
    }
}

/// Load user-defined address aliases.
///
/// A missing file is an empty mapping. Keys are lowercased; entries with an
/// empty key or empty target are skipped.
pub fn load_address_aliases(path: &Path) -> Result<Vec<(String, String)>, CatalogError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no alias file, continuing without aliases");
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)?;
    let data: serde_json::Map<String, Value> =
        serde_json::from_str(&raw).map_err(|source| CatalogError::AliasFile {
            path: path.to_path_buf(),
            source,
        })?;

    let aliases: Vec<(String, String)> = data
        .into_iter()
        .filter_map(|(key, value)| {
            let target = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let key = key.trim().to_lowercase();
            let target = target.trim().to_string();
            (!key.is_empty() && !target.is_empty()).then_some((key, target))
        })
        .collect();

    tracing::info!(path = %path.display(), aliases = aliases.len(), "address aliases loaded");
    Ok(aliases)
}
