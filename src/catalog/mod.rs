//! Input datasets: monster catalog, spawn-tag table, maps table.
//!
//! Records are plain serde types. Files are read as JSON or RON by
//! extension; any read or parse failure is fatal for the run because there
//! is no partial-success contract for a corrupted source dataset.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::spawn_meta::SpawnRegionConfig;

/// One monster catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterCatalogEntry {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MonsterCatalogEntry {
    pub fn new<I, S>(id: u32, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            name: String::new(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Flat spawn-tag table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTagRow {
    pub map_id: u32,
    pub spawn_point_id: u32,
    #[serde(flatten)]
    pub config: SpawnRegionConfig,
}

/// Spawn-tag table grouped per map, the way the game table stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSpawnTable {
    pub map_id: u32,
    pub regions: Vec<SpawnRegionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRegionEntry {
    pub spawn_point_id: u32,
    #[serde(flatten)]
    pub config: SpawnRegionConfig,
}

impl MapSpawnTable {
    /// Flatten into rows, preserving region order
    pub fn into_rows(self) -> impl Iterator<Item = SpawnTagRow> {
        let map_id = self.map_id;
        self.regions.into_iter().map(move |region| SpawnTagRow {
            map_id,
            spawn_point_id: region.spawn_point_id,
            config: region.config,
        })
    }
}

/// Spawn-tag dataset in either layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpawnTagRecord {
    Grouped(MapSpawnTable),
    Flat(SpawnTagRow),
}

/// Flatten a mixed spawn-tag dataset into rows in file order
pub fn flatten_spawn_tags(records: Vec<SpawnTagRecord>) -> Vec<SpawnTagRow> {
    let mut rows = Vec::new();
    for record in records {
        match record {
            SpawnTagRecord::Grouped(table) => rows.extend(table.into_rows()),
            SpawnTagRecord::Flat(row) => rows.push(row),
        }
    }
    rows
}

/// One row of the maps table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub xblock_name: String,
}

/// Dataset serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Ron,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DataFormat::Json),
            "ron" => Some(DataFormat::Ron),
            _ => None,
        }
    }
}

/// Parse a single value from `text` in the format implied by `path`
pub fn parse_document<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T> {
    match DataFormat::from_path(path) {
        Some(DataFormat::Json) => serde_json::from_str(text).map_err(|source| PipelineError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some(DataFormat::Ron) => ron::from_str(text).map_err(|source| PipelineError::Ron {
            path: path.to_path_buf(),
            source,
        }),
        None => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read a whole file as one document
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if DataFormat::from_path(path).is_none() {
        return Err(PipelineError::UnsupportedFormat(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(path, &text)
}

/// Read a file holding a list of records
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let records: Vec<T> = load_document(path)?;
    debug!(path = %path.display(), count = records.len(), "Loaded dataset");
    Ok(records)
}

pub fn load_catalog(path: &Path) -> Result<Vec<MonsterCatalogEntry>> {
    load_records(path)
}

pub fn load_spawn_tags(path: &Path) -> Result<Vec<SpawnTagRow>> {
    load_records(path).map(flatten_spawn_tags)
}

pub fn load_maps(path: &Path) -> Result<Vec<MapRecord>> {
    load_records(path)
}
