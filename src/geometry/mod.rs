//! Map geometry entities and the sources that provide them.
//!
//! A geometry block (one per map) is a list of placed entities. Each entity
//! carries a position, a rotation and one or more capabilities: an NPC spawn
//! point with attached monster ids, a portal, or a mob spawn region that must
//! be resolved through spawn metadata and the tag index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::catalog::{self, DataFormat, MapRecord};
use crate::error::{GeometryError, PipelineError, Result};
use crate::spawn_meta::{MapId, SpawnPointId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Integer coordinates as written to the content tables (truncated toward zero)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl From<Vec3> for Coord3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x as i32,
            y: v.y as i32,
            z: v.z as i32,
        }
    }
}

/// What a placed entity can do. One entity may expose several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    NpcSpawnPoint {
        /// Attached monster ids as authored; non-numeric entries are ignored
        #[serde(default)]
        npc_list: Vec<String>,
        #[serde(default)]
        spawn_on_create: bool,
        #[serde(default)]
        patrol_data: Option<String>,
    },
    Portal {
        portal_id: i32,
        target_map_id: i32,
        #[serde(default)]
        target_portal_id: i32,
        #[serde(default)]
        portal_type: i32,
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default = "default_true")]
        visible: bool,
        #[serde(default = "default_true")]
        minimap_visible: bool,
    },
    MobSpawnRegion { spawn_point_id: SpawnPointId },
}

fn default_true() -> bool {
    true
}

impl Capability {
    /// Numeric monster ids attached to an NPC spawn point, in authored order
    pub fn attached_npc_ids(&self) -> Vec<u32> {
        match self {
            Capability::NpcSpawnPoint { npc_list, .. } => npc_list
                .iter()
                .filter_map(|raw| raw.trim().parse::<u32>().ok())
                .collect(),
            Capability::Portal { .. } | Capability::MobSpawnRegion { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryEntity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl GeometryEntity {
    pub fn new(name: impl Into<String>, position: Vec3, rotation: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            rotation,
            capabilities: Vec::new(),
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Shorthand for a mob spawn region entity
    pub fn mob_region(spawn_point_id: SpawnPointId, position: Vec3) -> Self {
        Self::new(format!("SpawnRegion_{spawn_point_id}"), position, Vec3::ZERO)
            .with(Capability::MobSpawnRegion { spawn_point_id })
    }

    /// Scenery, triggers and meshes carry no spawn capability
    pub fn is_inert(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Structural check; an entity with non-finite coordinates cannot be placed.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let finite = |v: &Vec3| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        if !finite(&self.position) || !finite(&self.rotation) {
            return Err(format!("entity '{}' has non-finite transform", self.name));
        }
        Ok(())
    }
}

/// Geometry for one block as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryBlock {
    #[serde(default)]
    pub entities: Vec<GeometryEntity>,
}

/// Provider of per-map geometry.
///
/// `blocks` failing is fatal for the run. `load_block` failing only drops
/// that one map.
pub trait GeometrySource: Send + Sync {
    fn blocks(&self) -> Result<Vec<String>>;
    fn load_block(&self, xblock: &str) -> std::result::Result<Vec<GeometryEntity>, GeometryError>;
}

/// Geometry held in memory, keyed by block name
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeometry {
    blocks: Vec<(String, Vec<GeometryEntity>)>,
}

impl InMemoryGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, xblock: impl Into<String>, entities: Vec<GeometryEntity>) {
        self.blocks.push((xblock.into(), entities));
    }

    pub fn with_block(mut self, xblock: impl Into<String>, entities: Vec<GeometryEntity>) -> Self {
        self.insert(xblock, entities);
        self
    }
}

impl GeometrySource for InMemoryGeometry {
    fn blocks(&self) -> Result<Vec<String>> {
        Ok(self.blocks.iter().map(|(name, _)| name.clone()).collect())
    }

    fn load_block(&self, xblock: &str) -> std::result::Result<Vec<GeometryEntity>, GeometryError> {
        self.blocks
            .iter()
            .find(|(name, _)| name == xblock)
            .map(|(_, entities)| entities.clone())
            .ok_or_else(|| GeometryError::BlockUnavailable {
                xblock: xblock.to_string(),
                reason: "no such block".to_string(),
            })
    }
}

/// One geometry file per block (`<xblock>.json` or `<xblock>.ron`) in a directory.
///
/// When both files exist for one block, the block is listed once and the
/// `.json` file is the one loaded.
#[derive(Debug, Clone)]
pub struct DirectoryGeometrySource {
    dir: PathBuf,
}

impl DirectoryGeometrySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn block_path(&self, xblock: &str) -> Option<PathBuf> {
        ["json", "ron"]
            .iter()
            .map(|ext| self.dir.join(format!("{xblock}.{ext}")))
            .find(|path| path.is_file())
    }
}

impl GeometrySource for DirectoryGeometrySource {
    fn blocks(&self) -> Result<Vec<String>> {
        let read_dir = std::fs::read_dir(&self.dir).map_err(|source| PipelineError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names = BTreeSet::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| PipelineError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || DataFormat::from_path(&path).is_none() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !names.insert(stem.to_string()) {
                    warn!(xblock = stem, "Block has both .json and .ron geometry; using .json");
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    fn load_block(&self, xblock: &str) -> std::result::Result<Vec<GeometryEntity>, GeometryError> {
        let path = self
            .block_path(xblock)
            .ok_or_else(|| GeometryError::BlockUnavailable {
                xblock: xblock.to_string(),
                reason: format!("no geometry file in {}", self.dir.display()),
            })?;

        catalog::load_document::<GeometryBlock>(&path)
            .map(|block| block.entities)
            .map_err(|e| GeometryError::BlockUnavailable {
                xblock: xblock.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Maps a geometry block name to a numeric map id
pub trait MapIdResolver: Send + Sync {
    fn map_id(&self, xblock: &str) -> Option<MapId>;

    /// Display name of a map, when the resolver knows one
    fn map_name(&self, _map_id: MapId) -> Option<&str> {
        None
    }
}

/// Block-name lookup built from the maps table; names compare case-insensitively
#[derive(Debug, Clone, Default)]
pub struct MapTable {
    by_xblock: HashMap<String, MapId>,
    names: HashMap<MapId, String>,
}

impl MapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a MapRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.insert(record.id, &record.xblock_name, &record.name);
        }
        table
    }

    pub fn insert(&mut self, map_id: MapId, xblock: &str, name: &str) {
        self.by_xblock.insert(xblock.to_lowercase(), map_id);
        self.names.insert(map_id, name.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_xblock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_xblock.is_empty()
    }
}

impl MapIdResolver for MapTable {
    fn map_id(&self, xblock: &str) -> Option<MapId> {
        self.by_xblock.get(&xblock.to_lowercase()).copied()
    }

    fn map_name(&self, map_id: MapId) -> Option<&str> {
        self.names.get(&map_id).map(String::as_str)
    }
}

impl MapIdResolver for HashMap<String, MapId> {
    fn map_id(&self, xblock: &str) -> Option<MapId> {
        if let Some(id) = self.get(xblock) {
            return Some(*id);
        }
        let wanted = xblock.to_lowercase();
        self.iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_truncates_toward_zero() {
        let c = Coord3::from(Vec3::new(1.9, -2.7, 0.4));
        assert_eq!(c, Coord3 { x: 1, y: -2, z: 0 });
    }

    #[test]
    fn test_attached_npc_ids_skip_non_numeric() {
        let cap = Capability::NpcSpawnPoint {
            npc_list: vec!["11000001".into(), "abc".into(), " 11000002 ".into(), "".into()],
            spawn_on_create: true,
            patrol_data: None,
        };
        assert_eq!(cap.attached_npc_ids(), vec![11_000_001, 11_000_002]);
        assert!(Capability::MobSpawnRegion { spawn_point_id: 1 }
            .attached_npc_ids()
            .is_empty());
    }

    #[test]
    fn test_validate() {
        let bare = GeometryEntity::new("Tree01", Vec3::ZERO, Vec3::ZERO);
        assert!(bare.is_inert());
        assert!(bare.validate().is_ok());

        let ok = GeometryEntity::mob_region(3, Vec3::new(1.0, 2.0, 3.0));
        assert!(ok.validate().is_ok());

        let mut nan = ok.clone();
        nan.position.x = f32::NAN;
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_capability_json_shape() {
        let json = r#"{
            "name": "Portal_01",
            "position": {"x": 1.0, "y": 2.0, "z": 3.0},
            "capabilities": [
                {"kind": "portal", "portal_id": 2, "target_map_id": 2000001},
                {"kind": "mob_spawn_region", "spawn_point_id": 7}
            ]
        }"#;
        let entity: GeometryEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.capabilities.len(), 2);
        match &entity.capabilities[0] {
            Capability::Portal {
                enabled,
                visible,
                minimap_visible,
                target_portal_id,
                ..
            } => {
                assert!(*enabled && *visible && *minimap_visible);
                assert_eq!(*target_portal_id, 0);
            }
            other => panic!("Expected Portal, got {other:?}"),
        }
        assert_eq!(entity.rotation, Vec3::ZERO);
    }

    #[test]
    fn test_map_table_case_insensitive() {
        let records = vec![MapRecord {
            id: 2000001,
            name: "Tria".into(),
            xblock_name: "02000001_tria".into(),
        }];
        let table = MapTable::from_records(&records);
        assert_eq!(table.map_id("02000001_TRIA"), Some(2000001));
        assert_eq!(table.map_id("unknown"), None);
        assert_eq!(table.map_name(2000001), Some("Tria"));
    }

    #[test]
    fn test_plain_map_lookup_case_insensitive() {
        let ids: HashMap<String, MapId> = HashMap::from([("02000001_Tria".to_string(), 2000001)]);
        assert_eq!(ids.map_id("02000001_Tria"), Some(2000001));
        assert_eq!(ids.map_id("02000001_TRIA"), Some(2000001));
        assert_eq!(ids.map_id("02000002_tria"), None);
        assert_eq!(ids.map_name(2000001), None);
    }

    #[test]
    fn test_in_memory_geometry() {
        let source = InMemoryGeometry::new()
            .with_block("a", vec![GeometryEntity::mob_region(1, Vec3::ZERO)]);
        assert_eq!(source.blocks().unwrap(), vec!["a".to_string()]);
        assert_eq!(source.load_block("a").unwrap().len(), 1);
        assert!(matches!(
            source.load_block("b"),
            Err(GeometryError::BlockUnavailable { .. })
        ));
    }
}
