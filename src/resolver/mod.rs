//! Map entity resolution - the join between geometry, spawn metadata and the
//! tag index.
//!
//! ## Flow per entity
//! ```text
//! NpcSpawnPoint   -> one NpcSpawnRecord per attached monster id
//! Portal          -> one PortalRecord
//! MobSpawnRegion  -> lookup (map, point) in SpawnMetadataStore
//!                      miss            -> skip
//!                    resolve config tags in TagIndex
//!                      empty           -> skip
//!                    one MobSpawnRecord per candidate monster
//! ```
//!
//! The resolver only reads the index and the store, so one instance can be
//! shared by every worker thread in the resolution phase.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::Path;
use tracing::{debug, trace};

use crate::error::{GeometryError, PipelineError, Result};
use crate::geometry::{Capability, Coord3, GeometryEntity};
use crate::spawn_meta::{MapId, SpawnMetadataStore, SpawnPointId};
use crate::tags::{MonsterId, TagIndex};

// ============================================================================
// Output records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSpawnRecord {
    pub map_id: MapId,
    pub npc_id: MonsterId,
    pub coord: Coord3,
    pub rotation: Coord3,
    pub instance_name: String,
    pub is_spawn_on_field_create: bool,
    pub patrol_data_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalRecord {
    pub map_id: MapId,
    pub portal_id: i32,
    pub name: String,
    pub destination_map_id: i32,
    pub target_portal_id: i32,
    pub coord: Coord3,
    pub rotation: Coord3,
    pub portal_type: i32,
    pub is_enabled: bool,
    pub is_visible: bool,
    pub minimap_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobSpawnRecord {
    pub map_id: MapId,
    pub spawn_point_id: SpawnPointId,
    pub npc_id: MonsterId,
    pub coord: Coord3,
    pub rotation: Coord3,
    pub min_difficulty: i32,
    pub max_difficulty: i32,
    pub population: i32,
    pub cooldown: i32,
    pub pet_population: i32,
    pub pet_spawn_rate: i32,
}

/// The three output tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTables {
    pub npc_spawns: Vec<NpcSpawnRecord>,
    pub portals: Vec<PortalRecord>,
    pub mob_spawns: Vec<MobSpawnRecord>,
}

impl OutputTables {
    pub fn total_rows(&self) -> usize {
        self.npc_spawns.len() + self.portals.len() + self.mob_spawns.len()
    }

    /// Stable (map, point/portal, npc) ordering for diffable output files.
    /// Resolution itself makes no ordering promise.
    pub fn sort_for_output(&mut self) {
        self.npc_spawns
            .sort_by_key(|r| (r.map_id, r.npc_id, r.coord.x, r.coord.y, r.coord.z));
        self.portals.sort_by_key(|r| (r.map_id, r.portal_id));
        self.mob_spawns
            .sort_by_key(|r| (r.map_id, r.spawn_point_id, r.npc_id));
    }

    /// Write as pretty JSON or RON, chosen by extension
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let text = match crate::catalog::DataFormat::from_path(path) {
            Some(crate::catalog::DataFormat::Json) => serde_json::to_string_pretty(self)
                .map_err(|source| PipelineError::Json {
                    path: path.to_path_buf(),
                    source,
                })?,
            Some(crate::catalog::DataFormat::Ron) => {
                ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                    .map_err(|source| PipelineError::RonEncode {
                        path: path.to_path_buf(),
                        source,
                    })?
            }
            None => return Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Append-only destination for resolved records, shared across map workers
pub trait SpawnSink: Send + Sync {
    fn push_npc(&self, record: NpcSpawnRecord);
    fn push_portal(&self, record: PortalRecord);
    /// All records of one spawn region
    fn push_mobs(&self, records: Vec<MobSpawnRecord>);
}

/// In-memory sink; the lock is held only for the duration of one append
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<OutputTables>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> OutputTables {
        self.tables.lock().clone()
    }

    pub fn into_tables(self) -> OutputTables {
        self.tables.into_inner()
    }
}

impl SpawnSink for MemorySink {
    fn push_npc(&self, record: NpcSpawnRecord) {
        self.tables.lock().npc_spawns.push(record);
    }

    fn push_portal(&self, record: PortalRecord) {
        self.tables.lock().portals.push(record);
    }

    fn push_mobs(&self, records: Vec<MobSpawnRecord>) {
        self.tables.lock().mob_spawns.extend(records);
    }
}

// ============================================================================
// Per-map statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStats {
    pub npc_spawns: usize,
    pub portals: usize,
    pub mob_spawns: usize,
    /// Mob regions whose (map, point) had no authored metadata
    pub regions_without_metadata: usize,
    /// Mob regions whose tags matched no indexed monster
    pub regions_without_candidates: usize,
    /// Entities with no spawn capability (scenery, triggers)
    pub inert_entities: usize,
}

impl AddAssign for MapStats {
    fn add_assign(&mut self, other: Self) {
        self.npc_spawns += other.npc_spawns;
        self.portals += other.portals;
        self.mob_spawns += other.mob_spawns;
        self.regions_without_metadata += other.regions_without_metadata;
        self.regions_without_candidates += other.regions_without_candidates;
        self.inert_entities += other.inert_entities;
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Read-only view over the completed tag index and spawn metadata store.
///
/// Borrowing both structures means neither can be mutated while a resolver
/// exists, so resolution can only start once both build phases are done.
#[derive(Debug, Clone, Copy)]
pub struct MapEntityResolver<'a> {
    tags: &'a TagIndex,
    metadata: &'a SpawnMetadataStore,
}

impl<'a> MapEntityResolver<'a> {
    pub fn new(tags: &'a TagIndex, metadata: &'a SpawnMetadataStore) -> Self {
        Self { tags, metadata }
    }

    /// Resolve every entity of one map in source order.
    ///
    /// Entities without capabilities are counted and skipped. A structurally
    /// invalid entity aborts the rest of this map and is
    /// returned as an error; records already emitted for earlier entities
    /// stay in the sink.
    pub fn resolve_map<S: SpawnSink + ?Sized>(
        &self,
        xblock: &str,
        map_id: MapId,
        entities: &[GeometryEntity],
        sink: &S,
    ) -> std::result::Result<MapStats, GeometryError> {
        let mut stats = MapStats::default();

        for (index, entity) in entities.iter().enumerate() {
            if entity.is_inert() {
                stats.inert_entities += 1;
                continue;
            }
            entity
                .validate()
                .map_err(|reason| GeometryError::MalformedEntity {
                    xblock: xblock.to_string(),
                    index,
                    reason,
                })?;
            stats += self.resolve_entity(map_id, entity, sink);
        }

        debug!(
            xblock,
            map_id,
            npcs = stats.npc_spawns,
            portals = stats.portals,
            mobs = stats.mob_spawns,
            "Map resolved"
        );
        Ok(stats)
    }

    /// Dispatch each capability of one entity
    pub fn resolve_entity<S: SpawnSink + ?Sized>(
        &self,
        map_id: MapId,
        entity: &GeometryEntity,
        sink: &S,
    ) -> MapStats {
        let mut stats = MapStats::default();
        let coord = Coord3::from(entity.position);
        let rotation = Coord3::from(entity.rotation);

        for capability in &entity.capabilities {
            match capability {
                Capability::NpcSpawnPoint {
                    spawn_on_create,
                    patrol_data,
                    ..
                } => {
                    for npc_id in capability.attached_npc_ids() {
                        sink.push_npc(NpcSpawnRecord {
                            map_id,
                            npc_id,
                            coord,
                            rotation,
                            instance_name: entity.name.clone(),
                            is_spawn_on_field_create: *spawn_on_create,
                            patrol_data_uuid: patrol_data.clone().unwrap_or_default(),
                        });
                        stats.npc_spawns += 1;
                    }
                }
                Capability::Portal {
                    portal_id,
                    target_map_id,
                    target_portal_id,
                    portal_type,
                    enabled,
                    visible,
                    minimap_visible,
                } => {
                    sink.push_portal(PortalRecord {
                        map_id,
                        portal_id: *portal_id,
                        name: entity.name.clone(),
                        destination_map_id: *target_map_id,
                        target_portal_id: *target_portal_id,
                        coord,
                        rotation,
                        portal_type: *portal_type,
                        is_enabled: *enabled,
                        is_visible: *visible,
                        minimap_visible: *minimap_visible,
                    });
                    stats.portals += 1;
                }
                Capability::MobSpawnRegion { spawn_point_id } => {
                    let records = self.resolve_region(map_id, *spawn_point_id, coord, rotation);
                    match records {
                        RegionOutcome::NoMetadata => stats.regions_without_metadata += 1,
                        RegionOutcome::NoCandidates => stats.regions_without_candidates += 1,
                        RegionOutcome::Resolved(records) => {
                            stats.mob_spawns += records.len();
                            sink.push_mobs(records);
                        }
                    }
                }
            }
        }

        stats
    }

    /// Two-stage lookup for one mob spawn region
    pub fn resolve_region(
        &self,
        map_id: MapId,
        spawn_point_id: SpawnPointId,
        coord: Coord3,
        rotation: Coord3,
    ) -> RegionOutcome {
        let Some(config) = self.metadata.lookup(map_id, spawn_point_id) else {
            trace!(map_id, spawn_point_id, "No spawn metadata, region skipped");
            return RegionOutcome::NoMetadata;
        };

        let candidates = self.tags.resolve(&config.tags);
        if candidates.is_empty() {
            trace!(map_id, spawn_point_id, tags = ?config.tags, "No monsters for region tags");
            return RegionOutcome::NoCandidates;
        }

        let records = candidates
            .into_iter()
            .map(|npc_id| MobSpawnRecord {
                map_id,
                spawn_point_id,
                npc_id,
                coord,
                rotation,
                min_difficulty: config.min_difficulty,
                max_difficulty: config.max_difficulty,
                population: config.population,
                cooldown: config.cooldown,
                pet_population: config.pet_population,
                pet_spawn_rate: config.pet_spawn_rate,
            })
            .collect();

        RegionOutcome::Resolved(records)
    }
}

/// Result of resolving one mob spawn region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    NoMetadata,
    NoCandidates,
    Resolved(Vec<MobSpawnRecord>),
}
