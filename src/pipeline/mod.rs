//! Three-phase pipeline driver.
//!
//! ```text
//! phase 1: monster catalog  -> TagIndex            ┐ independent,
//! phase 2: spawn-tag table  -> SpawnMetadataStore  ┘ run concurrently
//! phase 3: map geometry     -> MapEntityResolver -> SpawnSink  (parallel per map)
//! ```
//!
//! Phase 3 only starts once both structures are fully built and is handed
//! shared references to them. A failure in one map's geometry is logged and
//! recorded in the report; every other map still resolves.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use crate::catalog::{self, MapRecord, MonsterCatalogEntry, SpawnTagRow};
use crate::config::PipelineConfig;
use crate::constants::PROGRESS_LOG_INTERVAL;
use crate::error::{GeometryError, Result};
use crate::geometry::{DirectoryGeometrySource, GeometrySource, MapIdResolver, MapTable};
use crate::logging::TimingSpan;
use crate::resolver::{MapEntityResolver, MapStats, MemorySink, OutputTables, SpawnSink};
use crate::spawn_meta::{MapId, SpawnMetadataStore};
use crate::tags::TagIndex;

/// A map whose geometry could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFailure {
    pub xblock: String,
    pub map_id: MapId,
    pub reason: String,
}

/// Totals for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub indexed_tags: usize,
    pub indexed_monsters: usize,
    pub spawn_regions: usize,
    pub metadata_overwrites: usize,
    pub maps_processed: usize,
    pub blocks_unmapped: usize,
    pub maps_failed: Vec<MapFailure>,
    pub totals: MapStats,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn summary_line(&self) -> String {
        format!(
            "Processed {} maps, {} NPCs, {} portals, {} mob spawns ({} failed, {} unmapped blocks)",
            self.maps_processed,
            self.totals.npc_spawns,
            self.totals.portals,
            self.totals.mob_spawns,
            self.maps_failed.len(),
            self.blocks_unmapped,
        )
    }
}

/// Phase 1 and 2 output; immutable once constructed
#[derive(Debug)]
pub struct BuiltIndexes {
    pub tags: TagIndex,
    pub metadata: SpawnMetadataStore,
}

impl BuiltIndexes {
    pub fn resolver(&self) -> MapEntityResolver<'_> {
        MapEntityResolver::new(&self.tags, &self.metadata)
    }
}

/// Runs phases 1 and 2. The two builds are independent and run on separate
/// rayon workers.
pub fn build_indexes(
    threshold: u32,
    catalog: &[MonsterCatalogEntry],
    spawn_tags: Vec<SpawnTagRow>,
) -> BuiltIndexes {
    let (tags, metadata) = rayon::join(
        || {
            let _span = TimingSpan::new("tag_index");
            let index = TagIndex::from_catalog(threshold, catalog);
            info!(
                tags = index.tag_count(),
                monsters = index.monster_count(),
                "Tag index built"
            );
            index
        },
        || {
            let _span = TimingSpan::new("spawn_metadata");
            let store = SpawnMetadataStore::from_rows(spawn_tags);
            info!(
                regions = store.len(),
                maps = store.map_count(),
                overwrites = store.overwrite_count(),
                "Spawn metadata parsed"
            );
            store
        },
    );
    BuiltIndexes { tags, metadata }
}

/// Outcome of one geometry block in phase 3
enum BlockOutcome {
    Unmapped,
    Resolved(MapStats),
    Failed(MapFailure),
}

/// Runs phase 3 over every block of `geometry`
pub fn resolve_maps<G, M, S>(
    indexes: &BuiltIndexes,
    geometry: &G,
    map_ids: &M,
    sink: &S,
    parallel: bool,
) -> Result<PipelineReport>
where
    G: GeometrySource + ?Sized,
    M: MapIdResolver + ?Sized,
    S: SpawnSink + ?Sized,
{
    let _span = TimingSpan::new("resolve_maps");
    let resolver = indexes.resolver();
    let blocks = geometry.blocks()?;
    let processed = AtomicUsize::new(0);

    let resolve_block = |xblock: &String| -> BlockOutcome {
        let Some(map_id) = map_ids.map_id(xblock) else {
            return BlockOutcome::Unmapped;
        };

        let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PROGRESS_LOG_INTERVAL == 0 {
            let name = map_ids.map_name(map_id).unwrap_or("");
            info!("Processing xblock {}: {} ({})", n, xblock, name);
        }

        let result = geometry
            .load_block(xblock)
            .and_then(|entities| resolver.resolve_map(xblock, map_id, &entities, sink));

        match result {
            Ok(stats) => BlockOutcome::Resolved(stats),
            Err(err) => {
                warn!(xblock = %xblock, map_id, error = %err, "Map skipped after geometry failure");
                BlockOutcome::Failed(MapFailure {
                    xblock: xblock.clone(),
                    map_id,
                    reason: failure_reason(&err),
                })
            }
        }
    };

    let outcomes: Vec<BlockOutcome> = if parallel {
        blocks.par_iter().map(resolve_block).collect()
    } else {
        blocks.iter().map(resolve_block).collect()
    };

    let mut report = PipelineReport {
        indexed_tags: indexes.tags.tag_count(),
        indexed_monsters: indexes.tags.monster_count(),
        spawn_regions: indexes.metadata.len(),
        metadata_overwrites: indexes.metadata.overwrite_count(),
        ..Default::default()
    };

    for outcome in outcomes {
        match outcome {
            BlockOutcome::Unmapped => report.blocks_unmapped += 1,
            BlockOutcome::Resolved(stats) => {
                report.maps_processed += 1;
                report.totals += stats;
            }
            BlockOutcome::Failed(failure) => report.maps_failed.push(failure),
        }
    }

    Ok(report)
}

fn failure_reason(err: &GeometryError) -> String {
    match err {
        GeometryError::BlockUnavailable { reason, .. } => reason.clone(),
        GeometryError::MalformedEntity { index, reason, .. } => {
            format!("entity #{index}: {reason}")
        }
    }
}

/// In-memory inputs for a complete run
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub catalog: Vec<MonsterCatalogEntry>,
    pub spawn_tags: Vec<SpawnTagRow>,
    pub maps: Vec<MapRecord>,
}

impl Datasets {
    /// Read every dataset named by `config`; any failure is fatal
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let _span = TimingSpan::new("load_datasets");
        let catalog = catalog::load_catalog(&config.catalog_path)?;
        let spawn_tags = catalog::load_spawn_tags(&config.spawn_tags_path)?;
        let maps = catalog::load_maps(&config.maps_path)?;
        info!(
            monsters = catalog.len(),
            spawn_rows = spawn_tags.len(),
            maps = maps.len(),
            "Datasets loaded"
        );
        Ok(Self {
            catalog,
            spawn_tags,
            maps,
        })
    }
}

/// Runs all three phases into an in-memory sink
pub fn run<G: GeometrySource + ?Sized>(
    config: &PipelineConfig,
    datasets: Datasets,
    geometry: &G,
) -> Result<(OutputTables, PipelineReport)> {
    let started = Instant::now();
    let Datasets {
        catalog,
        spawn_tags,
        maps,
    } = datasets;

    let indexes = build_indexes(config.monster_id_threshold, &catalog, spawn_tags);
    let map_table = MapTable::from_records(&maps);
    let sink = MemorySink::new();

    let mut report = resolve_maps(&indexes, geometry, &map_table, &sink, config.parallel)?;
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!("{}", report.summary_line());

    Ok((sink.into_tables(), report))
}

/// Loads datasets and directory geometry from `config` and runs the pipeline
pub fn run_from_config(config: &PipelineConfig) -> Result<(OutputTables, PipelineReport)> {
    let datasets = Datasets::load(config)?;
    let geometry = DirectoryGeometrySource::new(&config.geometry_dir);
    run(config, datasets, &geometry)
}
