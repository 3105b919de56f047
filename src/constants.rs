//! Centralized constants for the spawn pipeline.
//!
//! Business rules that partition id spaces or tune logging live here so the
//! index, resolver and config agree on one value.

// =====================================================
// Id spaces
// =====================================================

/// Monster-id threshold. Ids at or below belong to friendly NPCs and are
/// never indexed by tag; only ids strictly above are monsters.
pub const MONSTER_ID_THRESHOLD: u32 = 20_000_000;

// =====================================================
// Progress reporting
// =====================================================

/// Emit a progress line every N processed maps
pub const PROGRESS_LOG_INTERVAL: usize = 10;

// =====================================================
// Environment overrides
// =====================================================

/// Overrides `PipelineConfig::monster_id_threshold`
pub const ENV_THRESHOLD: &str = "SPAWN_PIPELINE_THRESHOLD";

/// Overrides every input path with `<dir>/<default file name>`
pub const ENV_DATA_DIR: &str = "SPAWN_PIPELINE_DATA_DIR";

/// Overrides `PipelineConfig::output_path`
pub const ENV_OUTPUT: &str = "SPAWN_PIPELINE_OUTPUT";

// =====================================================
// Default dataset file names (relative to the data dir)
// =====================================================

pub const DEFAULT_CATALOG_FILE: &str = "monsters.json";
pub const DEFAULT_SPAWN_TAGS_FILE: &str = "spawn_tags.json";
pub const DEFAULT_MAPS_FILE: &str = "maps.json";
pub const DEFAULT_GEOMETRY_DIR: &str = "xblock";
pub const DEFAULT_OUTPUT_FILE: &str = "map_spawns.json";
