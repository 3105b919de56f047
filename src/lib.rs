//! Spawn Pipeline - content database builder for map spawns
//!
//! Joins three independently authored datasets into "which monster may spawn
//! where" rows:
//! - Tag index over the monster catalog (tag -> monster ids)
//! - Spawn metadata store keyed by (map id, spawn-point id)
//! - Map entity resolver over per-map geometry (NPC spawn points, portals,
//!   mob spawn regions)
//!
//! ## Usage
//! ```rust,ignore
//! let config = PipelineConfig::load(Path::new("pipeline.ron"))?;
//! let (tables, report) = pipeline::run_from_config(&config)?;
//! tables.write_to(&config.output_path)?;
//! println!("{}", report.summary_line());
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod resolver;
pub mod spawn_meta;
pub mod tags;

pub use config::PipelineConfig;
pub use error::{GeometryError, PipelineError, Result};
pub use pipeline::{PipelineReport, run, run_from_config};
pub use resolver::{MapEntityResolver, MemorySink, OutputTables, SpawnSink};
pub use spawn_meta::{SpawnMetadataStore, SpawnRegionConfig};
pub use tags::TagIndex;
