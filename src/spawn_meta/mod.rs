//! Spawn region metadata keyed by (map id, spawn-point id).
//!
//! Populated from the spawn-tag table in the second phase. A later ingest for
//! the same key replaces the earlier config wholesale; overwrites are counted,
//! logged and optionally reported to a hook, but never rejected.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::catalog::SpawnTagRow;

pub type MapId = u32;
pub type SpawnPointId = u32;

/// Authored configuration for one spawn region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRegionConfig {
    pub min_difficulty: i32,
    pub max_difficulty: i32,
    pub population: i32,
    pub cooldown: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pet_population: i32,
    #[serde(default)]
    pub pet_spawn_rate: i32,
}

impl SpawnRegionConfig {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Called with (map, point, replaced, replacement) on every overwrite
pub type OverwriteHook =
    Box<dyn Fn(MapId, SpawnPointId, &SpawnRegionConfig, &SpawnRegionConfig) + Send + Sync>;

#[derive(Default)]
pub struct SpawnMetadataStore {
    regions: HashMap<(MapId, SpawnPointId), SpawnRegionConfig>,
    overwrites: usize,
    overwrite_hook: Option<OverwriteHook>,
}

impl fmt::Debug for SpawnMetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnMetadataStore")
            .field("regions", &self.regions.len())
            .field("overwrites", &self.overwrites)
            .field("overwrite_hook", &self.overwrite_hook.is_some())
            .finish()
    }
}

impl SpawnMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from spawn-tag rows in table order (last row per key wins)
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = SpawnTagRow>,
    {
        let mut store = Self::new();
        store.ingest_rows(rows);
        store
    }

    pub fn set_overwrite_hook(&mut self, hook: OverwriteHook) {
        self.overwrite_hook = Some(hook);
    }

    /// Store `config` at the key, returning the config it replaced
    pub fn ingest(
        &mut self,
        map_id: MapId,
        spawn_point_id: SpawnPointId,
        config: SpawnRegionConfig,
    ) -> Option<SpawnRegionConfig> {
        let previous = self.regions.insert((map_id, spawn_point_id), config);

        if let Some(old) = &previous {
            self.overwrites += 1;
            debug!(
                map_id,
                spawn_point_id,
                old_tags = ?old.tags,
                "Spawn metadata overwritten"
            );
            if let Some(hook) = &self.overwrite_hook {
                if let Some(new) = self.regions.get(&(map_id, spawn_point_id)) {
                    hook(map_id, spawn_point_id, old, new);
                }
            }
        }

        previous
    }

    pub fn ingest_rows<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = SpawnTagRow>,
    {
        for row in rows {
            self.ingest(row.map_id, row.spawn_point_id, row.config);
        }
    }

    /// Config for the key, or `None` when no metadata was authored for it
    pub fn lookup(&self, map_id: MapId, spawn_point_id: SpawnPointId) -> Option<&SpawnRegionConfig> {
        self.regions.get(&(map_id, spawn_point_id))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of ingests that replaced an existing entry
    pub fn overwrite_count(&self) -> usize {
        self.overwrites
    }

    /// Distinct maps that have at least one region
    pub fn map_count(&self) -> usize {
        let mut maps: Vec<MapId> = self.regions.keys().map(|(map, _)| *map).collect();
        maps.sort_unstable();
        maps.dedup();
        maps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_config() -> SpawnRegionConfig {
        SpawnRegionConfig {
            min_difficulty: 1,
            max_difficulty: 5,
            population: 3,
            cooldown: 60,
            tags: vec!["forest".into(), "wolf".into()],
            pet_population: 1,
            pet_spawn_rate: 20,
        }
    }

    #[test]
    fn test_lookup_on_empty_store() {
        let store = SpawnMetadataStore::new();
        assert!(store.lookup(5, 10).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_ingest_then_lookup() {
        let mut store = SpawnMetadataStore::new();
        let previous = store.ingest(5, 10, sample_config());
        assert!(previous.is_none());
        assert_eq!(store.lookup(5, 10), Some(&sample_config()));
        assert!(store.lookup(5, 11).is_none());
        assert!(store.lookup(6, 10).is_none());
    }

    #[test]
    fn test_reingest_replaces_whole_config() {
        let mut store = SpawnMetadataStore::new();
        store.ingest(5, 10, SpawnRegionConfig::with_tags(["a"]));
        let replaced = store.ingest(5, 10, SpawnRegionConfig::with_tags(["b"]));

        assert_eq!(replaced.map(|c| c.tags), Some(vec!["a".to_string()]));
        assert_eq!(store.lookup(5, 10).unwrap().tags, vec!["b".to_string()]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.overwrite_count(), 1);
    }

    #[test]
    fn test_overwrite_hook_observes_without_changing_result() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_hook = seen.clone();

        let mut store = SpawnMetadataStore::new();
        store.set_overwrite_hook(Box::new(move |map, point, old, new| {
            assert_eq!((map, point), (1, 2));
            assert_eq!(old.population, 3);
            assert_eq!(new.population, 9);
            seen_hook.fetch_add(1, Ordering::SeqCst);
        }));

        store.ingest(1, 2, sample_config());
        store.ingest(
            1,
            2,
            SpawnRegionConfig {
                population: 9,
                ..Default::default()
            },
        );

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(store.lookup(1, 2).unwrap().population, 9);
        assert!(store.lookup(1, 2).unwrap().tags.is_empty());
    }

    #[test]
    fn test_from_rows_last_row_wins() {
        let rows = vec![
            SpawnTagRow {
                map_id: 3,
                spawn_point_id: 1,
                config: SpawnRegionConfig::with_tags(["old"]),
            },
            SpawnTagRow {
                map_id: 4,
                spawn_point_id: 1,
                config: SpawnRegionConfig::with_tags(["other"]),
            },
            SpawnTagRow {
                map_id: 3,
                spawn_point_id: 1,
                config: SpawnRegionConfig::with_tags(["new"]),
            },
        ];
        let store = SpawnMetadataStore::from_rows(rows);
        assert_eq!(store.len(), 2);
        assert_eq!(store.map_count(), 2);
        assert_eq!(store.lookup(3, 1).unwrap().tags, vec!["new".to_string()]);
    }
}
