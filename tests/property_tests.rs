//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL inputs:
//! - Tag index: indexed monsters resolve, NPC ids never do
//! - Tag index: empty queries are empty, resolution is repeatable
//! - Metadata store: lookup returns exactly the latest ingest

use proptest::prelude::*;
use std::collections::HashSet;

use spawn_pipeline::constants::MONSTER_ID_THRESHOLD;
use spawn_pipeline::{SpawnMetadataStore, SpawnRegionConfig, TagIndex};

fn tag() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn monster_id() -> impl Strategy<Value = u32> {
    (MONSTER_ID_THRESHOLD + 1)..=u32::MAX
}

fn npc_id() -> impl Strategy<Value = u32> {
    0..=MONSTER_ID_THRESHOLD
}

fn region_config() -> impl Strategy<Value = SpawnRegionConfig> {
    (
        any::<i32>(),
        any::<i32>(),
        any::<i32>(),
        any::<i32>(),
        prop::collection::vec(tag(), 0..5),
        any::<i32>(),
        any::<i32>(),
    )
        .prop_map(
            |(min_difficulty, max_difficulty, population, cooldown, tags, pet_population, pet_spawn_rate)| {
                SpawnRegionConfig {
                    min_difficulty,
                    max_difficulty,
                    population,
                    cooldown,
                    tags,
                    pet_population,
                    pet_spawn_rate,
                }
            },
        )
}

// ============================================================
// Tag Index Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_added_monster_resolves(id in monster_id(), t in tag()) {
        let mut index = TagIndex::new();
        index.add_monster(id, &[t.as_str()]);
        prop_assert!(index.resolve(&[t.as_str()]).contains(&id));
    }

    #[test]
    fn prop_npc_ids_never_resolve(
        ids in prop::collection::vec(npc_id(), 1..20),
        tags in prop::collection::vec(tag(), 1..6),
    ) {
        let mut index = TagIndex::new();
        for id in &ids {
            index.add_monster(*id, &tags);
        }
        let resolved = index.resolve(&tags);
        for id in &ids {
            prop_assert!(!resolved.contains(id));
        }
    }

    #[test]
    fn prop_mixed_catalog_excludes_npcs(
        monsters in prop::collection::vec(monster_id(), 0..20),
        npcs in prop::collection::vec(npc_id(), 0..20),
        t in tag(),
    ) {
        let mut index = TagIndex::new();
        for id in monsters.iter().chain(npcs.iter()) {
            index.add_monster(*id, &[t.as_str()]);
        }
        let resolved = index.resolve(&[t.as_str()]);
        let expected: HashSet<u32> = monsters.iter().copied().collect();
        prop_assert_eq!(resolved, expected);
    }

    #[test]
    fn prop_empty_query_is_empty(
        entries in prop::collection::vec((monster_id(), prop::collection::vec(tag(), 0..4)), 0..20),
    ) {
        let mut index = TagIndex::new();
        for (id, tags) in &entries {
            index.add_monster(*id, tags);
        }
        let empty: [&str; 0] = [];
        prop_assert!(index.resolve(&empty).is_empty());
    }

    #[test]
    fn prop_resolve_is_repeatable(
        entries in prop::collection::vec((monster_id(), prop::collection::vec(tag(), 0..4)), 0..20),
        query in prop::collection::vec(tag(), 0..5),
    ) {
        let mut index = TagIndex::new();
        for (id, tags) in &entries {
            index.add_monster(*id, tags);
        }
        let first = index.resolve(&query);
        let second = index.resolve(&query);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_reinsertion_is_idempotent(id in monster_id(), tags in prop::collection::vec(tag(), 1..5)) {
        let mut once = TagIndex::new();
        once.add_monster(id, &tags);
        let mut twice = once.clone();
        twice.add_monster(id, &tags);
        prop_assert_eq!(once.resolve(&tags), twice.resolve(&tags));
        prop_assert_eq!(once.tag_count(), twice.tag_count());
    }
}

// ============================================================
// Spawn Metadata Store Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_untouched_store_misses(map in any::<u32>(), point in any::<u32>()) {
        let store = SpawnMetadataStore::new();
        prop_assert!(store.lookup(map, point).is_none());
    }

    #[test]
    fn prop_lookup_returns_ingested(map in any::<u32>(), point in any::<u32>(), cfg in region_config()) {
        let mut store = SpawnMetadataStore::new();
        store.ingest(map, point, cfg.clone());
        prop_assert_eq!(store.lookup(map, point), Some(&cfg));
    }

    #[test]
    fn prop_reingest_replaces(
        map in any::<u32>(),
        point in any::<u32>(),
        first in region_config(),
        second in region_config(),
    ) {
        let mut store = SpawnMetadataStore::new();
        store.ingest(map, point, first);
        store.ingest(map, point, second.clone());
        let stored = store.lookup(map, point).unwrap();
        prop_assert_eq!(&stored.tags, &second.tags);
        prop_assert_eq!(stored, &second);
        prop_assert_eq!(store.len(), 1);
    }
}
