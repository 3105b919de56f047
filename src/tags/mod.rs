//! Inverted tag index over the monster catalog.
//!
//! Maps each catalog tag to the set of monster ids carrying it. Built once in
//! the first phase and then only read. Ids at or below the monster-id
//! threshold belong to friendly NPCs and never enter the index.

use std::collections::{HashMap, HashSet};

use crate::catalog::MonsterCatalogEntry;
use crate::constants::MONSTER_ID_THRESHOLD;

pub type MonsterId = u32;

#[derive(Debug, Clone)]
pub struct TagIndex {
    threshold: MonsterId,
    by_tag: HashMap<String, HashSet<MonsterId>>,
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TagIndex {
    /// Empty index using [`MONSTER_ID_THRESHOLD`]
    pub fn new() -> Self {
        Self::with_threshold(MONSTER_ID_THRESHOLD)
    }

    pub fn with_threshold(threshold: MonsterId) -> Self {
        Self {
            threshold,
            by_tag: HashMap::new(),
        }
    }

    /// Build from a full catalog
    pub fn from_catalog<'a, I>(threshold: MonsterId, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a MonsterCatalogEntry>,
    {
        let mut index = Self::with_threshold(threshold);
        for entry in entries {
            index.add_monster(entry.id, &entry.tags);
        }
        index
    }

    pub fn threshold(&self) -> MonsterId {
        self.threshold
    }

    /// Index `id` under every non-blank tag. No-op for ids at or below the
    /// threshold. Re-adding the same (id, tag) pair changes nothing.
    pub fn add_monster<S: AsRef<str>>(&mut self, id: MonsterId, tags: &[S]) {
        if id <= self.threshold {
            return;
        }

        for tag in tags {
            let tag = tag.as_ref();
            if tag.trim().is_empty() {
                continue;
            }
            self.by_tag.entry(tag.to_string()).or_default().insert(id);
        }
    }

    /// Union of the monster sets of every known tag in `tags`.
    /// Unknown tags contribute nothing; an empty query yields an empty set.
    pub fn resolve<S: AsRef<str>>(&self, tags: &[S]) -> HashSet<MonsterId> {
        let mut ids = HashSet::new();
        for tag in tags {
            if let Some(set) = self.by_tag.get(tag.as_ref()) {
                ids.extend(set.iter().copied());
            }
        }
        ids
    }

    /// Monsters carrying a single tag
    pub fn monsters_for(&self, tag: &str) -> Option<&HashSet<MonsterId>> {
        self.by_tag.get(tag)
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// Distinct monsters present under at least one tag
    pub fn monster_count(&self) -> usize {
        self.by_tag
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_resolve() {
        let mut index = TagIndex::new();
        index.add_monster(20_000_001, &["forest", "wolf"]);
        index.add_monster(20_000_002, &["forest"]);

        let forest = index.resolve(&["forest"]);
        assert_eq!(forest, HashSet::from([20_000_001, 20_000_002]));

        let wolf = index.resolve(&["wolf"]);
        assert_eq!(wolf, HashSet::from([20_000_001]));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut index = TagIndex::new();
        index.add_monster(MONSTER_ID_THRESHOLD, &["town"]);
        index.add_monster(11_000_001, &["town"]);
        assert!(index.resolve(&["town"]).is_empty());
        assert!(index.is_empty());

        index.add_monster(MONSTER_ID_THRESHOLD + 1, &["town"]);
        assert_eq!(
            index.resolve(&["town"]),
            HashSet::from([MONSTER_ID_THRESHOLD + 1])
        );
    }

    #[test]
    fn test_custom_threshold() {
        let mut index = TagIndex::with_threshold(100);
        index.add_monster(100, &["slime"]);
        index.add_monster(101, &["slime"]);
        assert_eq!(index.threshold(), 100);
        assert_eq!(index.resolve(&["slime"]), HashSet::from([101]));
    }

    #[test]
    fn test_blank_tags_skipped() {
        let mut index = TagIndex::new();
        index.add_monster(20_000_010, &["", "   ", "\t", "cave"]);
        assert_eq!(index.tag_count(), 1);
        assert!(index.resolve(&[""]).is_empty());
        assert_eq!(index.resolve(&["cave"]), HashSet::from([20_000_010]));
    }

    #[test]
    fn test_insertion_idempotent() {
        let mut index = TagIndex::new();
        index.add_monster(20_000_003, &["swamp"]);
        index.add_monster(20_000_003, &["swamp", "swamp"]);
        assert_eq!(index.monsters_for("swamp").map(HashSet::len), Some(1));
        assert_eq!(index.monster_count(), 1);
    }

    #[test]
    fn test_resolve_empty_and_unknown() {
        let mut index = TagIndex::new();
        index.add_monster(20_000_004, &["desert"]);
        let empty: [&str; 0] = [];
        assert!(index.resolve(&empty).is_empty());
        assert!(index.resolve(&["tundra"]).is_empty());
        assert_eq!(
            index.resolve(&["tundra", "desert"]),
            HashSet::from([20_000_004])
        );
    }

    #[test]
    fn test_resolve_union_has_no_duplicates() {
        let mut index = TagIndex::new();
        index.add_monster(20_000_005, &["a", "b"]);
        index.add_monster(20_000_006, &["b"]);
        let ids = index.resolve(&["a", "b", "a"]);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_from_catalog() {
        let catalog = vec![
            MonsterCatalogEntry::new(20_000_001, ["forest", "wolf"]),
            MonsterCatalogEntry::new(10_000_001, ["forest"]),
        ];
        let index = TagIndex::from_catalog(MONSTER_ID_THRESHOLD, &catalog);
        assert_eq!(index.resolve(&["forest"]), HashSet::from([20_000_001]));
        assert_eq!(index.tag_count(), 2);
    }
}
