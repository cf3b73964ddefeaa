//! Athlete detail cache with lazy, jittered refresh.
//!
//! Batches queue their ids; the idle pass decides which entries are stale
//! (each with its own random deadline so refreshes spread out), applies
//! cached data to the rest and prunes expired entries.

use std::collections::HashMap;

use crate::api::types::{AthleteDetail, AthleteId};
use crate::components::entity::AthleteFlags;
use crate::core::store::EntityStore;
use crate::core::time::Millis;
use crate::systems::rng::Rng;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailEntry {
    /// Last time a refresh was requested for this id.
    pub ts: Millis,
    pub data: Option<AthleteDetail>,
}

pub struct DetailCache {
    entries: HashMap<AthleteId, DetailEntry>,
    queued: Vec<AthleteId>,
    refresh_base: Millis,
    refresh_jitter: Millis,
    ttl: Millis,
    rng: Rng,
}

impl DetailCache {
    pub fn new(refresh_base: Millis, refresh_jitter: Millis, ttl: Millis, seed: u64) -> Self {
        Self {
            entries: HashMap::new(),
            queued: Vec::new(),
            refresh_base,
            refresh_jitter,
            ttl,
            rng: Rng::new(seed),
        }
    }

    pub fn get(&self, id: AthleteId) -> Option<&DetailEntry> {
        self.entries.get(&id)
    }

    /// Display name from cached detail data.
    pub fn name(&self, id: AthleteId) -> Option<&str> {
        self.entries
            .get(&id)?
            .data
            .as_ref()?
            .athlete
            .as_ref()?
            .f_last
            .as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue ids for the next refresh pass.
    pub fn enqueue(&mut self, ids: impl IntoIterator<Item = AthleteId>) {
        self.queued.extend(ids);
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    /// Process queued ids.
    ///
    /// Returns the ids whose details should be fetched. Their entries are
    /// stamped with `now` whether or not the fetch happens, so an unanswered
    /// request simply leaves the entry stale until its next deadline.
    pub fn refresh(&mut self, now: Millis, store: &mut EntityStore) -> Vec<AthleteId> {
        let mut refresh = Vec::new();
        for id in std::mem::take(&mut self.queued) {
            if !store.contains(id) || refresh.contains(&id) {
                continue;
            }
            let ts = self.entries.get(&id).map_or(0.0, |e| e.ts);
            let deadline = self.refresh_base + self.rng.next_f64() * self.refresh_jitter;
            if now - ts > deadline {
                self.entries.entry(id).or_default().ts = now;
                refresh.push(id);
            } else if let Some(data) = self.entries.get(&id).and_then(|e| e.data.as_ref()) {
                apply_flags(store, id, data);
            }
        }
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.ts <= ttl);
        refresh
    }

    /// Store fetched records and update the entities they describe.
    ///
    /// Records for ids with no cache entry (pruned or never requested) still
    /// update a live entity but are not cached.
    pub fn apply(&mut self, records: Vec<AthleteDetail>, store: &mut EntityStore) {
        for record in records {
            let id = record.athlete_id;
            apply_flags(store, id, &record);
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.data = Some(record);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.queued.clear();
    }
}

fn apply_flags(store: &mut EntityStore, id: AthleteId, detail: &AthleteDetail) {
    let changed = store
        .get_mut(id)
        .is_some_and(|e| e.set_flags(AthleteFlags::from_detail(detail)));
    if changed {
        store.mark_restyle(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AthleteInfo;
    use crate::components::entity::Entity;
    use crate::extensions::smoothing::ExpWeightedAvg;
    use crate::extensions::transition::Transition;

    fn store_with(ids: &[u32]) -> EntityStore {
        let mut store = EntityStore::new();
        for &id in ids {
            let id = AthleteId(id);
            store.get_or_insert_with(id, || {
                Entity::new(id, Transition::new(2000.0), ExpWeightedAvg::new(6.0, 1000.0))
            });
        }
        store
    }

    fn cache(seed: u64) -> DetailCache {
        DetailCache::new(30_000.0, 60_000.0, 300_000.0, seed)
    }

    fn leader(id: u32) -> AthleteDetail {
        AthleteDetail {
            athlete_id: AthleteId(id),
            athlete: Some(AthleteInfo {
                f_last: Some("B. Fast".into()),
                ..AthleteInfo::default()
            }),
            event_leader: true,
            event_sweeper: false,
        }
    }

    #[test]
    fn age_at_base_never_refreshes() {
        for seed in 1..200 {
            let mut store = store_with(&[1]);
            let mut c = cache(seed);
            c.enqueue([AthleteId(1)]);
            assert_eq!(c.refresh(100_000.0, &mut store), vec![AthleteId(1)]);
            c.enqueue([AthleteId(1)]);
            assert!(c.refresh(130_000.0, &mut store).is_empty());
        }
    }

    #[test]
    fn age_past_base_plus_jitter_always_refreshes() {
        for seed in 1..200 {
            let mut store = store_with(&[1]);
            let mut c = cache(seed);
            c.enqueue([AthleteId(1)]);
            c.refresh(100_000.0, &mut store);
            c.enqueue([AthleteId(1)]);
            assert_eq!(c.refresh(190_001.0, &mut store), vec![AthleteId(1)]);
            assert_eq!(c.get(AthleteId(1)).unwrap().ts, 190_001.0);
        }
    }

    #[test]
    fn missing_entities_are_skipped() {
        let mut store = store_with(&[1]);
        let mut c = cache(3);
        c.enqueue([AthleteId(1), AthleteId(2), AthleteId(1)]);
        assert_eq!(c.refresh(100_000.0, &mut store), vec![AthleteId(1)]);
        assert!(c.get(AthleteId(2)).is_none());
    }

    #[test]
    fn apply_fills_cache_and_flags() {
        let mut store = store_with(&[1]);
        let mut c = cache(3);
        c.enqueue([AthleteId(1)]);
        c.refresh(100_000.0, &mut store);
        c.apply(vec![leader(1)], &mut store);
        assert_eq!(c.name(AthleteId(1)), Some("B. Fast"));
        assert!(store.get(AthleteId(1)).unwrap().visual.flags.leader);
        assert_eq!(store.take_restyled(), vec![AthleteId(1)]);
        // Same flags again: no restyle.
        c.apply(vec![leader(1)], &mut store);
        assert!(store.take_restyled().is_empty());
    }

    #[test]
    fn cached_data_applies_between_refreshes() {
        let mut store = store_with(&[1]);
        let mut c = cache(3);
        c.enqueue([AthleteId(1)]);
        c.refresh(100_000.0, &mut store);
        c.apply(vec![leader(1)], &mut store);
        store.get_mut(AthleteId(1)).unwrap().set_flags(AthleteFlags::default());
        c.enqueue([AthleteId(1)]);
        assert!(c.refresh(101_000.0, &mut store).is_empty());
        assert!(store.get(AthleteId(1)).unwrap().visual.flags.leader);
    }

    #[test]
    fn uncached_record_is_not_stored() {
        let mut store = store_with(&[1]);
        let mut c = cache(3);
        c.apply(vec![leader(1)], &mut store);
        assert!(c.is_empty());
        assert!(store.get(AthleteId(1)).unwrap().visual.flags.leader);
    }

    #[test]
    fn ttl_prunes_entries() {
        let mut store = store_with(&[1, 2]);
        let mut c = cache(3);
        c.enqueue([AthleteId(1)]);
        c.refresh(100_000.0, &mut store);
        c.enqueue([AthleteId(2)]);
        c.refresh(400_000.0, &mut store);
        assert!(c.get(AthleteId(1)).is_some());
        c.refresh(400_001.0, &mut store);
        assert!(c.get(AthleteId(1)).is_none());
        assert!(c.get(AthleteId(2)).is_some());
    }
}
