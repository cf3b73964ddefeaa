use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use crate::api::types::AthleteId;
use crate::components::entity::{Entity, Pin};
use crate::core::time::Millis;

/// Entity arena keyed by athlete id, plus the working sets the render loop
/// walks each frame.
///
/// Sets are ordered so frame output is deterministic.
pub struct EntityStore {
    entities: HashMap<AthleteId, Entity>,
    /// Entities whose transform must be re-emitted.
    pending: BTreeSet<AthleteId>,
    /// Entities with an info pin.
    pinned: BTreeSet<AthleteId>,
    /// Entities whose visual marks changed since the last frame.
    restyle: BTreeSet<AthleteId>,
    /// Last pending id a capacity-limited frame reached.
    pending_cursor: Option<AthleteId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: HashMap::with_capacity(capacity),
            pending: BTreeSet::new(),
            pinned: BTreeSet::new(),
            restyle: BTreeSet::new(),
            pending_cursor: None,
        }
    }

    /// Get the entity for `id`, creating it with `make` on first sighting.
    pub fn get_or_insert_with(&mut self, id: AthleteId, make: impl FnOnce() -> Entity) -> &mut Entity {
        self.entities.entry(id).or_insert_with(|| {
            log::trace!("new entity {}", id);
            make()
        })
    }

    /// Remove an entity and every reference to it.
    pub fn despawn(&mut self, id: AthleteId) -> Option<Entity> {
        self.pending.remove(&id);
        self.pinned.remove(&id);
        self.restyle.remove(&id);
        self.entities.remove(&id)
    }

    pub fn get(&self, id: AthleteId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: AthleteId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: AthleteId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn mark_pending(&mut self, id: AthleteId) {
        if self.entities.contains_key(&id) {
            self.pending.insert(id);
        }
    }

    /// Force every entity to be re-emitted on the next frame.
    pub fn mark_all_pending(&mut self) {
        self.pending.extend(self.entities.keys().copied());
    }

    pub fn is_pending(&self, id: AthleteId) -> bool {
        self.pending.contains(&id)
    }

    pub fn pending_ids(&self) -> Vec<AthleteId> {
        self.pending.iter().copied().collect()
    }

    /// Pending ids starting after the cursor and wrapping around, so a
    /// capacity-limited frame resumes where the previous one stopped.
    pub fn pending_round_robin(&self) -> Vec<AthleteId> {
        let Some(cursor) = self.pending_cursor else {
            return self.pending_ids();
        };
        self.pending
            .range((Bound::Excluded(cursor), Bound::Unbounded))
            .chain(self.pending.range(..=cursor))
            .copied()
            .collect()
    }

    pub fn set_pending_cursor(&mut self, cursor: Option<AthleteId>) {
        self.pending_cursor = cursor;
    }

    /// Drop an entity from the pending set once its transition has settled.
    pub fn settle(&mut self, id: AthleteId) {
        self.pending.remove(&id);
    }

    pub fn mark_restyle(&mut self, id: AthleteId) {
        if self.entities.contains_key(&id) {
            self.restyle.insert(id);
        }
    }

    pub fn take_restyled(&mut self) -> Vec<AthleteId> {
        std::mem::take(&mut self.restyle).into_iter().collect()
    }

    /// Attach or detach an info pin. Returns the new pinned state, `None` for
    /// an unknown id.
    pub fn toggle_pin(&mut self, id: AthleteId) -> Option<bool> {
        let entity = self.entities.get_mut(&id)?;
        if entity.pin.take().is_some() {
            self.pinned.remove(&id);
            Some(false)
        } else {
            entity.pin = Some(Pin::default());
            self.pinned.insert(id);
            Some(true)
        }
    }

    pub fn pinned_ids(&self) -> Vec<AthleteId> {
        self.pinned.iter().copied().collect()
    }

    /// Evict entities unseen for longer than `timeout`. Returns their ids so
    /// the surface can release their nodes.
    pub fn gc(&mut self, now: Millis, timeout: Millis) -> Vec<AthleteId> {
        let mut stale: Vec<AthleteId> = self
            .entities
            .values()
            .filter(|e| now - e.last_seen > timeout)
            .map(|e| e.id)
            .collect();
        stale.sort_unstable();
        for id in &stale {
            self.despawn(*id);
        }
        if !stale.is_empty() {
            log::debug!("gc evicted {} entities", stale.len());
        }
        stale
    }

    /// Remove everything. Returns the ids of entities the surface had been given.
    pub fn clear(&mut self) -> Vec<AthleteId> {
        let mut attached: Vec<AthleteId> = self
            .entities
            .values()
            .filter(|e| e.visual.attached)
            .map(|e| e.id)
            .collect();
        attached.sort_unstable();
        self.entities.clear();
        self.pending.clear();
        self.pinned.clear();
        self.restyle.clear();
        self.pending_cursor = None;
        attached
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
