use std::collections::BTreeSet;

use glam::Vec2;

use crate::api::types::AthleteId;
use crate::core::store::EntityStore;
use crate::core::time::Millis;
use crate::renderer::frame::{EntityStyle, EntityTransform, FrameCapacity, FrameOutput, PinPlacement};
use crate::renderer::transform::{project_with, MapTransform};

/// Per-frame inputs of the entity pass.
#[derive(Debug, Clone, Copy)]
pub struct EntityFrameParams<'a> {
    pub now: Millis,
    /// World units to entity layer pixels (`map_scale * layer_scale`);
    /// `None` until a layer scale exists, in which case nothing is emitted.
    pub scale: Option<f32>,
    /// Entity layer offset inside the map layer.
    pub layer_offset: Vec2,
    pub capacity: FrameCapacity,
    /// Ids whose removal has not reached the surface yet; they stay pending.
    pub held: &'a [AthleteId],
}

/// Emit transforms for pending entities, styles for new or changed ones and
/// pin placements, into `out`.
///
/// Entities whose transition has finished leave the pending set. At most
/// `capacity.entities` pending entities are visited per frame; the rest stay
/// pending and the next frame resumes after the last one visited. Restyles
/// over capacity carry over the same way. Pins are read in one pass and
/// written in a second so a surface backed by layout queries never
/// interleaves reads and writes.
pub fn build_entity_frame(store: &mut EntityStore, params: &EntityFrameParams, map: Option<&MapTransform>, out: &mut FrameOutput) {
    let Some(scale) = params.scale else {
        return;
    };
    let limit = params.capacity.entities;

    let mut styled: BTreeSet<AthleteId> = BTreeSet::new();
    let mut visited = 0;
    let mut cursor = None;
    let mut stopped = false;
    for id in store.pending_round_robin() {
        if params.held.contains(&id) {
            continue;
        }
        if visited == limit {
            log::debug!("entity pass at capacity {}", limit);
            stopped = true;
            break;
        }
        visited += 1;
        cursor = Some(id);
        let Some(entity) = store.get_mut(id) else {
            continue;
        };
        if let Some(pos) = entity.position(params.now) {
            out.entities.push(EntityTransform {
                id: id.0,
                x: pos.x * scale,
                y: pos.y * scale,
            });
        }
        if entity.attach() {
            out.attached.push(id);
            styled.insert(id);
        }
        if !entity.transition.is_playing() {
            store.settle(id);
        }
    }
    store.set_pending_cursor(if stopped { cursor } else { None });

    for id in store.take_restyled() {
        if styled.contains(&id) || styled.len() < limit {
            styled.insert(id);
        } else {
            store.mark_restyle(id);
        }
    }
    out.styles.extend(
        styled
            .into_iter()
            .filter_map(|id| store.get(id))
            .filter(|e| e.visual.attached)
            .map(EntityStyle::of),
    );

    let Some(map) = map else {
        return;
    };
    let matrix = map.matrix();
    let mut reads: Vec<(AthleteId, Vec2)> = Vec::new();
    for id in store.pinned_ids() {
        let Some(entity) = store.get_mut(id) else {
            continue;
        };
        if !entity.visual.attached {
            continue;
        }
        if let Some(pos) = entity.position(params.now) {
            reads.push((id, params.layer_offset + pos * scale));
        }
    }
    reads.truncate(params.capacity.pins);
    for (id, layer_pos) in reads {
        let p = project_with(&matrix, layer_pos);
        out.pins.push(PinPlacement { id: id.0, x: p.x, y: p.y });
    }
}
