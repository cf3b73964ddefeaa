//! Road layer: smooth road paths, clip boxes, the active road and highlight
//! routes for the current course, in road-layer units.

use glam::Vec2;

use crate::assets::roads::{RoadId, RoadNetwork};
use crate::assets::world::{WorldMeta, ROAD_LAYER_SCALE};
use crate::systems::spline::{smooth_path, SmoothPath};

/// A drawable road.
#[derive(Debug, Clone)]
pub struct RoadShape {
    pub id: RoadId,
    /// Surface style classes, one per sport (`sport-cycling`, ...).
    pub classes: Vec<String>,
    pub path: SmoothPath,
    /// Clip rectangle `[min, max]` limiting where the path is shown.
    pub clip: [Vec2; 2],
}

/// A highlighted route drawn above the road surfaces.
#[derive(Debug, Clone)]
pub struct HighlightPath {
    pub id: String,
    pub path: SmoothPath,
}

/// Everything the surface needs to draw the road network of one course.
#[derive(Debug, Clone, Default)]
pub struct RoadLayer {
    pub view_box: [f32; 4],
    /// Drawn in order; multi-sport roads come last so they sit on top.
    pub roads: Vec<RoadShape>,
    pub active: Option<RoadId>,
    pub highlights: Vec<HighlightPath>,
    revision: u32,
}

impl RoadLayer {
    pub fn new(world: &WorldMeta) -> Self {
        Self {
            view_box: world.road_view_box(),
            ..Self::default()
        }
    }

    /// Bumped on every change so the surface can tell when to redraw.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn road(&self, id: RoadId) -> Option<&RoadShape> {
        self.roads.iter().find(|r| r.id == id)
    }

    /// Build road shapes for `ids` (or the whole network).
    ///
    /// Missing ids are logged and skipped; roads without cycling or running
    /// are not drawn.
    pub fn render_roads(&mut self, world: &WorldMeta, network: &RoadNetwork, ids: Option<&[RoadId]>, smoothing: f32) {
        let mut ids: Vec<RoadId> = match ids {
            Some(ids) => ids.to_vec(),
            None => {
                let mut all: Vec<RoadId> = network.roads.keys().copied().collect();
                all.sort_unstable();
                all
            }
        };
        // Overlapping roads: draw multi-sport ones last so their style wins.
        ids.sort_by_key(|id| network.get(*id).map_or(0, |r| r.sports.len()));

        for id in ids {
            let Some(road) = network.get(id) else {
                log::error!("Road not found: {}", id);
                continue;
            };
            if !road.is_drawable() {
                continue;
            }
            let points: Vec<Vec2> = road.path.iter().map(|&p| Vec2::from(p)).collect();
            let path = road_path(world, &points, road.looped, smoothing);
            let mut min = world.fix_world_pos(Vec2::from(road.box_min));
            let mut max = world.fix_world_pos(Vec2::from(road.box_max));
            if world.map_rotate_hack {
                std::mem::swap(&mut min, &mut max);
            }
            self.roads.retain(|r| r.id != id);
            self.roads.push(RoadShape {
                id,
                classes: road.sports.iter().map(|s| format!("sport-{s}")).collect(),
                path,
                clip: [min * ROAD_LAYER_SCALE, max * ROAD_LAYER_SCALE],
            });
        }
        self.revision += 1;
    }

    pub fn set_active_road(&mut self, id: RoadId) {
        self.active = Some(id);
        self.revision += 1;
    }

    pub fn add_highlight_path(&mut self, world: &WorldMeta, points: &[Vec2], id: impl Into<String>, looped: bool, smoothing: f32) {
        self.highlights.push(HighlightPath {
            id: id.into(),
            path: road_path(world, points, looped, smoothing),
        });
        self.revision += 1;
    }
}

/// Smooth path for raw world points, in road-layer units.
pub fn road_path(world: &WorldMeta, points: &[Vec2], looped: bool, smoothing: f32) -> SmoothPath {
    let scaled: Vec<Vec2> = points
        .iter()
        .map(|&p| world.fix_world_pos(p) * ROAD_LAYER_SCALE)
        .collect();
    smooth_path(&scaled, looped, smoothing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::world::fixtures;
    use crate::systems::spline::{PathCommand, DEFAULT_SMOOTHING};

    fn network() -> RoadNetwork {
        RoadNetwork::from_json(
            r#"{
            "1": { "path": [[0, 0], [100, 0]], "boxMin": [0, 0], "boxMax": [100, 10],
                   "sports": ["cycling", "running"] },
            "2": { "path": [[0, 0], [0, 100]], "boxMin": [0, 0], "boxMax": [10, 100],
                   "sports": ["cycling"] },
            "3": { "path": [[5, 5], [6, 6]], "boxMin": [5, 5], "boxMax": [6, 6],
                   "sports": ["rowing"] }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn skips_undrawable_and_orders_multi_sport_last() {
        let world = fixtures::watopia();
        let mut layer = RoadLayer::new(&world);
        layer.render_roads(&world, &network(), None, DEFAULT_SMOOTHING);
        let ids: Vec<RoadId> = layer.roads.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(layer.road(1).unwrap().classes, vec!["sport-cycling", "sport-running"]);
    }

    #[test]
    fn missing_road_is_skipped() {
        let world = fixtures::watopia();
        let mut layer = RoadLayer::new(&world);
        layer.render_roads(&world, &network(), Some(&[42, 2]), DEFAULT_SMOOTHING);
        assert_eq!(layer.roads.len(), 1);
        assert_eq!(layer.roads[0].id, 2);
    }

    #[test]
    fn paths_are_in_layer_units() {
        let world = fixtures::watopia();
        let mut layer = RoadLayer::new(&world);
        layer.render_roads(&world, &network(), Some(&[1]), DEFAULT_SMOOTHING);
        let road = layer.road(1).unwrap();
        assert_eq!(road.path.commands[0], PathCommand::MoveTo(Vec2::ZERO));
        assert!(road.path.segments()[0].to.abs_diff_eq(Vec2::new(1.0, 0.0), 1e-6));
        assert!(road.clip[0].abs_diff_eq(Vec2::ZERO, 1e-6));
        assert!(road.clip[1].abs_diff_eq(Vec2::new(1.0, 0.1), 1e-6));
    }

    #[test]
    fn rotate_hack_swaps_clip_corners() {
        let mut world = fixtures::watopia();
        world.map_rotate_hack = true;
        let mut layer = RoadLayer::new(&world);
        layer.render_roads(&world, &network(), Some(&[1]), DEFAULT_SMOOTHING);
        let [min, max] = layer.road(1).unwrap().clip;
        assert!(min.abs_diff_eq(Vec2::new(0.1, -1.0), 1e-6));
        assert!(max.abs_diff_eq(Vec2::ZERO, 1e-6));
    }

    #[test]
    fn active_road_and_highlights_bump_revision() {
        let world = fixtures::watopia();
        let mut layer = RoadLayer::new(&world);
        let r0 = layer.revision();
        layer.set_active_road(2);
        layer.add_highlight_path(&world, &[Vec2::ZERO, Vec2::new(50.0, 50.0)], "route", false, DEFAULT_SMOOTHING);
        assert_eq!(layer.active, Some(2));
        assert_eq!(layer.highlights.len(), 1);
        assert_eq!(layer.revision(), r0 + 2);
    }
}
