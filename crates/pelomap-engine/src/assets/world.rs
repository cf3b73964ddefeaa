use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::MapResult;

/// Scale from world units to road-layer (SVG) units.
pub const ROAD_LAYER_SCALE: f32 = 0.01;

/// Per-course world metadata. Immutable for the lifetime of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMeta {
    pub course_id: u32,
    pub world_id: u32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
    /// Background tile pixels per world unit, relative to `map_scale`.
    pub tile_scale: f32,
    pub map_scale: f32,
    /// World x/y are stored rotated a quarter turn on some courses.
    #[serde(default)]
    pub map_rotate_hack: bool,
    /// Course is already oriented like the route selector; no -90° adjust.
    #[serde(default)]
    pub rotate_route_select: bool,
    #[serde(default)]
    pub flipped_hack: bool,
    #[serde(default)]
    pub lat_offset: f64,
    #[serde(default)]
    pub lon_offset: f64,
    #[serde(default)]
    pub lat_deg_dist: f64,
    #[serde(default)]
    pub lon_deg_dist: f64,
}

impl WorldMeta {
    /// Pixels of background per world unit.
    pub fn pixel_scale(&self) -> f32 {
        1.0 / (self.tile_scale / self.map_scale)
    }

    /// Offset of the world origin inside the background image, in pixels.
    pub fn anchor_offset(&self) -> Vec2 {
        -Vec2::new(self.min_x + self.anchor_x, self.min_y + self.anchor_y) * self.pixel_scale()
    }

    /// Normalize a raw world position for this course.
    pub fn fix_world_pos(&self, pos: Vec2) -> Vec2 {
        if self.map_rotate_hack {
            Vec2::new(pos.y, -pos.x)
        } else {
            pos
        }
    }

    /// Fixed rotation applied on top of the athlete heading.
    pub fn heading_adjust(&self) -> f32 {
        if self.rotate_route_select {
            0.0
        } else {
            -90.0
        }
    }

    /// Road layer view box `[x, y, width, height]` in road-layer units.
    pub fn road_view_box(&self) -> [f32; 4] {
        [
            (self.min_x + self.anchor_x) * ROAD_LAYER_SCALE,
            (self.min_y + self.anchor_y) * ROAD_LAYER_SCALE,
            (self.max_x - self.min_x) * ROAD_LAYER_SCALE,
            (self.max_y - self.min_y) * ROAD_LAYER_SCALE,
        ]
    }

    /// Convert a GPS coordinate into world units using the course calibration.
    pub fn latlng_to_position(&self, [lat, lon]: [f64; 2]) -> Vec2 {
        if self.flipped_hack {
            Vec2::new(
                ((lat - self.lat_offset) * self.lat_deg_dist * 100.0) as f32,
                ((lon - self.lon_offset) * self.lon_deg_dist * 100.0) as f32,
            )
        } else {
            Vec2::new(
                (-(lon - self.lat_offset) * self.lat_deg_dist * 100.0) as f32,
                ((lat - self.lon_offset) * self.lon_deg_dist * 100.0) as f32,
            )
        }
    }
}

/// All known courses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldList {
    pub worlds: Vec<WorldMeta>,
}

impl WorldList {
    pub fn new(worlds: Vec<WorldMeta>) -> Self {
        Self { worlds }
    }

    /// Parse a JSON array of world metadata records.
    pub fn from_json(json: &str) -> MapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn find(&self, course_id: u32) -> Option<&WorldMeta> {
        self.worlds.iter().find(|w| w.course_id == course_id)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn watopia() -> WorldMeta {
        WorldMeta {
            course_id: 6,
            world_id: 1,
            min_x: -1000.0,
            min_y: -500.0,
            max_x: 3000.0,
            max_y: 1500.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
            tile_scale: 100.0,
            map_scale: 1.0,
            map_rotate_hack: false,
            rotate_route_select: false,
            flipped_hack: false,
            lat_offset: 0.0,
            lon_offset: 0.0,
            lat_deg_dist: 0.0,
            lon_deg_dist: 0.0,
        }
    }
}
