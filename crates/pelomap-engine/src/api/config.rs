use serde::Deserialize;

use crate::core::time::Millis;
use crate::systems::layer_scale::LayerScaleSettings;

/// Background image flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    Default,
    Neon,
}

impl MapStyle {
    /// File name suffix of the background image for this style.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Neon => "-neon",
        }
    }
}

/// Configuration for a course map, provided by the host.
///
/// Every field has a default, so a host may pass a partial JSON object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    /// Initial zoom.
    pub zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Rotate the map with the watched athlete's heading.
    pub auto_heading: bool,
    pub style: MapStyle,
    /// Perspective amount in [0, 1]; `None` or 0 keeps the map flat.
    pub tilt_shift: Option<f32>,
    /// Tilt angle at `tilt_shift = 1`, degrees.
    pub max_tilt_shift_angle: f32,
    pub zoom_priority_tilt: bool,
    /// Layer resolution multiplier.
    pub quality: f32,
    /// Vertical offset as a fraction of the surface height.
    pub vertical_offset: f32,
    pub fps_limit: f32,
    /// Background image URL prefix; the world id and style suffix are appended.
    pub background_url_base: String,

    /// Map transform transition duration (ms).
    pub map_transition_ms: Millis,
    /// Initial entity transition duration (ms).
    pub entity_transition_ms: Millis,
    /// Gap between samples after which an entity snaps instead of animating.
    pub discontinuity_ms: Millis,
    /// Window and seed of the per-entity update delay estimate.
    pub delay_window: f64,
    pub delay_seed_ms: Millis,
    /// Entities unseen for longer than this are evicted.
    pub gc_timeout_ms: Millis,
    pub gc_interval_ms: Millis,
    /// Detail entries are refreshed after `base + rand * jitter` ms.
    pub detail_refresh_base_ms: Millis,
    pub detail_refresh_jitter_ms: Millis,
    pub detail_cache_ttl_ms: Millis,
    /// Delay after the last wheel event before animations resume.
    pub wheel_settle_ms: Millis,
    /// Wheel delta per unit of relative zoom.
    pub wheel_sensitivity: f32,
    /// Pinch distance (px) per unit of zoom.
    pub pinch_sensitivity: f32,
    /// Layer scale bucket width.
    pub layer_chunk: f32,
    pub road_smoothing: f32,
    pub rng_seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            zoom_min: 0.25,
            zoom_max: 4.5,
            auto_heading: true,
            style: MapStyle::Default,
            tilt_shift: None,
            max_tilt_shift_angle: 65.0,
            zoom_priority_tilt: true,
            quality: 1.0,
            vertical_offset: 0.0,
            fps_limit: 60.0,
            background_url_base: "https://www.sauce.llc/products/sauce4zwift/maps/world".to_string(),
            map_transition_ms: 500.0,
            entity_transition_ms: 2000.0,
            discontinuity_ms: 2500.0,
            delay_window: 6.0,
            delay_seed_ms: 1000.0,
            gc_timeout_ms: 15000.0,
            gc_interval_ms: 10000.0,
            detail_refresh_base_ms: 30000.0,
            detail_refresh_jitter_ms: 60000.0,
            detail_cache_ttl_ms: 300000.0,
            wheel_settle_ms: 100.0,
            wheel_sensitivity: 2000.0,
            pinch_sensitivity: 600.0,
            layer_chunk: 0.5,
            road_smoothing: 0.2,
            rng_seed: 0x5EED,
        }
    }
}

impl MapConfig {
    /// Parse a (possibly partial) JSON config object.
    pub fn from_json(json: &str) -> crate::error::MapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn layer_scale_settings(&self) -> LayerScaleSettings {
        LayerScaleSettings {
            chunk: self.layer_chunk,
            zoom_min: self.zoom_min,
            zoom_max: self.zoom_max,
            quality: self.quality,
            tilt_shift: self.tilt_shift,
            max_tilt_shift_angle: self.max_tilt_shift_angle,
            zoom_priority_tilt: self.zoom_priority_tilt,
        }
    }

    /// Background image URL for a world in the configured style.
    pub fn background_url(&self, world_id: u32) -> String {
        format!("{}{}{}.webp", self.background_url_base, world_id, self.style.suffix())
    }
}
