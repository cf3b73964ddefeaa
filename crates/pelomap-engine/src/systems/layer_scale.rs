//! Adaptive layer scale.
//!
//! The background and entity layers are not rendered at native zoom. Instead
//! the zoom is quantized into a small set of layer resolutions so that:
//!
//! - layers composited during transitions are rasterized at a sensible
//!   resolution instead of looking fuzzy,
//! - zooming far out on a large world cannot blow the GPU memory budget
//!   (an 8192x4096 layer unscaled is around 1GB),
//! - swapping resolution (which janks) happens only at bucket boundaries.
//!
//! Tilt shift shows far more landscape at oblique angles, so steep tilt
//! lowers quality further.

/// Inputs of the layer scale decision.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerScaleSettings {
    /// Bucket width; larger values switch resolution less often.
    pub chunk: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub quality: f32,
    /// Tilt shift amount in [0, 1]; `None` disables perspective.
    pub tilt_shift: Option<f32>,
    pub max_tilt_shift_angle: f32,
    /// Reduce tilt when zoomed out so zoom stays the dominant control.
    pub zoom_priority_tilt: bool,
}

impl Default for LayerScaleSettings {
    fn default() -> Self {
        Self {
            chunk: 0.5,
            zoom_min: 0.25,
            zoom_max: 4.5,
            quality: 1.0,
            tilt_shift: None,
            max_tilt_shift_angle: 65.0,
            zoom_priority_tilt: true,
        }
    }
}

/// Result of one layer scale computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerScaleDecision {
    pub scale: f32,
    /// Perspective tilt in degrees (0 when tilt shift is off).
    pub tilt_angle: f32,
    /// Perspective distance in layer pixels (0 when tilt shift is off).
    pub tilt_height: f32,
}

/// Chooses the quantized layer scale and remembers the active one.
#[derive(Debug, Clone, Default)]
pub struct LayerScaleController {
    pub settings: LayerScaleSettings,
    current: Option<f32>,
    tilt_angle: f32,
    tilt_height: f32,
}

impl LayerScaleController {
    pub fn new(settings: LayerScaleSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Active layer scale, `None` until the first swap.
    pub fn scale(&self) -> Option<f32> {
        self.current
    }

    pub fn tilt_angle(&self) -> f32 {
        self.tilt_angle
    }

    pub fn tilt_height(&self) -> f32 {
        self.tilt_height
    }

    /// Pure computation for `zoom`; does not change state.
    pub fn compute(&self, zoom: f32) -> LayerScaleDecision {
        let s = &self.settings;
        let adj_zoom = ((1.0 / zoom / s.chunk).round() * s.chunk).clamp(s.zoom_min, s.zoom_max);
        let mut quality = s.quality;
        let mut tilt_angle = 0.0;
        let tilt_shift = s.tilt_shift.filter(|t| *t != 0.0);
        if let Some(tilt) = tilt_shift {
            let tilt_factor = if s.zoom_priority_tilt {
                (1.0 / s.zoom_max * (zoom + 1.0)).min(1.0)
            } else {
                1.0
            };
            tilt_angle = tilt * s.max_tilt_shift_angle * tilt_factor;
            let excess = (tilt_angle - 30.0).max(0.0);
            if excess > 0.0 {
                quality *= (15.0 / excess).min(1.0);
            }
        }
        let scale = 1.0 / adj_zoom * quality;
        let tilt_height = if tilt_shift.is_some() { 800.0 / (zoom / scale) } else { 0.0 };
        LayerScaleDecision { scale, tilt_angle, tilt_height }
    }

    /// Recompute for `zoom`. Returns the new scale only when it differs from
    /// the active one (or `force` is set); a stable zoom never swaps.
    pub fn update(&mut self, zoom: f32, force: bool) -> Option<f32> {
        let decision = self.compute(zoom);
        self.tilt_angle = decision.tilt_angle;
        self.tilt_height = decision.tilt_height;
        if force || self.current != Some(decision.scale) {
            self.current = Some(decision.scale);
            Some(decision.scale)
        } else {
            None
        }
    }
}
