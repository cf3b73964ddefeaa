// extensions/heading.rs
//
// Heading continuity: unwraps a cyclic heading (degrees) into a continuous
// rotation so the map never spins the long way round when the raw value wraps.

/// Tracks the rotation count across heading wraparounds.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    /// Last raw heading; `None` until the first sample after a reset.
    last: Option<f32>,
    rotations: i32,
    offset: f32,
    adjusted: f32,
}

impl HeadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The continuous heading to feed the map rotation.
    pub fn adjusted(&self) -> f32 {
        self.adjusted
    }

    pub fn rotations(&self) -> i32 {
        self.rotations
    }

    pub fn last(&self) -> Option<f32> {
        self.last
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Apply a new raw heading.
    ///
    /// `map_adjust` is the course-specific fixed rotation. When tracking is
    /// paused the update is skipped (returns false) unless `force` is set.
    pub fn set_heading(&mut self, heading: f32, map_adjust: f32, force: bool, tracking_paused: bool) -> bool {
        if !force && tracking_paused {
            return false;
        }
        if let Some(last) = self.last {
            let delta = last - heading;
            if delta.abs() > 180.0 {
                self.rotations += delta.signum() as i32;
            }
        }
        self.adjusted = heading + self.rotations as f32 * 360.0 + self.offset + map_adjust;
        self.last = Some(heading);
        true
    }

    /// Set a fixed user offset and re-apply the last heading with it.
    pub fn set_offset(&mut self, offset: f32, map_adjust: f32) {
        self.offset = offset;
        match self.last {
            Some(last) => {
                self.set_heading(last, map_adjust, true, false);
            }
            None => self.adjusted = offset + map_adjust,
        }
    }

    /// Forget accumulated rotations (course change). The user offset is kept.
    pub fn reset(&mut self, map_adjust: f32) {
        self.last = None;
        self.rotations = 0;
        self.adjusted = self.offset + map_adjust;
    }
}
