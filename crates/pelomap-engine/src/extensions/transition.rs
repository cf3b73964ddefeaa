// extensions/transition.rs
//
// Transition: linear, time-based interpolation over a fixed-size f32 vector.
// Completely decoupled from entities and the map; callers own the clock.
//
// Usage:
//   let mut t = Transition::new(500.0);
//   t.set_values(&[0.0, 0.0], now);
//   t.set_values(&[100.0, 50.0], now);
//   let pos = t.step(now + 250.0);  // Some([50.0, 25.0])

use crate::core::time::Millis;
use crate::error::{MapError, MapResult};

/// Components closer than this to their destination are treated as converged
/// when retargeting, so repeated near-identical updates cannot chase each
/// other forever.
pub const EPSILON: f32 = 1.0 / 0x80_0000 as f32;

/// A retargetable interpolation between a source and destination vector.
///
/// While disabled (refcount > 0) the value is frozen. While enabled and
/// playing, `step()` returns `src + progress * (dst - src)` with progress
/// clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct Transition {
    duration: Millis,
    src: Vec<f32>,
    cur: Vec<f32>,
    dst: Option<Vec<f32>>,
    start: Millis,
    end: Millis,
    /// Time left on the in-flight animation when it was frozen.
    remaining: Option<Millis>,
    disabled_refs: u32,
    playing: bool,
}

impl Transition {
    /// Create a transition with the given duration in milliseconds.
    pub fn new(duration: Millis) -> Self {
        Self {
            duration,
            src: Vec::new(),
            cur: Vec::new(),
            dst: None,
            start: 0.0,
            end: 0.0,
            remaining: None,
            disabled_refs: 0,
            playing: false,
        }
    }

    pub fn duration(&self) -> Millis {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_refs > 0
    }

    /// Freeze the transition. The first increment pins the value at its exact
    /// interpolated position for `now`.
    pub fn inc_disabled(&mut self, now: Millis) {
        self.disabled_refs += 1;
        if self.disabled_refs == 1 {
            if self.playing {
                self.recalc_current(now);
            }
            if self.playing {
                self.remaining = Some(self.end - now);
            } else if let Some(dst) = &self.dst {
                self.cur.clone_from(dst);
            }
            self.playing = false;
            self.start = 0.0;
            self.end = 0.0;
        }
    }

    /// Release one freeze. Dropping the last one resumes any frozen animation
    /// with the time it had left.
    pub fn dec_disabled(&mut self, now: Millis) -> MapResult<()> {
        if self.disabled_refs == 0 {
            return Err(MapError::DisabledUnderflow);
        }
        self.disabled_refs -= 1;
        if self.disabled_refs == 0 {
            if let Some(remaining) = self.remaining.take() {
                self.src.clone_from(&self.cur);
                self.start = now;
                self.end = now + remaining;
                self.playing = true;
            } else if let Some(dst) = &mut self.dst {
                // Whatever was frozen on screen is the resting value.
                dst.clone_from(&self.cur);
            }
        }
        Ok(())
    }

    /// Change the duration without losing the progress already made.
    ///
    /// An in-flight animation continues from where it is now; the window is
    /// shifted by the difference between the new and old durations.
    pub fn set_duration(&mut self, duration: Millis, now: Millis) {
        if !self.is_disabled() {
            self.recalc_current(now);
            if self.playing {
                let remaining = self.end - now + (duration - self.duration);
                self.src.clone_from(&self.cur);
                self.start = now;
                self.end = now + remaining.max(0.0);
            }
        }
        self.duration = duration;
    }

    /// Retarget to `values`, animating from wherever the transition is now.
    pub fn set_values(&mut self, values: &[f32], now: Millis) {
        let prev_len = self.dst.as_ref().map(Vec::len);
        if self.is_disabled() {
            self.cur = values.to_vec();
            self.remaining = None;
        } else if let Some(prev_len) = prev_len {
            if prev_len != values.len() {
                self.src = values.to_vec();
            } else if now < self.end {
                // Start from the current position (and don't chase Zeno).
                self.recalc_current(now);
                self.src = self
                    .cur
                    .iter()
                    .zip(values)
                    .map(|(&x, &v)| if (v - x).abs() < EPSILON { v } else { x })
                    .collect();
            } else if let Some(dst) = &self.dst {
                self.src.clone_from(dst);
            }
            self.start = now;
            self.end = now + self.duration;
            self.playing = true;
            if self.cur.len() != values.len() {
                self.cur = self.src.clone();
            }
        } else {
            self.cur = values.to_vec();
        }
        self.dst = Some(values.to_vec());
    }

    /// Sample the transition at `now`.
    ///
    /// Returns `None` until a destination has been set.
    pub fn step(&mut self, now: Millis) -> Option<&[f32]> {
        if self.is_disabled() {
            self.dst.as_ref()?;
            Some(&self.cur)
        } else if self.playing {
            self.recalc_current(now);
            Some(&self.cur)
        } else {
            self.dst.as_deref()
        }
    }

    fn recalc_current(&mut self, now: Millis) {
        let Some(dst) = &self.dst else {
            return;
        };
        let span = self.end - self.start;
        let progress = if span > 0.0 { (now - self.start) / span } else { 1.0 };
        if progress >= 1.0 {
            self.cur.clone_from(dst);
            self.playing = false;
        } else {
            let progress = progress.max(0.0);
            for (i, (&s, &d)) in self.src.iter().zip(dst).enumerate() {
                self.cur[i] = s + ((d - s) as f64 * progress) as f32;
            }
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn nothing_before_first_value() {
        let mut t = Transition::new(500.0);
        assert!(t.step(0.0).is_none());
        t.inc_disabled(0.0);
        assert!(t.step(10.0).is_none());
    }

    #[test]
    fn zero_duration_is_exact() {
        let mut t = Transition::new(0.0);
        t.set_values(&[1.0, 2.0], 0.0);
        t.set_values(&[3.25, -7.5], 100.0);
        assert_eq!(t.step(100.0).unwrap(), &[3.25, -7.5]);
        assert!(!t.is_playing());
    }

    #[test]
    fn first_value_is_not_animated() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[5.0], 0.0);
        assert!(!t.is_playing());
        assert_eq!(t.step(0.0).unwrap(), &[5.0]);
    }

    #[test]
    fn interpolates_linearly() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0, 0.0], 0.0);
        t.set_values(&[100.0, -50.0], 0.0);
        for &(now, p) in &[(0.0, 0.0), (250.0, 0.25), (600.0, 0.6), (1000.0, 1.0)] {
            let step = t.step(now).unwrap().to_vec();
            assert!(approx(&step, &[100.0 * p, -50.0 * p]), "at {now}: {step:?}");
        }
        assert!(!t.is_playing());
        assert!(approx(t.step(5000.0).unwrap(), &[100.0, -50.0]));
    }

    #[test]
    fn retarget_starts_from_current_position() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.set_values(&[200.0], 500.0);
        assert!(approx(t.step(500.0).unwrap(), &[50.0]));
        assert!(approx(t.step(1000.0).unwrap(), &[125.0]));
        assert!(approx(t.step(1500.0).unwrap(), &[200.0]));
    }

    #[test]
    fn retarget_after_completion_starts_from_last_destination() {
        let mut t = Transition::new(100.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[10.0], 0.0);
        t.set_values(&[20.0], 500.0);
        assert!(approx(t.step(550.0).unwrap(), &[15.0]));
    }

    #[test]
    fn near_equal_components_snap_on_retarget() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0, 0.0], 0.0);
        t.set_values(&[10.0, 1e-8], 0.0);
        t.step(500.0);
        t.set_values(&[20.0, 2e-8], 500.0);
        // The converged component no longer interpolates.
        assert_eq!(t.step(750.0).unwrap()[1], 2e-8);
        assert!(approx(&t.step(750.0).unwrap()[..1], &[8.75]));
    }

    #[test]
    fn disabled_freezes_value() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.inc_disabled(300.0);
        let frozen = t.step(300.0).unwrap().to_vec();
        assert!(approx(&frozen, &[30.0]));
        for now in [301.0, 1000.0, 60_000.0] {
            assert_eq!(t.step(now).unwrap(), frozen.as_slice());
        }
        assert!(!t.is_playing());
    }

    #[test]
    fn dec_disabled_resumes_with_remaining_time() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.inc_disabled(250.0);
        t.inc_disabled(400.0);
        t.dec_disabled(2000.0).unwrap();
        assert!(t.is_disabled());
        t.dec_disabled(5000.0).unwrap();
        assert!(t.is_playing());
        assert!(approx(t.step(5000.0).unwrap(), &[25.0]));
        assert!(approx(t.step(5375.0).unwrap(), &[62.5]));
        assert!(approx(t.step(5750.0).unwrap(), &[100.0]));
    }

    #[test]
    fn dec_disabled_underflow_is_an_error() {
        let mut t = Transition::new(1000.0);
        assert!(matches!(t.dec_disabled(0.0), Err(MapError::DisabledUnderflow)));
        t.inc_disabled(0.0);
        assert!(t.dec_disabled(0.0).is_ok());
        assert!(matches!(t.dec_disabled(0.0), Err(MapError::DisabledUnderflow)));
        assert!(!t.is_disabled());
    }

    #[test]
    fn values_set_while_disabled_apply_immediately() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.inc_disabled(500.0);
        t.set_values(&[7.0], 600.0);
        assert_eq!(t.step(600.0).unwrap(), &[7.0]);
        t.dec_disabled(700.0).unwrap();
        assert!(!t.is_playing());
        assert_eq!(t.step(800.0).unwrap(), &[7.0]);
    }

    #[test]
    fn set_duration_keeps_progress() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.set_duration(2000.0, 500.0);
        assert!(approx(t.step(500.0).unwrap(), &[50.0]));
        // 1500ms left after re-anchoring at 500.
        assert!(approx(t.step(1250.0).unwrap(), &[75.0]));
        assert!(approx(t.step(2000.0).unwrap(), &[100.0]));
        assert_eq!(t.duration(), 2000.0);
    }

    #[test]
    fn shrinking_duration_past_now_snaps() {
        let mut t = Transition::new(1000.0);
        t.set_values(&[0.0], 0.0);
        t.set_values(&[100.0], 0.0);
        t.set_duration(0.0, 600.0);
        assert!(approx(t.step(600.0).unwrap(), &[100.0]));
        assert!(!t.is_playing());
    }
}
