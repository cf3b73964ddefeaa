//! Wheel, drag and pinch handling.
//!
//! Events are consumed once per admitted frame. Per-event work (zoom deltas,
//! contact bookkeeping) happens immediately; the expensive parts (applying
//! zoom, moving the drag offset) are coalesced to once per frame. While a
//! gesture is in flight the map transition is frozen so the surface follows
//! the finger instead of animating behind it.

use glam::Vec2;

use crate::core::time::{Deadline, Millis};
use crate::error::MapResult;
use crate::input::queue::InputEvent;

/// The map state a gesture acts on.
pub trait GestureTarget {
    fn zoom(&self) -> f32;
    /// Add `delta` to the zoom, clamped to the zoom range. Nothing is redrawn.
    fn adjust_zoom(&mut self, delta: f32);
    /// Propagate the current zoom (layer scale, transform, zoom event).
    fn apply_zoom(&mut self, now: Millis) -> MapResult<()>;
    fn drag_offset(&self) -> Vec2;
    fn set_drag_offset(&mut self, offset: Vec2, now: Millis) -> MapResult<()>;
    /// Freeze the map transition.
    fn freeze(&mut self, now: Millis);
    /// Release one freeze.
    fn thaw(&mut self, now: Millis) -> MapResult<()>;
    /// Stop (or resume) following the watched athlete.
    fn set_tracking_paused(&mut self, paused: bool);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Contact {
    id: i32,
    pos: Vec2,
}

#[derive(Debug, Clone, Default)]
struct PointerState {
    first: Option<Contact>,
    second: Option<Contact>,
    /// A move has been seen since the first contact went down.
    active: bool,
    last: Vec2,
    last_distance: f32,
}

/// Turns raw input into zoom and drag changes.
#[derive(Debug, Clone)]
pub struct InteractionController {
    pub settle_ms: Millis,
    pub wheel_sensitivity: f32,
    pub pinch_sensitivity: f32,
    wheel_settle: Deadline,
    pointer: PointerState,
}

impl InteractionController {
    pub fn new(settle_ms: Millis, wheel_sensitivity: f32, pinch_sensitivity: f32) -> Self {
        Self {
            settle_ms,
            wheel_sensitivity,
            pinch_sensitivity,
            wheel_settle: Deadline::default(),
            pointer: PointerState::default(),
        }
    }

    /// A drag or pinch is in progress.
    pub fn is_gesture_active(&self) -> bool {
        self.pointer.active
    }

    pub fn is_wheel_settling(&self) -> bool {
        self.wheel_settle.is_pending()
    }

    /// Fire the wheel settle timer if it is due.
    pub fn poll<T: GestureTarget>(&mut self, now: Millis, target: &mut T) -> MapResult<()> {
        if self.wheel_settle.fire(now) {
            target.set_tracking_paused(false);
            target.thaw(now)?;
        }
        Ok(())
    }

    /// Consume one frame's worth of input.
    pub fn handle<T: GestureTarget>(&mut self, events: &[InputEvent], now: Millis, target: &mut T) -> MapResult<()> {
        self.poll(now, target)?;

        let mut wheeled = false;
        let mut drag_to: Option<Vec2> = None;
        let mut pinched = false;

        for event in events {
            match *event {
                InputEvent::Wheel { delta_y } => {
                    if delta_y == 0.0 {
                        continue;
                    }
                    target.set_tracking_paused(true);
                    let zoom = target.zoom();
                    target.adjust_zoom(-delta_y / self.wheel_sensitivity * zoom);
                    wheeled = true;
                }
                InputEvent::PointerDown { id, button, x, y } => {
                    self.pointer_down(id, button, Vec2::new(x, y));
                }
                InputEvent::PointerMove { id, x, y } => {
                    let pos = Vec2::new(x, y);
                    let Some(first) = self.pointer.first else {
                        continue;
                    };
                    if !self.pointer.active {
                        self.pointer.active = true;
                        target.set_tracking_paused(true);
                        target.freeze(now);
                    }
                    if self.pointer.second.is_none() {
                        if id == first.id {
                            drag_to = Some(pos);
                        }
                    } else if let Some(delta) = self.pinch_move(id, pos) {
                        target.adjust_zoom(delta / self.pinch_sensitivity);
                        pinched = true;
                    }
                }
                InputEvent::PointerUp { .. } | InputEvent::PointerCancel { .. } => {
                    if let Some(pos) = drag_to.take() {
                        self.apply_drag(pos, now, target)?;
                    }
                    self.pointer_done(now, target)?;
                }
            }
        }

        if wheeled {
            if !self.wheel_settle.is_pending() {
                target.freeze(now);
            }
            target.apply_zoom(now)?;
            // Animations resume lazily once the wheel goes quiet.
            self.wheel_settle.arm(now + self.settle_ms);
        }
        if let Some(pos) = drag_to {
            self.apply_drag(pos, now, target)?;
        }
        if pinched {
            target.apply_zoom(now)?;
        }
        Ok(())
    }

    fn pointer_down(&mut self, id: i32, button: i16, pos: Vec2) {
        let state = &mut self.pointer;
        if button != 0 || (state.first.is_some() && state.second.is_some()) {
            return;
        }
        if let Some(first) = state.first {
            state.second = Some(Contact { id, pos });
            state.last_distance = first.pos.distance(pos);
            return;
        }
        state.first = Some(Contact { id, pos });
        state.active = false;
        state.last = pos;
    }

    /// Update the matching contact; returns the change in contact distance.
    fn pinch_move(&mut self, id: i32, pos: Vec2) -> Option<f32> {
        let state = &mut self.pointer;
        let (first, second) = (state.first.as_mut()?, state.second.as_mut()?);
        let other = if id == first.id {
            first.pos = pos;
            second.pos
        } else if id == second.id {
            second.pos = pos;
            first.pos
        } else {
            // Third finger.
            return None;
        };
        let distance = pos.distance(other);
        let delta = distance - state.last_distance;
        state.last_distance = distance;
        Some(delta)
    }

    fn apply_drag<T: GestureTarget>(&mut self, pos: Vec2, now: Millis, target: &mut T) -> MapResult<()> {
        let delta = pos - self.pointer.last;
        self.pointer.last = pos;
        let offset = target.drag_offset() + delta / target.zoom();
        target.set_drag_offset(offset, now)
    }

    fn pointer_done<T: GestureTarget>(&mut self, now: Millis, target: &mut T) -> MapResult<()> {
        if self.pointer.first.is_none() {
            return Ok(());
        }
        let was_active = self.pointer.active;
        self.pointer = PointerState::default();
        target.set_tracking_paused(false);
        if was_active {
            target.thaw(now)?;
        }
        Ok(())
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(100.0, 2000.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;

    #[derive(Default)]
    struct Probe {
        zoom: f32,
        drag: Vec2,
        frozen: u32,
        tracking_paused: bool,
        zoom_applied: u32,
        drags_applied: u32,
    }

    impl Probe {
        fn new() -> Self {
            Self { zoom: 1.0, ..Self::default() }
        }
    }

    impl GestureTarget for Probe {
        fn zoom(&self) -> f32 {
            self.zoom
        }
        fn adjust_zoom(&mut self, delta: f32) {
            self.zoom = (self.zoom + delta).clamp(0.25, 4.5);
        }
        fn apply_zoom(&mut self, _now: Millis) -> MapResult<()> {
            self.zoom_applied += 1;
            Ok(())
        }
        fn drag_offset(&self) -> Vec2 {
            self.drag
        }
        fn set_drag_offset(&mut self, offset: Vec2, _now: Millis) -> MapResult<()> {
            self.drag = offset;
            self.drags_applied += 1;
            Ok(())
        }
        fn freeze(&mut self, _now: Millis) {
            self.frozen += 1;
        }
        fn thaw(&mut self, _now: Millis) -> MapResult<()> {
            self.frozen = self.frozen.checked_sub(1).ok_or(MapError::DisabledUnderflow)?;
            Ok(())
        }
        fn set_tracking_paused(&mut self, paused: bool) {
            self.tracking_paused = paused;
        }
    }

    fn down(id: i32, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerDown { id, button: 0, x, y }
    }

    fn mv(id: i32, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMove { id, x, y }
    }

    #[test]
    fn wheel_zooms_and_settles() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        ctl.handle(&[InputEvent::Wheel { delta_y: -200.0 }], 0.0, &mut p).unwrap();
        assert!((p.zoom - 1.1).abs() < 1e-6);
        assert_eq!(p.frozen, 1);
        assert_eq!(p.zoom_applied, 1);
        assert!(p.tracking_paused);

        // More wheel within the settle window extends it without re-freezing.
        ctl.handle(&[InputEvent::Wheel { delta_y: -200.0 }], 50.0, &mut p).unwrap();
        assert_eq!(p.frozen, 1);
        ctl.poll(120.0, &mut p).unwrap();
        assert_eq!(p.frozen, 1);
        ctl.poll(150.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        assert!(!p.tracking_paused);
    }

    #[test]
    fn wheel_events_coalesce_per_frame() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        let events = [
            InputEvent::Wheel { delta_y: 100.0 },
            InputEvent::Wheel { delta_y: 0.0 },
            InputEvent::Wheel { delta_y: 100.0 },
        ];
        ctl.handle(&events, 0.0, &mut p).unwrap();
        assert_eq!(p.zoom_applied, 1);
        assert!((p.zoom - 0.95 * 0.95).abs() < 1e-6);
    }

    #[test]
    fn drag_moves_by_latest_position_over_zoom() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        p.zoom = 2.0;
        ctl.handle(&[down(1, 100.0, 100.0)], 0.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        ctl.handle(&[mv(1, 105.0, 100.0), mv(1, 120.0, 90.0)], 16.0, &mut p).unwrap();
        assert_eq!(p.frozen, 1);
        assert!(p.tracking_paused);
        assert_eq!(p.drags_applied, 1);
        assert_eq!(p.drag, Vec2::new(10.0, -5.0));
        ctl.handle(&[InputEvent::PointerUp { id: 1 }], 32.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        assert!(!p.tracking_paused);
        assert!(!ctl.is_gesture_active());
    }

    #[test]
    fn click_without_move_does_not_freeze() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        ctl.handle(&[down(1, 0.0, 0.0), InputEvent::PointerUp { id: 1 }], 0.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        assert_eq!(p.drags_applied, 0);
    }

    #[test]
    fn secondary_button_is_ignored() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        let events = [
            InputEvent::PointerDown { id: 1, button: 2, x: 0.0, y: 0.0 },
            mv(1, 50.0, 50.0),
        ];
        ctl.handle(&events, 0.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        assert_eq!(p.drag, Vec2::ZERO);
    }

    #[test]
    fn pinch_zooms_by_distance_change() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        ctl.handle(&[down(1, 0.0, 0.0), down(2, 100.0, 0.0)], 0.0, &mut p).unwrap();
        ctl.handle(&[mv(2, 400.0, 0.0)], 16.0, &mut p).unwrap();
        assert!((p.zoom - 1.5).abs() < 1e-6);
        assert_eq!(p.zoom_applied, 1);
        assert_eq!(p.drag, Vec2::ZERO);
        // Both contacts move in one frame: one apply.
        ctl.handle(&[mv(1, -50.0, 0.0), mv(2, 460.0, 0.0)], 32.0, &mut p).unwrap();
        assert!((p.zoom - (1.5 + 110.0 / 600.0)).abs() < 1e-5);
        assert_eq!(p.zoom_applied, 2);
    }

    #[test]
    fn third_finger_is_ignored() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        let events = [down(1, 0.0, 0.0), down(2, 100.0, 0.0), down(3, 500.0, 0.0), mv(3, 900.0, 0.0)];
        ctl.handle(&events, 0.0, &mut p).unwrap();
        assert_eq!(p.zoom, 1.0);
        assert_eq!(p.zoom_applied, 0);
        // The move still activated the gesture.
        assert_eq!(p.frozen, 1);
        ctl.handle(&[InputEvent::PointerCancel { id: 3 }], 16.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
    }

    #[test]
    fn move_without_contact_is_ignored() {
        let mut ctl = InteractionController::default();
        let mut p = Probe::new();
        ctl.handle(&[mv(1, 10.0, 10.0), InputEvent::PointerUp { id: 1 }], 0.0, &mut p).unwrap();
        assert_eq!(p.frozen, 0);
        assert!(!p.tracking_paused);
    }
}
