use glam::Vec2;

use crate::api::types::{AthleteDetail, AthleteId};
use crate::components::power_level::PowerLevel;
use crate::core::time::Millis;
use crate::extensions::smoothing::ExpWeightedAvg;
use crate::extensions::transition::Transition;

/// Text of an info pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PinLabel {
    pub name: String,
    /// Watts.
    pub power: f32,
    pub speed: f32,
}

/// An info pin attached to an entity. The label is filled on the next update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pin {
    pub label: Option<PinLabel>,
}

/// Detail-derived markers shown on the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AthleteFlags {
    pub bot: bool,
    pub leader: bool,
    pub sweeper: bool,
    pub marked: bool,
    pub following: bool,
}

impl AthleteFlags {
    pub fn from_detail(detail: &AthleteDetail) -> Self {
        let info = detail.athlete.as_ref();
        Self {
            bot: info.is_some_and(|a| a.is_bot()),
            leader: detail.event_leader,
            sweeper: detail.event_sweeper,
            marked: info.is_some_and(|a| a.marked),
            following: info.is_some_and(|a| a.following),
        }
    }

    /// Packed into one float-friendly bitfield for the frame buffer.
    pub fn bits(self) -> u32 {
        (self.bot as u32)
            | (self.leader as u32) << 1
            | (self.sweeper as u32) << 2
            | (self.marked as u32) << 3
            | (self.following as u32) << 4
    }
}

/// Style state of an entity's surface node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityVisual {
    /// Handed to the surface at least once.
    pub attached: bool,
    pub power_level: PowerLevel,
    pub flags: AthleteFlags,
    pub is_self: bool,
    pub watching: bool,
}

/// One tracked athlete.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: AthleteId,
    /// Animated world position `[x, y]`.
    pub transition: Transition,
    pub last_seen: Millis,
    /// Estimate of this athlete's update cadence.
    pub delay_est: ExpWeightedAvg,
    pub pin: Option<Pin>,
    pub visual: EntityVisual,
    revision: u32,
}

impl Entity {
    pub fn new(id: AthleteId, transition: Transition, delay_est: ExpWeightedAvg) -> Self {
        Self {
            id,
            transition,
            last_seen: 0.0,
            delay_est,
            pin: None,
            visual: EntityVisual::default(),
            revision: 0,
        }
    }

    /// Bumped only when something in [`EntityVisual`] actually changes.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Feed a new position sample.
    ///
    /// The transition duration tracks the observed gap between samples so
    /// motion is continuous; a gap of `discontinuity` or more snaps.
    pub fn observe(&mut self, pos: Vec2, now: Millis, discontinuity: Millis) {
        let age = now - self.last_seen;
        if age != 0.0 {
            if age < discontinuity {
                // Animate close to the update rate without going under. When we
                // already missed (not playing) prefer lag over jank.
                let influence = if self.transition.is_playing() { age + 100.0 } else { age * 8.0 };
                let duration = self.delay_est.push(influence);
                self.transition.set_duration(duration, now);
            } else {
                self.transition.set_duration(0.0, now);
            }
        }
        self.transition.set_values(&[pos.x, pos.y], now);
        self.last_seen = now;
    }

    /// Sampled position, `None` before the first sample.
    pub fn position(&mut self, now: Millis) -> Option<Vec2> {
        self.transition.step(now).map(|v| Vec2::new(v[0], v[1]))
    }

    pub fn set_power_level(&mut self, level: PowerLevel) -> bool {
        self.update_visual(|v| v.power_level = level)
    }

    pub fn set_flags(&mut self, flags: AthleteFlags) -> bool {
        self.update_visual(|v| v.flags = flags)
    }

    pub fn set_self(&mut self, is_self: bool) -> bool {
        self.update_visual(|v| v.is_self = is_self)
    }

    pub fn set_watching(&mut self, watching: bool) -> bool {
        self.update_visual(|v| v.watching = watching)
    }

    /// Mark as handed to the surface. Returns true the first time.
    pub fn attach(&mut self) -> bool {
        !std::mem::replace(&mut self.visual.attached, true)
    }

    fn update_visual(&mut self, f: impl FnOnce(&mut EntityVisual)) -> bool {
        let before = self.visual;
        f(&mut self.visual);
        let changed = before != self.visual;
        if changed {
            self.revision += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AthleteInfo;

    fn entity() -> Entity {
        Entity::new(AthleteId(1), Transition::new(2000.0), ExpWeightedAvg::new(6.0, 1000.0))
    }

    #[test]
    fn first_sample_snaps() {
        let mut e = entity();
        e.observe(Vec2::new(10.0, 20.0), 50_000.0, 2500.0);
        assert_eq!(e.transition.duration(), 0.0);
        assert_eq!(e.position(50_000.0), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(e.last_seen, 50_000.0);
    }

    #[test]
    fn cadence_drives_duration() {
        let mut e = entity();
        e.observe(Vec2::ZERO, 10_000.0, 2500.0);
        // Not playing after a snap: influence = age * 8.
        e.observe(Vec2::new(10.0, 0.0), 10_200.0, 2500.0);
        let keep = (-1.0f64 / 6.0).exp();
        let expected = 1000.0 * keep + 1600.0 * (1.0 - keep);
        assert!((e.transition.duration() - expected).abs() < 1e-6);
        assert!(e.transition.is_playing());
        // Playing: influence = age + 100.
        e.observe(Vec2::new(20.0, 0.0), 10_400.0, 2500.0);
        let expected = expected * keep + 300.0 * (1.0 - keep);
        assert!((e.transition.duration() - expected).abs() < 1e-6);
    }

    #[test]
    fn long_gap_snaps() {
        let mut e = entity();
        e.observe(Vec2::ZERO, 10_000.0, 2500.0);
        e.observe(Vec2::new(5.0, 5.0), 12_500.0, 2500.0);
        assert_eq!(e.transition.duration(), 0.0);
        assert_eq!(e.position(12_500.0), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn same_timestamp_keeps_duration() {
        let mut e = entity();
        e.observe(Vec2::ZERO, 10_000.0, 2500.0);
        let d = e.transition.duration();
        e.observe(Vec2::ONE, 10_000.0, 2500.0);
        assert_eq!(e.transition.duration(), d);
    }

    #[test]
    fn revision_only_moves_on_change() {
        let mut e = entity();
        assert!(e.set_power_level(PowerLevel::Z3));
        assert!(!e.set_power_level(PowerLevel::Z3));
        let flags = AthleteFlags { leader: true, ..AthleteFlags::default() };
        assert!(e.set_flags(flags));
        assert!(!e.set_flags(flags));
        assert_eq!(e.revision(), 2);
    }

    #[test]
    fn flags_from_detail() {
        let detail = AthleteDetail {
            athlete_id: AthleteId(1),
            athlete: Some(AthleteInfo {
                f_last: None,
                marked: true,
                following: false,
                kind: Some("PACER_BOT".into()),
            }),
            event_leader: false,
            event_sweeper: true,
        };
        let f = AthleteFlags::from_detail(&detail);
        assert!(f.bot && f.sweeper && f.marked);
        assert!(!f.leader && !f.following);
        assert_eq!(f.bits(), 0b01101);
    }

    #[test]
    fn attach_once() {
        let mut e = entity();
        assert!(e.attach());
        assert!(!e.attach());
    }
}
