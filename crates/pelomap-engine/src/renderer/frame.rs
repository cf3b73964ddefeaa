use bytemuck::{Pod, Zeroable};

use crate::api::types::{AthleteId, LayerGeometry};
use crate::components::entity::Entity;
use crate::renderer::transform::MapTransform;

/// Entity layer position for one entity, in layer pixels.
///
/// 3 x 4 bytes; `id` is a u32, read it through a `Uint32Array` view.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct EntityTransform {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl EntityTransform {
    pub const WORDS: usize = 3;
}

/// Visual marks of an entity whose style changed.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct EntityStyle {
    pub id: u32,
    /// 1..=6, see `PowerLevel`.
    pub power_level: u32,
    /// `AthleteFlags::bits`.
    pub flags: u32,
    /// bit 0: self, bit 1: watching.
    pub marks: u32,
}

impl EntityStyle {
    pub const WORDS: usize = 4;
    pub const SELF: u32 = 1;
    pub const WATCHING: u32 = 1 << 1;

    pub fn of(entity: &Entity) -> Self {
        let v = &entity.visual;
        let mut marks = 0;
        if v.is_self {
            marks |= Self::SELF;
        }
        if v.watching {
            marks |= Self::WATCHING;
        }
        Self {
            id: entity.id.0,
            power_level: v.power_level.as_u8() as u32,
            flags: v.flags.bits(),
            marks,
        }
    }
}

/// Screen placement of an info pin (top centre of its entity).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PinPlacement {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl PinPlacement {
    pub const WORDS: usize = 3;
}

/// Per-frame limits of the surface's frame buffer. Work beyond them stays
/// queued for later frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCapacity {
    /// Entity transforms, styles, attached and removed ids.
    pub entities: usize,
    pub pins: usize,
}

impl FrameCapacity {
    pub const UNBOUNDED: Self = Self {
        entities: usize::MAX,
        pins: usize::MAX,
    };
}

impl Default for FrameCapacity {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Everything one admitted frame asks of the rendering surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// `None` until a layer scale and a transform have been established.
    pub map: Option<MapTransform>,
    /// New layer geometry after a layer-scale swap.
    pub layer: Option<LayerGeometry>,
    pub entities: Vec<EntityTransform>,
    /// Entities handed to the surface for the first time this frame.
    pub attached: Vec<AthleteId>,
    pub styles: Vec<EntityStyle>,
    pub pins: Vec<PinPlacement>,
    /// Entities whose nodes should be released.
    pub removed: Vec<AthleteId>,
}

impl FrameOutput {
    pub fn clear(&mut self) {
        self.map = None;
        self.layer = None;
        self.entities.clear();
        self.attached.clear();
        self.styles.clear();
        self.pins.clear();
        self.removed.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_none()
            && self.layer.is_none()
            && self.entities.is_empty()
            && self.attached.is_empty()
            && self.styles.is_empty()
            && self.pins.is_empty()
            && self.removed.is_empty()
    }

    /// Raw pointer to entity transform data for host reads.
    pub fn entities_ptr(&self) -> *const u32 {
        self.entities.as_ptr() as *const u32
    }

    pub fn styles_ptr(&self) -> *const u32 {
        self.styles.as_ptr() as *const u32
    }

    pub fn pins_ptr(&self) -> *const u32 {
        self.pins.as_ptr() as *const u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::entity::AthleteFlags;
    use crate::components::power_level::PowerLevel;
    use crate::extensions::smoothing::ExpWeightedAvg;
    use crate::extensions::transition::Transition;

    #[test]
    fn records_are_word_sized() {
        assert_eq!(std::mem::size_of::<EntityTransform>(), EntityTransform::WORDS * 4);
        assert_eq!(std::mem::size_of::<EntityStyle>(), EntityStyle::WORDS * 4);
        assert_eq!(std::mem::size_of::<PinPlacement>(), PinPlacement::WORDS * 4);
    }

    #[test]
    fn style_packs_marks() {
        let mut e = Entity::new(AthleteId(7), Transition::new(2000.0), ExpWeightedAvg::new(6.0, 1000.0));
        e.set_power_level(PowerLevel::Z5);
        e.set_watching(true);
        e.set_flags(AthleteFlags { following: true, ..AthleteFlags::default() });
        let s = EntityStyle::of(&e);
        assert_eq!(s.id, 7);
        assert_eq!(s.power_level, 5);
        assert_eq!(s.flags, 1 << 4);
        assert_eq!(s.marks, EntityStyle::WATCHING);
    }

    #[test]
    fn clear_resets() {
        let mut out = FrameOutput::default();
        out.entities.push(EntityTransform::default());
        out.removed.push(AthleteId(1));
        assert!(!out.is_empty());
        out.clear();
        assert!(out.is_empty());
    }
}
