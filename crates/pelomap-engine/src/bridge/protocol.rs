/// Shared frame buffer layout.
/// Must stay in sync with the surface's `protocol.ts`.
///
/// Layout (all values 4-byte words; ids are u32, everything else f32 bits):
/// ```text
/// [Header: 32 words]
/// [Entities: max_entities × 3 words]   id, x, y
/// [Styles: max_entities × 4 words]     id, power level, flags, marks
/// [Pins: max_pins × 3 words]           id, x, y
/// [Removed: max_entities × 1 word]     id
/// [Attached: max_entities × 1 word]    id
/// ```
///
/// Capacities are written into the header on every frame.
/// The surface reads them from the header to compute offsets dynamically.

use bytemuck::Pod;

use crate::api::types::AthleteId;
use crate::renderer::frame::{EntityStyle, EntityTransform, FrameOutput, PinPlacement};
use crate::renderer::transform::MapTransform;

/// Number of words in the header section.
pub const HEADER_WORDS: usize = 32;

/// Header field indices.
pub const HEADER_FRAME_COUNTER: usize = 0;
pub const HEADER_PROTOCOL_VERSION: usize = 1;
pub const HEADER_MAX_ENTITIES: usize = 2;
pub const HEADER_MAX_PINS: usize = 3;
pub const HEADER_HAS_MAP: usize = 4;
pub const HEADER_ENTITY_COUNT: usize = 5;
pub const HEADER_STYLE_COUNT: usize = 6;
pub const HEADER_PIN_COUNT: usize = 7;
pub const HEADER_REMOVED_COUNT: usize = 8;
pub const HEADER_ATTACHED_COUNT: usize = 9;
pub const HEADER_HAS_LAYER: usize = 10;
/// Map transform, `MapTransform::FLOATS` f32 values.
pub const HEADER_MAP: usize = 11;
/// Layer geometry: scale, background w/h, entity offset x/y (f32).
pub const HEADER_LAYER: usize = HEADER_MAP + MapTransform::FLOATS;
pub const LAYER_WORDS: usize = 5;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: u32 = 1;

pub const DEFAULT_MAX_ENTITIES: usize = 2048;
pub const DEFAULT_MAX_PINS: usize = 64;

/// Runtime-computed buffer layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_entities: usize,
    pub max_pins: usize,

    pub entity_data_offset: usize,
    pub style_data_offset: usize,
    pub pin_data_offset: usize,
    pub removed_data_offset: usize,
    pub attached_data_offset: usize,

    /// Total buffer size in words.
    pub buffer_total_words: usize,
    /// Total buffer size in bytes.
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    /// Compute layout from capacities.
    pub fn new(max_entities: usize, max_pins: usize) -> Self {
        let entity_data_offset = HEADER_WORDS;
        let style_data_offset = entity_data_offset + max_entities * EntityTransform::WORDS;
        let pin_data_offset = style_data_offset + max_entities * EntityStyle::WORDS;
        let removed_data_offset = pin_data_offset + max_pins * PinPlacement::WORDS;
        let attached_data_offset = removed_data_offset + max_entities;
        let buffer_total_words = attached_data_offset + max_entities;

        Self {
            max_entities,
            max_pins,
            entity_data_offset,
            style_data_offset,
            pin_data_offset,
            removed_data_offset,
            attached_data_offset,
            buffer_total_words,
            buffer_total_bytes: buffer_total_words * 4,
        }
    }
}

impl Default for ProtocolLayout {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTITIES, DEFAULT_MAX_PINS)
    }
}

/// Owned frame buffer the surface reads through a pointer into wasm memory.
pub struct FrameBuffer {
    layout: ProtocolLayout,
    words: Vec<u32>,
    frame_counter: u32,
}

impl FrameBuffer {
    pub fn new(layout: ProtocolLayout) -> Self {
        let words = vec![0; layout.buffer_total_words];
        Self {
            layout,
            words,
            frame_counter: 0,
        }
    }

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn as_ptr(&self) -> *const u32 {
        self.words.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Write one frame. The map is expected to respect this buffer's
    /// capacities (see `CourseMap::set_frame_capacity`); anything beyond them
    /// is truncated with a warning.
    pub fn write(&mut self, out: &FrameOutput) {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        let l = &self.layout;
        let w = &mut self.words;

        let entities = write_section(w, l.entity_data_offset, l.max_entities, &out.entities, "entities");
        let styles = write_section(w, l.style_data_offset, l.max_entities, &out.styles, "styles");
        let pins = write_section(w, l.pin_data_offset, l.max_pins, &out.pins, "pins");
        let removed = write_ids(w, l.removed_data_offset, l.max_entities, &out.removed, "removed");
        let attached = write_ids(w, l.attached_data_offset, l.max_entities, &out.attached, "attached");

        w[HEADER_FRAME_COUNTER] = self.frame_counter;
        w[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        w[HEADER_MAX_ENTITIES] = l.max_entities as u32;
        w[HEADER_MAX_PINS] = l.max_pins as u32;
        w[HEADER_ENTITY_COUNT] = entities as u32;
        w[HEADER_STYLE_COUNT] = styles as u32;
        w[HEADER_PIN_COUNT] = pins as u32;
        w[HEADER_REMOVED_COUNT] = removed as u32;
        w[HEADER_ATTACHED_COUNT] = attached as u32;

        w[HEADER_HAS_MAP] = out.map.is_some() as u32;
        if let Some(map) = &out.map {
            let values = map.to_values();
            w[HEADER_MAP..HEADER_LAYER].copy_from_slice(bytemuck::cast_slice(&values));
        }
        w[HEADER_HAS_LAYER] = out.layer.is_some() as u32;
        if let Some(layer) = &out.layer {
            let values = [
                layer.scale,
                layer.background_size[0],
                layer.background_size[1],
                layer.entity_offset[0],
                layer.entity_offset[1],
            ];
            w[HEADER_LAYER..HEADER_LAYER + LAYER_WORDS].copy_from_slice(bytemuck::cast_slice(&values));
        }
    }
}

fn write_section<T: Pod>(words: &mut [u32], offset: usize, capacity: usize, items: &[T], name: &str) -> usize {
    let count = clamp_count(items.len(), capacity, name);
    let src: &[u32] = bytemuck::cast_slice(&items[..count]);
    words[offset..offset + src.len()].copy_from_slice(src);
    count
}

fn write_ids(words: &mut [u32], offset: usize, capacity: usize, ids: &[AthleteId], name: &str) -> usize {
    let count = clamp_count(ids.len(), capacity, name);
    for (slot, id) in words[offset..offset + count].iter_mut().zip(ids) {
        *slot = id.0;
    }
    count
}

fn clamp_count(len: usize, capacity: usize, name: &str) -> usize {
    if len > capacity {
        log::warn!("frame buffer: {} {} over capacity {}, truncated", len, name, capacity);
    }
    len.min(capacity)
}
