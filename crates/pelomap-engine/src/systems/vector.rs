//! Lyon-based road tessellation.
//!
//! Turns a [`RoadLayer`] into a flat triangle-list vertex buffer for GPU
//! surfaces. Roads are stroked in passes, back to front:
//!
//! 1. gutters: every road, wide and dark,
//! 2. surfaces: every road, coloured by sport,
//! 3. the active road,
//! 4. highlight routes.
//!
//! Each road stroke is recorded as a [`RoadBatch`] with its clip box so the
//! surface can scissor it; lyon itself does not clip.

use bytemuck::{Pod, Zeroable};
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor,
    VertexBuffers,
};

use crate::assets::roads::RoadId;
use crate::systems::roads::RoadLayer;
use crate::systems::spline::SmoothPath;

/// Per-vertex data for vector rendering.
/// 6 floats = 24 bytes per vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct VectorVertex {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl VectorVertex {
    /// Number of floats per vertex.
    pub const FLOATS: usize = 6;
    /// Stride in bytes.
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4; // 24
}

/// RGBA color for vector drawing operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl VectorColor {
    /// Create a color from RGBA components (0.0 - 1.0).
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a fully opaque color from RGB components.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGB u8 values (0-255) with full opacity.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Create a color with the given alpha value.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Which pass a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadPass {
    Gutter,
    Surface,
    Active,
    Highlight,
}

/// Stroke colours and widths, in road-layer units.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadPalette {
    pub gutter: VectorColor,
    pub gutter_width: f32,
    pub cycling: VectorColor,
    pub running: VectorColor,
    pub surface_width: f32,
    pub active: VectorColor,
    pub active_width: f32,
    pub highlight: VectorColor,
    pub highlight_width: f32,
}

impl Default for RoadPalette {
    fn default() -> Self {
        Self {
            gutter: VectorColor::new(0.0, 0.0, 0.0, 0.5),
            gutter_width: 0.5,
            cycling: VectorColor::rgb(0.8, 0.8, 0.8),
            running: VectorColor::rgb(0.6, 0.5, 0.4),
            surface_width: 0.3,
            active: VectorColor::rgb(1.0, 0.55, 0.2),
            active_width: 0.3,
            highlight: VectorColor::new(0.2, 0.6, 1.0, 0.8),
            highlight_width: 0.4,
        }
    }
}

/// A contiguous run of vertices drawn with one clip box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadBatch {
    pub pass: RoadPass,
    /// `None` for highlights.
    pub road: Option<RoadId>,
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// `[min_x, min_y, max_x, max_y]`; `None` draws unclipped.
    pub clip: Option<[f32; 4]>,
}

/// Vertex constructor for lyon stroke tessellation.
struct StrokeVertexCtor {
    color: VectorColor,
}

impl StrokeVertexConstructor<VectorVertex> for StrokeVertexCtor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> VectorVertex {
        VectorVertex {
            x: vertex.position().x,
            y: vertex.position().y,
            r: self.color.r,
            g: self.color.g,
            b: self.color.b,
            a: self.color.a,
        }
    }
}

/// State for road tessellation.
///
/// Holds the lyon tessellator and the output vertex buffer. Rebuilt whenever
/// the road layer revision changes.
pub struct VectorState {
    stroke_tess: StrokeTessellator,
    geometry: VertexBuffers<VectorVertex, u32>,
    buffer: Vec<f32>,
    batches: Vec<RoadBatch>,
    revision: Option<u32>,
}

impl VectorState {
    pub fn new() -> Self {
        Self {
            stroke_tess: StrokeTessellator::new(),
            geometry: VertexBuffers::new(),
            buffer: Vec::with_capacity(16384 * VectorVertex::FLOATS),
            batches: Vec::new(),
            revision: None,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.batches.clear();
        self.revision = None;
    }

    /// Number of vertices currently in the buffer.
    pub fn vertex_count(&self) -> usize {
        self.buffer.len() / VectorVertex::FLOATS
    }

    pub fn batches(&self) -> &[RoadBatch] {
        &self.batches
    }

    /// Raw pointer to the flat float buffer.
    pub fn buffer_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    /// Flush indexed geometry to the flat buffer as triangle list.
    fn flush_geometry(&mut self) {
        for idx in &self.geometry.indices {
            let v = &self.geometry.vertices[*idx as usize];
            self.buffer.extend_from_slice(&[v.x, v.y, v.r, v.g, v.b, v.a]);
        }
        self.geometry.vertices.clear();
        self.geometry.indices.clear();
    }

    /// Tessellate an arbitrary stroked lyon Path. Returns the vertices added.
    pub fn stroke_path(&mut self, path: &Path, width: f32, color: VectorColor) -> usize {
        let before = self.vertex_count();
        let result = self.stroke_tess.tessellate_path(
            path,
            &StrokeOptions::tolerance(0.01).with_line_width(width),
            &mut BuffersBuilder::new(&mut self.geometry, StrokeVertexCtor { color }),
        );

        match result {
            Ok(_) => self.flush_geometry(),
            Err(e) => {
                log::warn!("road tessellation failed: {:?}", e);
                self.geometry.vertices.clear();
                self.geometry.indices.clear();
            }
        }
        self.vertex_count() - before
    }

    /// Stroke a smooth path. Returns the vertices added.
    pub fn stroke_smooth_path(&mut self, path: &SmoothPath, width: f32, color: VectorColor) -> usize {
        if path.segments().is_empty() {
            return 0;
        }
        self.stroke_path(&path.to_lyon(), width, color)
    }

    fn push_batch(&mut self, pass: RoadPass, road: Option<RoadId>, path: &SmoothPath, clip: Option<[f32; 4]>, width: f32, color: VectorColor) {
        let first_vertex = self.vertex_count() as u32;
        let added = self.stroke_smooth_path(path, width, color);
        if added > 0 {
            self.batches.push(RoadBatch {
                pass,
                road,
                first_vertex,
                vertex_count: added as u32,
                clip,
            });
        }
    }

    /// Rebuild the buffer for `layer` unless it is already current.
    /// Returns true when the buffer changed.
    pub fn tessellate_roads(&mut self, layer: &RoadLayer, palette: &RoadPalette) -> bool {
        if self.revision == Some(layer.revision()) {
            return false;
        }
        self.clear();
        for road in &layer.roads {
            let clip = Some(clip_rect(road.clip));
            self.push_batch(RoadPass::Gutter, Some(road.id), &road.path, clip, palette.gutter_width, palette.gutter);
        }
        for road in &layer.roads {
            let clip = Some(clip_rect(road.clip));
            let color = if road.classes.iter().any(|c| c == "sport-cycling") {
                palette.cycling
            } else {
                palette.running
            };
            self.push_batch(RoadPass::Surface, Some(road.id), &road.path, clip, palette.surface_width, color);
        }
        if let Some(active) = layer.active.and_then(|id| layer.road(id)) {
            let clip = Some(clip_rect(active.clip));
            self.push_batch(RoadPass::Active, Some(active.id), &active.path, clip, palette.active_width, palette.active);
        }
        for highlight in &layer.highlights {
            self.push_batch(RoadPass::Highlight, None, &highlight.path, None, palette.highlight_width, palette.highlight);
        }
        self.revision = Some(layer.revision());
        true
    }
}

impl Default for VectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a clip box; corners may be swapped by the rotate hack.
fn clip_rect([a, b]: [glam::Vec2; 2]) -> [f32; 4] {
    let min = a.min(b);
    let max = a.max(b);
    [min.x, min.y, max.x, max.y]
}
