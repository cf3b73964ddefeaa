use glam::Vec2;

use crate::api::config::{MapConfig, MapStyle};
use crate::api::types::{
    AthleteDetail, AthleteId, AthleteState, BackgroundRequest, DetailRequest, LayerGeometry, MapEvent,
};
use crate::assets::roads::{RoadId, RoadNetwork};
use crate::assets::world::{WorldList, WorldMeta};
use crate::components::entity::{Entity, PinLabel};
use crate::components::power_level::PowerLevel;
use crate::core::details::DetailCache;
use crate::core::store::EntityStore;
use crate::core::time::{FrameLimiter, Interval, Millis};
use crate::error::{MapError, MapResult};
use crate::extensions::heading::HeadingTracker;
use crate::extensions::smoothing::ExpWeightedAvg;
use crate::extensions::transition::Transition;
use crate::input::gestures::{GestureTarget, InteractionController};
use crate::input::queue::{InputEvent, InputQueue};
use crate::renderer::frame::{FrameCapacity, FrameOutput};
use crate::renderer::transform::MapTransform;
use crate::systems::layer_scale::LayerScaleController;
use crate::systems::render::{build_entity_frame, EntityFrameParams};
use crate::systems::roads::RoadLayer;

/// A live course map.
///
/// Owns every piece of map state. The host feeds it athlete batches, input
/// and collaborator data, and drives it with two calls:
///
/// - [`CourseMap::frame`] from its animation frame callback,
/// - [`CourseMap::idle`] from its idle scheduling point.
///
/// All times are milliseconds on the host's monotonic clock.
pub struct CourseMap {
    config: MapConfig,
    worlds: WorldList,
    world: Option<WorldMeta>,
    course_id: Option<u32>,
    road_id: Option<RoadId>,
    roads: RoadLayer,

    watching_id: Option<AthleteId>,
    athlete_id: Option<AthleteId>,
    zoom: f32,
    auto_heading: bool,
    heading: HeadingTracker,
    tracking_paused: bool,
    /// Background pixels per world unit.
    map_scale: f32,
    /// World origin inside the background, pixels.
    anchor: Vec2,
    /// Watched athlete position, pixels.
    center: Vec2,
    /// User pan, surface pixels at zoom 1.
    drag: Vec2,
    surface_height: f32,
    visible: bool,

    layer_scale: LayerScaleController,
    background_size: Option<[f32; 2]>,
    layer_changed: Option<LayerGeometry>,
    pause_refs: u32,
    map_transition: Transition,
    force_frame: bool,

    store: EntityStore,
    details: DetailCache,
    removed: Vec<AthleteId>,
    gc: Interval,

    input: InputQueue,
    gestures: InteractionController,
    limiter: FrameLimiter,
    capacity: FrameCapacity,
    output: FrameOutput,
    events: Vec<MapEvent>,
    background_request: Option<BackgroundRequest>,
    roads_request: Option<u32>,
}

impl CourseMap {
    pub fn new(config: MapConfig, worlds: WorldList) -> Self {
        let mut layer_scale = LayerScaleController::new(config.layer_scale_settings());
        layer_scale.settings.tilt_shift = config.tilt_shift.filter(|t| *t != 0.0);
        Self {
            worlds,
            world: None,
            course_id: None,
            road_id: None,
            roads: RoadLayer::default(),
            watching_id: None,
            athlete_id: None,
            zoom: config.zoom,
            auto_heading: config.auto_heading,
            heading: HeadingTracker::new(),
            tracking_paused: false,
            map_scale: 1.0,
            anchor: Vec2::ZERO,
            center: Vec2::ZERO,
            drag: Vec2::ZERO,
            surface_height: 0.0,
            visible: true,
            layer_scale,
            background_size: None,
            layer_changed: None,
            pause_refs: 0,
            map_transition: Transition::new(config.map_transition_ms),
            force_frame: false,
            store: EntityStore::new(),
            details: DetailCache::new(
                config.detail_refresh_base_ms,
                config.detail_refresh_jitter_ms,
                config.detail_cache_ttl_ms,
                config.rng_seed,
            ),
            removed: Vec::new(),
            gc: Interval::new(config.gc_interval_ms),
            input: InputQueue::new(),
            gestures: InteractionController::new(
                config.wheel_settle_ms,
                config.wheel_sensitivity,
                config.pinch_sensitivity,
            ),
            limiter: FrameLimiter::new(config.fps_limit),
            capacity: FrameCapacity::UNBOUNDED,
            output: FrameOutput::default(),
            events: Vec::new(),
            background_request: None,
            roads_request: None,
            config,
        }
    }

    // -- Accessors --

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn course_id(&self) -> Option<u32> {
        self.course_id
    }

    pub fn world(&self) -> Option<&WorldMeta> {
        self.world.as_ref()
    }

    pub fn road_id(&self) -> Option<RoadId> {
        self.road_id
    }

    pub fn road_layer(&self) -> &RoadLayer {
        &self.roads
    }

    pub fn watching(&self) -> Option<AthleteId> {
        self.watching_id
    }

    pub fn athlete(&self) -> Option<AthleteId> {
        self.athlete_id
    }

    pub fn is_tracking_paused(&self) -> bool {
        self.tracking_paused
    }

    /// Continuous map rotation in degrees.
    pub fn heading(&self) -> f32 {
        self.heading.adjusted()
    }

    pub fn drag_offset(&self) -> Vec2 {
        self.drag
    }

    /// Active layer scale; `None` until a background has loaded or the zoom changed.
    pub fn layer_scale(&self) -> Option<f32> {
        self.layer_scale.scale()
    }

    pub fn entity(&self, id: AthleteId) -> Option<&Entity> {
        self.store.get(id)
    }

    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    pub fn pin_label(&self, id: AthleteId) -> Option<&PinLabel> {
        self.store.get(id)?.pin.as_ref()?.label.as_ref()
    }

    pub fn map_transition(&self) -> &Transition {
        &self.map_transition
    }

    pub fn details(&self) -> &DetailCache {
        &self.details
    }

    /// The output of the last rendered frame.
    pub fn output(&self) -> &FrameOutput {
        &self.output
    }

    // -- Pause --

    pub fn is_paused(&self) -> bool {
        self.pause_refs > 0
    }

    /// Suspend transform updates. Nested; the first one freezes the map.
    pub fn inc_pause(&mut self, now: Millis) {
        self.pause_refs += 1;
        if self.pause_refs == 1 {
            self.map_transition.inc_disabled(now);
        }
    }

    /// Release one pause. The last one pushes the current transform and
    /// re-enables the map transition.
    pub fn dec_pause(&mut self, now: Millis) -> MapResult<()> {
        if self.pause_refs == 0 {
            return Err(MapError::PauseUnderflow);
        }
        self.pause_refs -= 1;
        if self.pause_refs == 0 {
            self.update_global_transform(now, true);
            self.map_transition.dec_disabled(now)?;
        }
        Ok(())
    }

    // -- Course --

    /// Switch to a course. Re-selecting the current course is a no-op.
    ///
    /// Everything course specific is reset. The background and road network
    /// are requested from the host (see [`CourseMap::take_background_request`]
    /// and [`CourseMap::take_roads_request`]).
    pub fn set_course(&mut self, course_id: u32, now: Millis) -> MapResult<()> {
        if self.course_id == Some(course_id) {
            log::warn!("debounce set_course({})", course_id);
            return Ok(());
        }
        let world = self
            .worlds
            .find(course_id)
            .cloned()
            .ok_or(MapError::UnknownCourse(course_id))?;
        self.inc_pause(now);
        log::info!("course {} (world {})", course_id, world.world_id);
        self.course_id = Some(course_id);
        self.map_scale = world.pixel_scale();
        self.anchor = world.anchor_offset();
        self.roads = RoadLayer::new(&world);
        self.heading.reset(world.heading_adjust());
        let released = self.store.clear();
        self.removed.extend(released);
        self.details.clear();
        self.roads_request = Some(world.world_id);
        self.world = Some(world);
        self.request_background();
        self.dec_pause(now)
    }

    /// Road network for the current course arrived.
    pub fn load_roads(&mut self, network: &RoadNetwork) -> MapResult<()> {
        let world = self.world.as_ref().ok_or(MapError::NoCourse)?;
        self.roads = RoadLayer::new(world);
        self.roads
            .render_roads(world, network, None, self.config.road_smoothing);
        if let Some(id) = self.road_id {
            self.roads.set_active_road(id);
        }
        self.roads_request = None;
        Ok(())
    }

    pub fn load_roads_json(&mut self, json: &str) -> MapResult<()> {
        let network = RoadNetwork::from_json(json)?;
        self.load_roads(&network)
    }

    pub fn set_active_road(&mut self, id: RoadId) {
        self.road_id = Some(id);
        self.roads.set_active_road(id);
    }

    pub fn add_highlight_path(&mut self, points: &[Vec2], id: impl Into<String>, looped: bool) -> MapResult<()> {
        let world = self.world.as_ref().ok_or(MapError::NoCourse)?;
        self.roads
            .add_highlight_path(world, points, id, looped, self.config.road_smoothing);
        Ok(())
    }

    /// Convert a GPS coordinate into world units for the current course.
    pub fn latlng_to_position(&self, latlng: [f64; 2]) -> MapResult<Vec2> {
        let world = self.world.as_ref().ok_or(MapError::NoCourse)?;
        Ok(world.latlng_to_position(latlng))
    }

    /// The background image the surface should load next, if any.
    pub fn take_background_request(&mut self) -> Option<BackgroundRequest> {
        self.background_request.take()
    }

    /// World id whose road network should be passed to [`CourseMap::load_roads`].
    pub fn take_roads_request(&mut self) -> Option<u32> {
        self.roads_request.take()
    }

    /// The requested background decoded with the given natural size.
    pub fn on_background_loaded(&mut self, width: f32, height: f32, now: Millis) -> MapResult<()> {
        self.background_size = Some([width, height]);
        self.adjust_layer_scale(now, true)?;
        Ok(())
    }

    /// The requested background could not be loaded. The previous one stays.
    pub fn on_background_failed(&mut self, reason: &str) {
        log::warn!("background decode interrupted/failed: {}", reason);
    }

    fn request_background(&mut self) {
        if let Some(world) = &self.world {
            self.background_request = Some(BackgroundRequest {
                url: self.config.background_url(world.world_id),
                world_id: world.world_id,
            });
        }
    }

    // -- Settings --

    pub fn set_zoom(&mut self, zoom: f32, now: Millis) -> MapResult<()> {
        self.zoom = zoom.clamp(self.config.zoom_min, self.config.zoom_max);
        self.apply_zoom(now)
    }

    pub fn set_style(&mut self, style: MapStyle) {
        self.config.style = style;
        if !self.is_paused() {
            self.request_background();
        }
    }

    pub fn set_tilt_shift(&mut self, tilt: Option<f32>, now: Millis) -> MapResult<()> {
        self.config.tilt_shift = tilt.filter(|t| *t != 0.0);
        self.layer_scale.settings.tilt_shift = self.config.tilt_shift;
        self.full_update_as_needed(now)?;
        Ok(())
    }

    pub fn set_zoom_priority_tilt(&mut self, enabled: bool, now: Millis) -> MapResult<()> {
        self.config.zoom_priority_tilt = enabled;
        self.layer_scale.settings.zoom_priority_tilt = enabled;
        self.full_update_as_needed(now)?;
        Ok(())
    }

    pub fn set_quality(&mut self, quality: f32, now: Millis) -> MapResult<()> {
        self.config.quality = quality;
        self.layer_scale.settings.quality = quality;
        self.full_update_as_needed(now)?;
        Ok(())
    }

    /// Vertical offset as a fraction of the surface height.
    pub fn set_vertical_offset(&mut self, offset: f32, now: Millis) {
        self.config.vertical_offset = offset;
        if !self.is_paused() {
            self.update_global_transform(now, true);
        }
    }

    pub fn set_fps_limit(&mut self, fps: f32) {
        self.config.fps_limit = fps;
        self.limiter.set_fps(fps);
    }

    pub fn set_auto_heading(&mut self, enabled: bool, now: Millis) {
        if !enabled {
            let adjust = self.heading_adjust();
            self.heading.set_heading(0.0, adjust, false, self.tracking_paused);
        }
        self.auto_heading = enabled;
        if !self.is_paused() {
            self.update_global_transform(now, true);
        }
    }

    pub fn set_heading_offset(&mut self, degrees: f32, now: Millis) {
        let adjust = self.heading_adjust();
        self.heading.set_offset(degrees, adjust);
        self.update_global_transform(now, true);
    }

    /// Surface (container) height in pixels, from the host's resize observer.
    pub fn set_surface_height(&mut self, height: f32) {
        self.surface_height = height;
    }

    /// Detail refreshes are only requested while the surface is visible.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_watching(&mut self, id: Option<AthleteId>, now: Millis) -> MapResult<()> {
        if let Some(old) = self.watching_id {
            self.restyle(old, |e| e.set_watching(false));
        }
        self.watching_id = id;
        if let Some(new) = id {
            self.restyle(new, |e| e.set_watching(true));
        }
        self.set_drag_offset(Vec2::ZERO, now)
    }

    /// Pan the map, in surface pixels at zoom 1.
    pub fn set_drag_offset(&mut self, offset: Vec2, now: Millis) -> MapResult<()> {
        self.drag = offset;
        if !self.is_paused() {
            self.update_global_transform(now, true);
            self.events.push(MapEvent::Drag(offset.to_array()));
        }
        Ok(())
    }

    pub fn set_athlete(&mut self, id: Option<AthleteId>) {
        if let Some(old) = self.athlete_id {
            self.restyle(old, |e| e.set_self(false));
        }
        self.athlete_id = id;
        if let Some(new) = id {
            self.restyle(new, |e| e.set_self(true));
        }
    }

    pub fn toggle_pin(&mut self, id: AthleteId) -> Option<bool> {
        self.store.toggle_pin(id)
    }

    fn restyle(&mut self, id: AthleteId, f: impl FnOnce(&mut Entity) -> bool) {
        if self.store.get_mut(id).is_some_and(f) {
            self.store.mark_restyle(id);
        }
    }

    fn heading_adjust(&self) -> f32 {
        self.world.as_ref().map_or(0.0, WorldMeta::heading_adjust)
    }

    // -- Feed --

    /// Apply one batch of athlete samples.
    ///
    /// Nothing happens until a watched athlete is set, and nothing happens
    /// while the watched athlete is absent from the batch and no course has
    /// been chosen yet.
    pub fn render_athlete_states(&mut self, states: &[AthleteState], now: Millis) -> MapResult<()> {
        let Some(watching_id) = self.watching_id else {
            return Ok(());
        };
        match states.iter().find(|s| s.athlete_id == watching_id) {
            None if self.course_id.is_none() => return Ok(()),
            None => {}
            Some(watching) => {
                if self.course_id != Some(watching.course_id) {
                    log::debug!("setting new course: {}", watching.course_id);
                    self.set_course(watching.course_id, now)?;
                }
                if self.road_id != Some(watching.road_id) {
                    self.set_active_road(watching.road_id);
                }
            }
        }
        for state in states {
            let id = state.athlete_id;
            let (athlete_id, cfg) = (self.athlete_id, &self.config);
            let entity = self.store.get_or_insert_with(id, || {
                let mut e = Entity::new(
                    id,
                    Transition::new(cfg.entity_transition_ms),
                    ExpWeightedAvg::new(cfg.delay_window, cfg.delay_seed_ms),
                );
                e.set_self(Some(id) == athlete_id);
                e.set_watching(id == watching_id);
                e
            });
            let restyled = entity.set_power_level(PowerLevel::from_watts(state.power));
            let raw = Vec2::new(state.x, state.y);
            let pos = self.world.as_ref().map_or(raw, |w| w.fix_world_pos(raw));
            entity.observe(pos, now, cfg.discontinuity_ms);
            if let Some(pin) = &mut entity.pin {
                let name = self
                    .details
                    .name(id)
                    .map_or_else(|| format!("ID: {}", id), str::to_string);
                pin.label = Some(PinLabel {
                    name,
                    power: state.power,
                    speed: state.speed,
                });
            }
            if restyled {
                self.store.mark_restyle(id);
            }
            if id == watching_id && !self.tracking_paused {
                if self.auto_heading {
                    let adjust = self.heading_adjust();
                    self.heading.set_heading(state.heading, adjust, false, self.tracking_paused);
                }
                self.center = pos * self.map_scale;
                self.update_global_transform(now, false);
            }
            self.store.mark_pending(id);
        }
        self.details.enqueue(states.iter().map(|s| s.athlete_id));
        Ok(())
    }

    pub fn render_athlete_states_json(&mut self, json: &str, now: Millis) -> MapResult<()> {
        let states: Vec<AthleteState> = serde_json::from_str(json)?;
        self.render_athlete_states(&states, now)
    }

    /// Answer to a [`DetailRequest`].
    pub fn apply_athlete_details(&mut self, records: Vec<AthleteDetail>) {
        self.details.apply(records, &mut self.store);
    }

    pub fn apply_athlete_details_json(&mut self, json: &str) -> MapResult<()> {
        let records = AthleteDetail::list_from_json(json)?;
        self.apply_athlete_details(records);
        Ok(())
    }

    /// Background work: the GC sweep (on its interval) and the lazy detail
    /// refresh. Returns the ids the host should fetch details for.
    pub fn idle(&mut self, now: Millis) -> Option<DetailRequest> {
        if self.gc.due(now) {
            let evicted = self.store.gc(now, self.config.gc_timeout_ms);
            self.removed.extend(evicted);
        }
        if !self.details.has_queued() {
            return None;
        }
        let ids = self.details.refresh(now, &mut self.store);
        if ids.is_empty() || !self.visible {
            return None;
        }
        Some(DetailRequest { ids })
    }

    // -- Input & frames --

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Limit what a single frame hands to the surface. Entities, styles and
    /// removals over capacity are carried over to later frames.
    pub fn set_frame_capacity(&mut self, capacity: FrameCapacity) {
        self.capacity = capacity;
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    /// Animation frame callback.
    ///
    /// Returns `None` when the frame limiter rejects the frame and no forced
    /// render is pending.
    pub fn frame(&mut self, now: Millis) -> MapResult<Option<&FrameOutput>> {
        let admitted = self.limiter.admit(now);
        if !admitted && !self.force_frame {
            return Ok(None);
        }

        let events = self.input.drain();
        let mut gestures = std::mem::take(&mut self.gestures);
        let handled = gestures.handle(&events, now, self);
        self.gestures = gestures;
        handled?;

        self.render_frame(now);
        Ok(Some(&self.output))
    }

    fn render_frame(&mut self, now: Millis) {
        self.force_frame = false;
        self.output.clear();
        self.output.map = self
            .map_transition
            .step(now)
            .and_then(MapTransform::from_values);
        self.output.layer = self.layer_changed.take();
        let sent = self.removed.len().min(self.capacity.entities);
        self.output.removed.extend(self.removed.drain(..sent));
        let params = EntityFrameParams {
            now,
            scale: self.layer_scale.scale().map(|s| s * self.map_scale),
            layer_offset: self.anchor * self.layer_scale.scale().unwrap_or(0.0),
            capacity: self.capacity,
            held: &self.removed,
        };
        let map = self.output.map;
        build_entity_frame(&mut self.store, &params, map.as_ref(), &mut self.output);
    }

    // -- Transform plumbing --

    /// Push the layer scale to match the zoom when it crossed a bucket (or
    /// `force`). Returns whether a swap happened.
    fn adjust_layer_scale(&mut self, now: Millis, force: bool) -> MapResult<bool> {
        let Some(scale) = self.layer_scale.update(self.zoom, force) else {
            return Ok(false);
        };
        self.inc_pause(now);
        log::debug!("layer scale {}", scale);
        let background = self.background_size.unwrap_or([0.0, 0.0]);
        self.layer_changed = Some(LayerGeometry {
            scale,
            background_size: [background[0] * scale, background[1] * scale],
            entity_offset: (self.anchor * scale).to_array(),
        });
        self.store.mark_all_pending();
        self.dec_pause(now)?;
        Ok(true)
    }

    /// Swap layer scale or refresh the transform. False while paused.
    fn full_update_as_needed(&mut self, now: Millis) -> MapResult<bool> {
        if self.is_paused() {
            return Ok(false);
        }
        if !self.adjust_layer_scale(now, false)? {
            self.update_global_transform(now, true);
        }
        Ok(true)
    }

    /// Retarget the map transition to the current center, drag, zoom, tilt
    /// and heading. No-op until a layer scale exists.
    fn update_global_transform(&mut self, now: Millis, render: bool) {
        let Some(layer_scale) = self.layer_scale.scale() else {
            return;
        };
        let scale = self.zoom / layer_scale;
        let rel = self.anchor + self.center;
        let translate = -(rel - self.drag * scale) * layer_scale;
        let origin = rel * layer_scale;
        let vertical_offset = if self.config.vertical_offset != 0.0 {
            self.config.vertical_offset * (self.surface_height * layer_scale / self.zoom)
        } else {
            0.0
        };
        let transform = MapTransform {
            origin_x: origin.x,
            origin_y: origin.y,
            translate_x: translate.x,
            translate_y: translate.y,
            scale,
            tilt_height: self.layer_scale.tilt_height(),
            tilt_angle: self.layer_scale.tilt_angle(),
            vertical_offset,
            rotate: self.heading.adjusted(),
        };
        self.map_transition.set_values(&transform.to_values(), now);
        if render {
            self.force_frame = true;
        }
    }
}

impl GestureTarget for CourseMap {
    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn adjust_zoom(&mut self, delta: f32) {
        self.zoom = (self.zoom + delta).clamp(self.config.zoom_min, self.config.zoom_max);
    }

    fn apply_zoom(&mut self, now: Millis) -> MapResult<()> {
        if self.full_update_as_needed(now)? {
            self.events.push(MapEvent::Zoom(self.zoom));
        }
        Ok(())
    }

    fn drag_offset(&self) -> Vec2 {
        self.drag
    }

    fn set_drag_offset(&mut self, offset: Vec2, now: Millis) -> MapResult<()> {
        CourseMap::set_drag_offset(self, offset, now)
    }

    fn freeze(&mut self, now: Millis) {
        self.map_transition.inc_disabled(now);
    }

    fn thaw(&mut self, now: Millis) -> MapResult<()> {
        self.map_transition.dec_disabled(now)
    }

    fn set_tracking_paused(&mut self, paused: bool) {
        self.tracking_paused = paused;
    }
}
