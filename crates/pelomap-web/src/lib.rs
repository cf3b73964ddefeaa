pub mod runner;

pub use runner::MapRunner;

use std::cell::RefCell;

use pelomap_engine::{AthleteId, InputEvent, MapError, MapStyle, Vec2};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<MapRunner>> = RefCell::new(None);
}

fn with_runner<R>(f: impl FnOnce(&mut MapRunner) -> R) -> Result<R, JsError> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let runner = borrow
            .as_mut()
            .ok_or_else(|| JsError::new("Map not initialized. Call map_init() first."))?;
        Ok(f(runner))
    })
}

/// Like `with_runner`, for engine calls that can fail.
fn try_with_runner<R>(f: impl FnOnce(&mut MapRunner) -> Result<R, MapError>) -> Result<R, JsError> {
    with_runner(f)?.map_err(js_error)
}

fn js_error(e: MapError) -> JsError {
    JsError::new(&e.to_string())
}

/// Host clock in ms (`performance.now()`, falling back to the wall clock).
fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

fn athlete(id: Option<u32>) -> Option<AthleteId> {
    id.map(AthleteId)
}

fn points_from_flat(flat: &[f32]) -> Vec<Vec2> {
    flat.chunks_exact(2).map(|p| Vec2::new(p[0], p[1])).collect()
}

#[wasm_bindgen]
pub fn map_init(config_json: &str, worlds_json: &str) -> Result<(), JsError> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = MapRunner::from_json(config_json, worlds_json).map_err(js_error)?;
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("pelomap: initialized");
    Ok(())
}

// ---- Loop ----

/// Animation frame callback. Returns whether the frame buffer was rewritten.
#[wasm_bindgen]
pub fn map_frame(frame_time: f64) -> Result<bool, JsError> {
    try_with_runner(|r| r.frame(frame_time))
}

/// Idle callback. Returns athlete ids whose details should be fetched.
#[wasm_bindgen]
pub fn map_idle() -> Result<Vec<u32>, JsError> {
    with_runner(|r| r.idle(now()))
}

// ---- Feed ----

#[wasm_bindgen]
pub fn map_render_athlete_states(json: &str) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().render_athlete_states_json(json, now()))
}

#[wasm_bindgen]
pub fn map_apply_athlete_details(json: &str) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().apply_athlete_details_json(json))
}

#[wasm_bindgen]
pub fn map_set_course(course_id: u32) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_course(course_id, now()))
}

#[wasm_bindgen]
pub fn map_take_background_url() -> Result<Option<String>, JsError> {
    with_runner(|r| r.map_mut().take_background_request().map(|req| req.url))
}

#[wasm_bindgen]
pub fn map_background_loaded(width: f32, height: f32) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().on_background_loaded(width, height, now()))
}

#[wasm_bindgen]
pub fn map_background_failed(reason: &str) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().on_background_failed(reason))
}

/// World id whose roads should be passed to `map_load_roads`.
#[wasm_bindgen]
pub fn map_take_roads_request() -> Result<Option<u32>, JsError> {
    with_runner(|r| r.map_mut().take_roads_request())
}

#[wasm_bindgen]
pub fn map_load_roads(json: &str) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().load_roads_json(json))
}

/// `points` is a flat `[x0, y0, x1, y1, ...]` array in world units.
#[wasm_bindgen]
pub fn map_add_highlight_path(points: Vec<f32>, id: &str, looped: bool) -> Result<(), JsError> {
    let points = points_from_flat(&points);
    try_with_runner(|r| r.map_mut().add_highlight_path(&points, id, looped))
}

#[wasm_bindgen]
pub fn map_latlng_to_position(lat: f64, lon: f64) -> Result<Vec<f32>, JsError> {
    try_with_runner(|r| r.map().latlng_to_position([lat, lon])).map(|p| p.to_array().to_vec())
}

// ---- Settings ----

#[wasm_bindgen]
pub fn map_set_watching(id: Option<u32>) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_watching(athlete(id), now()))
}

#[wasm_bindgen]
pub fn map_set_athlete(id: Option<u32>) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_athlete(athlete(id)))
}

#[wasm_bindgen]
pub fn map_set_zoom(zoom: f32) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_zoom(zoom, now()))
}

#[wasm_bindgen]
pub fn map_set_style(style: &str) -> Result<(), JsError> {
    let style = match style {
        "neon" => MapStyle::Neon,
        "default" => MapStyle::Default,
        other => return Err(JsError::new(&format!("unknown map style: {other}"))),
    };
    with_runner(|r| r.map_mut().set_style(style))
}

#[wasm_bindgen]
pub fn map_set_tilt_shift(tilt: Option<f32>) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_tilt_shift(tilt, now()))
}

#[wasm_bindgen]
pub fn map_set_zoom_priority_tilt(enabled: bool) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_zoom_priority_tilt(enabled, now()))
}

#[wasm_bindgen]
pub fn map_set_quality(quality: f32) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_quality(quality, now()))
}

#[wasm_bindgen]
pub fn map_set_vertical_offset(offset: f32) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_vertical_offset(offset, now()))
}

#[wasm_bindgen]
pub fn map_set_fps_limit(fps: f32) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_fps_limit(fps))
}

#[wasm_bindgen]
pub fn map_set_auto_heading(enabled: bool) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_auto_heading(enabled, now()))
}

#[wasm_bindgen]
pub fn map_set_heading_offset(degrees: f32) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_heading_offset(degrees, now()))
}

#[wasm_bindgen]
pub fn map_set_drag_offset(x: f32, y: f32) -> Result<(), JsError> {
    try_with_runner(|r| r.map_mut().set_drag_offset(Vec2::new(x, y), now()))
}

#[wasm_bindgen]
pub fn map_set_surface_height(height: f32) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_surface_height(height))
}

#[wasm_bindgen]
pub fn map_set_visible(visible: bool) -> Result<(), JsError> {
    with_runner(|r| r.map_mut().set_visible(visible))
}

// ---- Pins ----

#[wasm_bindgen]
pub fn map_toggle_pin(id: u32) -> Result<Option<bool>, JsError> {
    with_runner(|r| r.map_mut().toggle_pin(AthleteId(id)))
}

#[wasm_bindgen]
pub fn map_pin_name(id: u32) -> Result<Option<String>, JsError> {
    with_runner(|r| r.map().pin_label(AthleteId(id)).map(|l| l.name.clone()))
}

/// `[power, speed]` of a pinned athlete, empty when there is no label yet.
#[wasm_bindgen]
pub fn map_pin_stats(id: u32) -> Result<Vec<f32>, JsError> {
    with_runner(|r| {
        r.map()
            .pin_label(AthleteId(id))
            .map(|l| vec![l.power, l.speed])
            .unwrap_or_default()
    })
}

// ---- Input ----

#[wasm_bindgen]
pub fn map_wheel(delta_y: f32) -> Result<(), JsError> {
    with_runner(|r| r.push_input(InputEvent::Wheel { delta_y }))
}

#[wasm_bindgen]
pub fn map_pointer_down(id: i32, button: i16, x: f32, y: f32) -> Result<(), JsError> {
    with_runner(|r| r.push_input(InputEvent::PointerDown { id, button, x, y }))
}

#[wasm_bindgen]
pub fn map_pointer_move(id: i32, x: f32, y: f32) -> Result<(), JsError> {
    with_runner(|r| r.push_input(InputEvent::PointerMove { id, x, y }))
}

#[wasm_bindgen]
pub fn map_pointer_up(id: i32) -> Result<(), JsError> {
    with_runner(|r| r.push_input(InputEvent::PointerUp { id }))
}

#[wasm_bindgen]
pub fn map_pointer_cancel(id: i32) -> Result<(), JsError> {
    with_runner(|r| r.push_input(InputEvent::PointerCancel { id }))
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_frame_ptr() -> Result<*const u32, JsError> {
    with_runner(|r| r.frame_ptr())
}

#[wasm_bindgen]
pub fn get_frame_words() -> Result<u32, JsError> {
    with_runner(|r| r.frame_words())
}

#[wasm_bindgen]
pub fn get_max_entities() -> Result<u32, JsError> {
    with_runner(|r| r.max_entities())
}

#[wasm_bindgen]
pub fn get_max_pins() -> Result<u32, JsError> {
    with_runner(|r| r.max_pins())
}

/// Drain map events into the event buffer; returns how many there are.
#[wasm_bindgen]
pub fn map_drain_events() -> Result<u32, JsError> {
    with_runner(|r| r.drain_events())
}

#[wasm_bindgen]
pub fn get_events_ptr() -> Result<*const f32, JsError> {
    with_runner(|r| r.events_ptr())
}

#[wasm_bindgen]
pub fn map_zoom() -> Result<f32, JsError> {
    with_runner(|r| r.map().zoom())
}

#[wasm_bindgen]
pub fn map_heading() -> Result<f32, JsError> {
    with_runner(|r| r.map().heading())
}

// ---- Road layer ----

#[wasm_bindgen]
pub fn map_roads_revision() -> Result<u32, JsError> {
    with_runner(|r| r.map().road_layer().revision())
}

/// `[x, y, width, height]` in road-layer units.
#[wasm_bindgen]
pub fn map_road_view_box() -> Result<Vec<f32>, JsError> {
    with_runner(|r| r.map().road_layer().view_box.to_vec())
}

#[wasm_bindgen]
pub fn map_active_road() -> Result<Option<u32>, JsError> {
    with_runner(|r| r.map().road_layer().active)
}

#[wasm_bindgen]
pub fn map_road_count() -> Result<u32, JsError> {
    with_runner(|r| r.map().road_layer().roads.len() as u32)
}

#[wasm_bindgen]
pub fn map_road_id(index: usize) -> Result<Option<u32>, JsError> {
    with_runner(|r| r.map().road_layer().roads.get(index).map(|road| road.id))
}

/// SVG path data of the road at `index`.
#[wasm_bindgen]
pub fn map_road_svg(index: usize) -> Result<Option<String>, JsError> {
    with_runner(|r| r.map().road_layer().roads.get(index).map(|road| road.path.to_svg()))
}

/// Space separated style classes of the road at `index`.
#[wasm_bindgen]
pub fn map_road_classes(index: usize) -> Result<Option<String>, JsError> {
    with_runner(|r| r.map().road_layer().roads.get(index).map(|road| road.classes.join(" ")))
}

/// `[min_x, min_y, max_x, max_y]` clip box of the road at `index`.
#[wasm_bindgen]
pub fn map_road_clip(index: usize) -> Result<Vec<f32>, JsError> {
    with_runner(|r| {
        r.map()
            .road_layer()
            .roads
            .get(index)
            .map(|road| vec![road.clip[0].x, road.clip[0].y, road.clip[1].x, road.clip[1].y])
            .unwrap_or_default()
    })
}

#[wasm_bindgen]
pub fn map_highlight_count() -> Result<u32, JsError> {
    with_runner(|r| r.map().road_layer().highlights.len() as u32)
}

#[wasm_bindgen]
pub fn map_highlight_svg(index: usize) -> Result<Option<String>, JsError> {
    with_runner(|r| r.map().road_layer().highlights.get(index).map(|h| h.path.to_svg()))
}

// ---- Vector accessors (only when vectors feature is enabled) ----

#[cfg(feature = "vectors")]
#[wasm_bindgen]
pub fn get_vector_vertices_ptr() -> Result<*const f32, JsError> {
    with_runner(|r| r.vector_vertices_ptr())
}

#[cfg(feature = "vectors")]
#[wasm_bindgen]
pub fn get_vector_vertex_count() -> Result<u32, JsError> {
    with_runner(|r| r.vector_vertex_count())
}

#[cfg(feature = "vectors")]
#[wasm_bindgen]
pub fn map_vector_batches() -> Result<Vec<f32>, JsError> {
    with_runner(|r| r.vector_batches())
}
