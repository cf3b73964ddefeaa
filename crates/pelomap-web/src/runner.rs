use pelomap_engine::{
    CourseMap, FrameBuffer, FrameCapacity, InputEvent, MapConfig, MapEvent, MapResult, Millis,
    ProtocolLayout, WorldList,
};
#[cfg(feature = "vectors")]
use pelomap_engine::{RoadPalette, VectorState};

/// Event kinds in the flat event buffer.
pub const EVENT_ZOOM: f32 = 1.0;
pub const EVENT_DRAG: f32 = 2.0;
/// Floats per event: kind, a, b.
pub const EVENT_FLOATS: usize = 3;

/// Map runner that wires the course map to the browser.
///
/// The bridge keeps one runner in a `thread_local!` and exports free
/// functions via `#[wasm_bindgen]`; the surface reads frames straight out of
/// wasm memory through the pointer accessors.
pub struct MapRunner {
    map: CourseMap,
    buffer: FrameBuffer,
    /// Flat buffer of drained map events.
    event_buffer: Vec<f32>,
    #[cfg(feature = "vectors")]
    vectors: VectorState,
    #[cfg(feature = "vectors")]
    palette: RoadPalette,
}

impl MapRunner {
    pub fn new(config: MapConfig, worlds: WorldList, layout: ProtocolLayout) -> Self {
        let mut map = CourseMap::new(config, worlds);
        map.set_frame_capacity(FrameCapacity {
            entities: layout.max_entities,
            pins: layout.max_pins,
        });
        Self {
            map,
            buffer: FrameBuffer::new(layout),
            event_buffer: Vec::new(),
            #[cfg(feature = "vectors")]
            vectors: VectorState::new(),
            #[cfg(feature = "vectors")]
            palette: RoadPalette::default(),
        }
    }

    /// Build from the host's JSON config object and world list.
    pub fn from_json(config_json: &str, worlds_json: &str) -> MapResult<Self> {
        let config = if config_json.trim().is_empty() {
            MapConfig::default()
        } else {
            MapConfig::from_json(config_json)?
        };
        let worlds = WorldList::from_json(worlds_json)?;
        log::info!("pelomap: {} worlds", worlds.worlds.len());
        Ok(Self::new(config, worlds, ProtocolLayout::default()))
    }

    pub fn map(&self) -> &CourseMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut CourseMap {
        &mut self.map
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.map.push_input(event);
    }

    /// Run one animation frame. Returns whether the frame buffer was rewritten.
    pub fn frame(&mut self, now: Millis) -> MapResult<bool> {
        let Some(out) = self.map.frame(now)? else {
            return Ok(false);
        };
        self.buffer.write(out);
        #[cfg(feature = "vectors")]
        self.vectors.tessellate_roads(self.map.road_layer(), &self.palette);
        Ok(true)
    }

    /// Idle pass. Returns the athlete ids whose details the host should fetch.
    pub fn idle(&mut self, now: Millis) -> Vec<u32> {
        self.map
            .idle(now)
            .map(|req| req.ids.into_iter().map(|id| id.0).collect())
            .unwrap_or_default()
    }

    /// Drain map events into the flat event buffer. Returns the event count.
    pub fn drain_events(&mut self) -> u32 {
        self.event_buffer.clear();
        for event in self.map.drain_events() {
            let (kind, a, b) = match event {
                MapEvent::Zoom(zoom) => (EVENT_ZOOM, zoom, 0.0),
                MapEvent::Drag([x, y]) => (EVENT_DRAG, x, y),
            };
            self.event_buffer.extend_from_slice(&[kind, a, b]);
        }
        (self.event_buffer.len() / EVENT_FLOATS) as u32
    }

    // ---- Pointer accessors for direct memory reads ----

    pub fn frame_ptr(&self) -> *const u32 {
        self.buffer.as_ptr()
    }

    pub fn frame_words(&self) -> u32 {
        self.buffer.len() as u32
    }

    pub fn frame_counter(&self) -> u32 {
        self.buffer.frame_counter()
    }

    pub fn events_ptr(&self) -> *const f32 {
        self.event_buffer.as_ptr()
    }

    // ---- Capacity accessors ----

    pub fn max_entities(&self) -> u32 {
        self.buffer.layout().max_entities as u32
    }

    pub fn max_pins(&self) -> u32 {
        self.buffer.layout().max_pins as u32
    }

    #[cfg(feature = "vectors")]
    pub fn vector_vertices_ptr(&self) -> *const f32 {
        self.vectors.buffer_ptr()
    }

    #[cfg(feature = "vectors")]
    pub fn vector_vertex_count(&self) -> u32 {
        self.vectors.vertex_count() as u32
    }

    /// Road batches, 8 floats each: pass, road id (-1 for highlights), first
    /// vertex, vertex count, clip box (NaN when unclipped).
    #[cfg(feature = "vectors")]
    pub fn vector_batches(&self) -> Vec<f32> {
        self.vectors
            .batches()
            .iter()
            .flat_map(|b| {
                let clip = b.clip.unwrap_or([f32::NAN; 4]);
                [
                    b.pass as u32 as f32,
                    b.road.map_or(-1.0, |id| id as f32),
                    b.first_vertex as f32,
                    b.vertex_count as f32,
                    clip[0],
                    clip[1],
                    clip[2],
                    clip[3],
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pelomap_engine::bridge::protocol::{
        HEADER_ATTACHED_COUNT, HEADER_ENTITY_COUNT, HEADER_FRAME_COUNTER, HEADER_HAS_MAP,
    };
    use pelomap_engine::{AthleteId, AthleteState};

    const WORLDS: &str = r#"[{ "courseId": 6, "worldId": 1, "minX": -1000, "minY": -500,
        "maxX": 3000, "maxY": 1500, "anchorX": 0, "anchorY": 0, "tileScale": 100, "mapScale": 1 }]"#;

    fn state(id: u32) -> AthleteState {
        AthleteState {
            athlete_id: AthleteId(id),
            course_id: 6,
            road_id: 0,
            x: id as f32,
            y: 0.0,
            heading: 0.0,
            power: 0.0,
            speed: 0.0,
        }
    }

    fn start(mut r: MapRunner, states: &[AthleteState]) -> MapRunner {
        let map = r.map_mut();
        map.set_watching(Some(AthleteId(1)), 1000.0).unwrap();
        map.render_athlete_states(states, 1000.0).unwrap();
        map.on_background_loaded(4000.0, 2000.0, 1000.0).unwrap();
        r
    }

    fn runner() -> MapRunner {
        start(MapRunner::from_json("", WORLDS).unwrap(), &[state(1)])
    }

    #[test]
    fn bad_worlds_json_is_an_error() {
        assert!(MapRunner::from_json("", "nope").is_err());
    }

    #[test]
    fn frame_fills_buffer() {
        let mut r = runner();
        assert!(r.frame(1000.0).unwrap());
        let words = r.buffer.words();
        assert_eq!(words.len(), r.frame_words() as usize);
        assert_eq!(words[HEADER_FRAME_COUNTER], 1);
        assert_eq!(words[HEADER_HAS_MAP], 1);
        assert_eq!(words[HEADER_ENTITY_COUNT], 1);
        // Inside the frame limiter window with nothing forced.
        assert!(!r.frame(1005.0).unwrap());
    }

    #[test]
    fn small_buffer_attaches_every_entity_eventually() {
        let layout = ProtocolLayout::new(2, 2);
        let worlds = WorldList::from_json(WORLDS).unwrap();
        let mut r = start(
            MapRunner::new(MapConfig::default(), worlds, layout),
            &[state(1), state(2), state(3)],
        );
        let mut attached = 0;
        for i in 0..20 {
            if r.frame(1000.0 + i as f64 * 20.0).unwrap() {
                let words = r.buffer.words();
                assert!(words[HEADER_ENTITY_COUNT] <= 2);
                attached += words[HEADER_ATTACHED_COUNT];
            }
        }
        assert_eq!(attached, 3);
    }

    #[test]
    fn events_are_flattened() {
        let mut r = runner();
        r.drain_events();
        r.map_mut().set_zoom(2.0, 1100.0).unwrap();
        assert_eq!(r.drain_events(), 1);
        assert_eq!(r.event_buffer, vec![EVENT_ZOOM, 2.0, 0.0]);
    }

    #[test]
    fn idle_requests_details() {
        let mut r = runner();
        assert_eq!(r.idle(1000.0), vec![1]);
    }
}
