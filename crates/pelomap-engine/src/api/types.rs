use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for an athlete (and the entity that shows it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AthleteId(pub u32);

impl std::fmt::Display for AthleteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A map event for the host UI, drained with `CourseMap::drain_events`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// Zoom changed (already clamped).
    Zoom(f32),
    /// Drag offset changed.
    Drag([f32; 2]),
}

/// One periodic position sample from the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteState {
    pub athlete_id: AthleteId,
    pub course_id: u32,
    pub road_id: u32,
    pub x: f32,
    pub y: f32,
    /// Degrees.
    #[serde(default)]
    pub heading: f32,
    /// Watts.
    #[serde(default)]
    pub power: f32,
    #[serde(default)]
    pub speed: f32,
}

/// Profile fields the map cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteInfo {
    #[serde(rename = "fLast", default)]
    pub f_last: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub marked: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub following: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl AthleteInfo {
    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("PACER_BOT")
    }
}

/// Detail record for one athlete, as returned by the host's data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteDetail {
    pub athlete_id: AthleteId,
    #[serde(default)]
    pub athlete: Option<AthleteInfo>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub event_leader: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub event_sweeper: bool,
}

impl AthleteDetail {
    /// Parse a JSON array of detail records. `null` entries are skipped.
    pub fn list_from_json(json: &str) -> crate::error::MapResult<Vec<Self>> {
        let list: Vec<Option<Self>> = serde_json::from_str(json)?;
        Ok(list.into_iter().flatten().collect())
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ids whose details are stale; the host fetches them and answers with
/// `CourseMap::apply_athlete_details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailRequest {
    pub ids: Vec<AthleteId>,
}

/// Background image the surface should load for the current course/style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRequest {
    pub url: String,
    pub world_id: u32,
}

/// Pixel geometry of the scaled layers, reported on every layer-scale swap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerGeometry {
    pub scale: f32,
    /// Background element size in pixels (0 until the image has loaded).
    pub background_size: [f32; 2],
    /// Entity layer offset from the background origin.
    pub entity_offset: [f32; 2],
}
