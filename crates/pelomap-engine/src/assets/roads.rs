use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MapResult;

pub type RoadId = u32;

/// One road of a world's network, in raw world units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Road {
    /// Ordered centre-line points.
    #[serde(alias = "points")]
    pub path: Vec<[f32; 2]>,
    pub box_min: [f32; 2],
    pub box_max: [f32; 2],
    /// Sports allowed on this road (e.g. "cycling", "running").
    #[serde(default)]
    pub sports: Vec<String>,
    /// Whether the road closes on itself.
    #[serde(default)]
    pub looped: bool,
}

impl Road {
    /// Roads we draw: anything a rider or runner can use.
    pub fn is_drawable(&self) -> bool {
        self.sports.iter().any(|s| s == "cycling" || s == "running")
    }
}

/// Road network of one world, keyed by road id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadNetwork {
    pub roads: HashMap<RoadId, Road>,
}

impl RoadNetwork {
    /// Parse a JSON object of `road-id → road`.
    pub fn from_json(json: &str) -> MapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn len(&self) -> usize {
        self.roads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }
}
