pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod bridge;
pub mod input;
pub mod assets;
pub mod extensions;
pub mod error;

pub use glam::Vec2;

// Re-export key types at crate root for convenience
pub use api::config::{MapConfig, MapStyle};
pub use api::map::CourseMap;
pub use api::types::{
    AthleteDetail, AthleteId, AthleteInfo, AthleteState, BackgroundRequest, DetailRequest, LayerGeometry,
    MapEvent,
};
pub use assets::roads::{Road, RoadId, RoadNetwork};
pub use assets::world::{WorldList, WorldMeta};
pub use bridge::protocol::{FrameBuffer, ProtocolLayout};
pub use components::entity::{AthleteFlags, Entity, PinLabel};
pub use components::power_level::PowerLevel;
pub use crate::core::time::{FrameLimiter, Millis};
pub use error::{MapError, MapResult};
pub use input::gestures::{GestureTarget, InteractionController};
pub use input::queue::{InputEvent, InputQueue};
pub use renderer::frame::{FrameCapacity, FrameOutput};
pub use renderer::transform::MapTransform;
pub use systems::layer_scale::{LayerScaleController, LayerScaleSettings};
pub use systems::roads::RoadLayer;
pub use systems::spline::{smooth_path, SmoothPath};

#[cfg(feature = "vectors")]
pub use systems::vector::{RoadPalette, VectorColor, VectorState, VectorVertex};

// Extensions: decoupled numeric helpers
pub use extensions::{ExpWeightedAvg, HeadingTracker, Transition};
