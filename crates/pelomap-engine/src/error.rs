use thiserror::Error;

/// Errors surfaced by the map engine.
///
/// Refcount underflows are caller contract violations and are reported, not
/// clamped.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("transition disabled refcount dropped below zero")]
    DisabledUnderflow,

    #[error("map pause refcount dropped below zero")]
    PauseUnderflow,

    #[error("course {0} is not in the world list")]
    UnknownCourse(u32),

    #[error("no course selected")]
    NoCourse,

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MapResult<T> = Result<T, MapError>;
