// extensions/mod.rs
//
// Self-contained numeric helpers. None of these know about entities or the
// map; the map composes them.

pub mod heading;
pub mod smoothing;
pub mod transition;

pub use heading::HeadingTracker;
pub use smoothing::ExpWeightedAvg;
pub use transition::Transition;
