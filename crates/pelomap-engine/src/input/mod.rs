pub mod gestures;
pub mod queue;
