pub mod frame;
pub mod transform;

pub use frame::{EntityStyle, EntityTransform, FrameCapacity, FrameOutput, PinPlacement};
pub use transform::MapTransform;
