pub mod layer_scale;
pub mod render;
pub mod rng;
pub mod roads;
pub mod spline;
#[cfg(feature = "vectors")]
pub mod vector;
