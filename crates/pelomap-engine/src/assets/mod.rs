pub mod roads;
pub mod world;
