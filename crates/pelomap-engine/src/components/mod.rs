pub mod entity;
pub mod power_level;
