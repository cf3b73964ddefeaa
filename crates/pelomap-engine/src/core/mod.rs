pub mod details;
pub mod store;
pub mod time;
