pub mod core;
pub mod profile;
pub mod setup;
pub mod tables;
