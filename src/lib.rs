pub mod config;
pub mod control;
pub mod driver;
pub mod messages;
