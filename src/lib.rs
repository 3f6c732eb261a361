pub mod config;
pub mod messages;
pub mod rotator;
pub mod runtime;
