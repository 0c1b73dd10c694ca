pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod languages;
pub mod time;
pub mod types;
