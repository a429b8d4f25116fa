pub mod config;
pub mod engine;
pub mod errors;
pub mod hook;
pub mod plugin;
pub mod ui;
