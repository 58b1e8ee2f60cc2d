pub mod bot;
pub mod config;
pub mod dashboard;
pub mod datasources;
pub mod format;
pub mod render;
pub mod ticker;
