//! Configuration management for Mura Deck
//!
//! - **settings**: persisted key/value toggles behind the `SettingsStore` trait
//! - **paths**: shader, texture, log and settings locations

pub mod paths;
pub mod settings;

// Re-export commonly used types
pub use paths::Paths;
pub use settings::{JsonSettings, SettingsStore, keys};
