// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] mirrors the TOML file shape.
//! - [`loader`] reads and deserializes the file.
//! - [`validate`] turns a [`model::RawConfigFile`] into a validated
//!   [`model::ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ApiSection, ConfigFile, RawConfigFile, RunSection, ScheduleInterval, ScheduleSection,
    SourceSpec, StorageSection,
};
