// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - TOML-backed data model (`model.rs`).
//! - Loading from disk plus environment overrides (`loader.rs`).
//! - Sanity checks on the raw values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, EnginesSection, JobsSection, QuantumSection, RawConfigFile, RunnerSection,
    SimulatorSection,
};
